//! Installation system error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InstallError {
    #[error("not a regular file: {path}")]
    NotAFile { path: String },

    #[error("failed to create install session: {message}")]
    SessionCreateFailed { message: String },

    #[error("unknown install session: {session_id}")]
    UnknownSession { session_id: String },

    #[error("failed writing {path} into session {session_id}: {message}")]
    WriteFailed {
        session_id: String,
        path: String,
        message: String,
    },

    #[error("archive {path} truncated: wrote {written} of {expected} bytes")]
    Truncated {
        path: String,
        written: u64,
        expected: u64,
    },

    #[error("archive {path} is empty")]
    EmptyArchive { path: String },

    #[error("commit failed for session {session_id}: {message}")]
    CommitFailed { session_id: String, message: String },

    #[error("filesystem operation failed: {operation} on {path}: {message}")]
    FilesystemError {
        operation: String,
        path: String,
        message: String,
    },
}

impl InstallError {
    /// Whether this failure belongs to the I/O class that aborts one archive's session
    #[must_use]
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            Self::WriteFailed { .. }
                | Self::Truncated { .. }
                | Self::EmptyArchive { .. }
                | Self::FilesystemError { .. }
        )
    }
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotAFile { .. } | Self::EmptyArchive { .. } | Self::Truncated { .. } => {
                Some("Re-stage the archive in the repository and retry.")
            }
            Self::FilesystemError { .. } | Self::WriteFailed { .. } => {
                Some("Check free space and permissions under the installer root.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::WriteFailed { .. } | Self::FilesystemError { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotAFile { .. } => "install.not_a_file",
            Self::SessionCreateFailed { .. } => "install.session_create_failed",
            Self::UnknownSession { .. } => "install.unknown_session",
            Self::WriteFailed { .. } => "install.write_failed",
            Self::Truncated { .. } => "install.truncated",
            Self::EmptyArchive { .. } => "install.empty_archive",
            Self::CommitFailed { .. } => "install.commit_failed",
            Self::FilesystemError { .. } => "install.filesystem_error",
        };
        Some(code)
    }
}
