//! Filesystem errors of the staging install root and archive files

use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::Path;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("no space left writing {path}")]
    DiskFull { path: String },

    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    #[error("I/O error: {message}")]
    IoError { message: String },

    /// Moving a staged file into place failed; the previous file is intact
    #[error("atomic rename failed: {message}")]
    AtomicRenameFailed { message: String },
}

impl StorageError {
    /// Classify an I/O failure on `path`
    #[must_use]
    pub fn from_io_with_path(err: &std::io::Error, path: &Path) -> Self {
        let path_str = || path.display().to_string();
        match err.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied { path: path_str() },
            ErrorKind::NotFound => Self::PathNotFound { path: path_str() },
            ErrorKind::AlreadyExists => Self::AlreadyExists { path: path_str() },
            ErrorKind::StorageFull => Self::DiskFull { path: path_str() },
            _ => Self::IoError {
                message: format!("{}: {err}", path.display()),
            },
        }
    }
}

impl UserFacingError for StorageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::DiskFull { .. } => Some("Free up space under the install root and retry."),
            Self::PermissionDenied { .. } => {
                Some("Check that the install root is writable by the provisioning user.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::IoError { .. } | Self::AtomicRenameFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::DiskFull { .. } => "storage.disk_full",
            Self::PermissionDenied { .. } => "storage.permission_denied",
            Self::PathNotFound { .. } => "storage.path_not_found",
            Self::AlreadyExists { .. } => "storage.already_exists",
            Self::IoError { .. } => "storage.io_error",
            Self::AtomicRenameFailed { .. } => "storage.atomic_rename_failed",
        })
    }
}
