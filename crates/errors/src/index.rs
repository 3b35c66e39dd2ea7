//! Repository index error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum IndexError {
    /// The repository directory is missing or is not a directory.
    #[error("repository unavailable: {path}")]
    RepositoryUnavailable { path: String },

    #[error("repository manifest not found: {path}")]
    ManifestNotFound { path: String },

    #[error("failed to parse repository manifest {path}: {message}")]
    ManifestParse { path: String, message: String },

    /// One manifest entry could not be turned into a descriptor.
    #[error("skipped entry {entry}: {reason}")]
    EntrySkipped { entry: String, reason: String },
}

impl UserFacingError for IndexError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::RepositoryUnavailable { .. } | Self::ManifestNotFound { .. } => {
                Some("Check the repository path (--repo or [repository].path in the config).")
            }
            Self::ManifestParse { .. } => {
                Some("The repository manifest is not valid JSON; regenerate the repository.")
            }
            Self::EntrySkipped { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::RepositoryUnavailable { .. } => "index.repository_unavailable",
            Self::ManifestNotFound { .. } => "index.manifest_not_found",
            Self::ManifestParse { .. } => "index.manifest_parse",
            Self::EntrySkipped { .. } => "index.entry_skipped",
        };
        Some(code)
    }
}
