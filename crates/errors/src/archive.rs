//! Archive introspection error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    #[error("not a regular file: {path}")]
    NotAFile { path: String },

    #[error("cannot read archive {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("archive {path} carries no manifest.toml")]
    MetadataMissing { path: String },

    #[error("invalid metadata in {path}: {message}")]
    InvalidMetadata { path: String, message: String },
}

impl UserFacingError for ArchiveError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotAFile { .. } => "archive.not_a_file",
            Self::Unreadable { .. } => "archive.unreadable",
            Self::MetadataMissing { .. } => "archive.metadata_missing",
            Self::InvalidMetadata { .. } => "archive.invalid_metadata",
        };
        Some(code)
    }
}
