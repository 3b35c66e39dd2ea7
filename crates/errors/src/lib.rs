#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for firstrun
//!
//! One error enum per domain, folded into [`Error`] at crate boundaries.
//! Every type implements [`UserFacingError`] so the CLI and the event
//! stream can render a message, a stable code and an optional hint without
//! knowing which domain failed.

use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

pub mod archive;
pub mod config;
pub mod index;
pub mod install;
pub mod provision;
pub mod storage;

pub use archive::ArchiveError;
pub use config::ConfigError;
pub use index::IndexError;
pub use install::InstallError;
pub use provision::ProvisionError;
pub use storage::StorageError;

/// Error crossing crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("install error: {0}")]
    Install(#[from] InstallError),

    #[error("provision error: {0}")]
    Provision(#[from] ProvisionError),

    /// A background task or channel failed underneath us
    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<PathBuf>,
    },
}

impl Error {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// I/O failure on a known path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::Io {
            kind: err.kind(),
            message: format!("{}: {err}", path.display()),
            path: Some(path),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// What a caller needs to show an error to a person
pub trait UserFacingError {
    fn user_message(&self) -> Cow<'_, str>;

    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether the same operation might succeed if tried again
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable dotted code, e.g. `install.truncated`
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Index(err) => err.user_message(),
            Error::Install(err) => err.user_message(),
            Error::Io { message, .. } => Cow::Borrowed(message),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Index(err) => err.user_hint(),
            Error::Install(err) => err.user_hint(),
            Error::Storage(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            Error::Provision(err) => err.user_hint(),
            Error::Archive(_) | Error::Internal(_) | Error::Io { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Install(err) => err.is_retryable(),
            Error::Storage(err) => err.is_retryable(),
            Error::Io { .. } => true,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Storage(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::Index(err) => err.user_code(),
            Error::Archive(err) => err.user_code(),
            Error::Install(err) => err.user_code(),
            Error::Provision(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}
