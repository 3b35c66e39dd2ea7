use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Install session events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InstallEvent {
    /// Archive metadata could not be read; installing with the raw file size
    MetadataFallback {
        archive: PathBuf,
        reason: String,
        size_estimate: u64,
    },

    /// A session was opened for an archive
    SessionCreated {
        session_id: String,
        archive: PathBuf,
        package_id: Option<String>,
        size_estimate: u64,
    },

    /// The archive bytes were written and flushed into the session
    Streamed {
        session_id: String,
        bytes: u64,
        chunks: usize,
    },

    /// The session was committed to the installer
    SessionCommitted { session_id: String, archive: PathBuf },

    /// The session was discarded after a failure
    SessionAbandoned {
        session_id: Option<String>,
        archive: PathBuf,
        failure: FailureContext,
    },

    /// The installer finished installing a package
    PackageAdded { package_id: String, expected: bool },
}
