use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Repository reading events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RepoEvent {
    /// Loading a repository started
    LoadStarted {
        path: PathBuf,
        layout: String, // "manifest" or "flat"
        category: String,
    },

    /// Locale candidates chosen for localized lookups
    LocalesResolved { candidates: Vec<String> },

    /// One entry was skipped; the load continues
    EntrySkipped { entry: String, reason: String },

    /// Loading finished
    LoadCompleted {
        path: PathBuf,
        apps: usize,
        skipped: usize,
        duration_ms: u64,
    },

    /// The repository could not be read at all
    Unavailable { path: PathBuf, reason: String },
}
