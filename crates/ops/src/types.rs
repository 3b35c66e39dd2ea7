//! Result types returned by operations

use firstrun_types::{AppDescriptor, ReadinessState};
use serde::Serialize;
use std::path::PathBuf;

/// Apps available in a repository
#[derive(Clone, Debug, Serialize)]
pub struct RepositoryListing {
    pub repository: PathBuf,
    /// "manifest" or "flat"
    pub layout: String,
    pub category: String,
    pub apps: Vec<AppDescriptor>,
    /// Entries that could not be read, with the reason
    pub skipped: Vec<String>,
}

impl RepositoryListing {
    /// Apps that start out selected
    pub fn checked(&self) -> impl Iterator<Item = &AppDescriptor> {
        self.apps.iter().filter(|app| app.checked)
    }
}

/// Whether a repository can be provisioned from
#[derive(Clone, Debug, Serialize)]
pub struct RepositoryStatus {
    pub repository: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    pub usable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    pub readiness: ReadinessState,
}
