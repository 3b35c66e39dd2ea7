#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! High-level operations orchestration for firstrun
//!
//! This crate sits between the CLI and the specialized crates. It owns the
//! install orchestrator and the readiness gate, and exposes the operations
//! a caller drives first-run provisioning with.

mod context;
mod gate;
mod hooks;
mod orchestrator;
mod provision;
mod query;
mod types;

pub use context::{OpsContextBuilder, OpsCtx};
pub use gate::{GateListener, ReadinessGate};
pub use hooks::{CompletionHook, DefaultHandlerHook, BROWSER_ROLE};
pub use orchestrator::{InstallOrchestrator, OrchestratorSettings, OrchestratorState};
pub use types::{RepositoryListing, RepositoryStatus};

// Re-export operation functions
pub use provision::{
    batch_from_selection, provision, provision_repository, provision_selection,
    skip_provisioning, wait_until_ready,
};
pub use query::{list_apps, should_wait_for_provisioning, verify_repository};

use firstrun_errors::Error;
use firstrun_types::{ProvisionReport, ReadinessState};

/// Operation result that can be serialized for CLI output
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OperationResult {
    /// Apps offered by the repository
    AppList(RepositoryListing),
    /// Repository usability
    RepositoryStatus(RepositoryStatus),
    /// Provisioning run report
    ProvisionReport(ProvisionReport),
    /// Final readiness state
    Readiness(ReadinessState),
    /// Generic success message
    Success(String),
}

impl OperationResult {
    /// Convert to JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(Error::from)
    }

    /// Check if this is a success result
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            OperationResult::RepositoryStatus(status) => status.usable,
            OperationResult::ProvisionReport(report) => report.failed.is_empty(),
            OperationResult::AppList(_)
            | OperationResult::Readiness(_)
            | OperationResult::Success(_) => true,
        }
    }
}
