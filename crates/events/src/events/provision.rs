use firstrun_types::{ProvisionOutcome, ReadinessState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FailureContext;

/// Provisioning run events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProvisionEvent {
    /// A run began issuing installs
    Started {
        run_id: Uuid,
        archives: usize,
        expected: Vec<String>,
    },

    /// The orchestrator moved to a new state
    StateChanged { run_id: Uuid, state: String },

    /// All installs are issued; waiting for the expected packages
    WaitingStarted { run_id: Uuid, timeout_secs: u64 },

    /// An expected package was observed as installed
    PackageObserved {
        package_id: String,
        remaining: usize,
    },

    /// Periodic re-check while waiting
    WaitTick { remaining: usize, elapsed_ms: u64 },

    /// The deadline passed before every expected package reported back
    TimedOut { run_id: Uuid, missing: Vec<String> },

    /// The run reached its terminal state
    Completed {
        run_id: Uuid,
        outcome: ProvisionOutcome,
    },

    /// A completion hook ran
    HookCompleted { hook: String },

    /// A completion hook failed; provisioning still counts as complete
    HookFailed {
        hook: String,
        failure: FailureContext,
    },

    /// The readiness gate changed state
    ReadinessChanged { state: ReadinessState },
}
