//! Report type definitions for operations

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// How a provisioning run reached its terminal state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProvisionOutcome {
    /// Every expected package reported installed
    AllInstalled,
    /// The wait deadline passed; listed packages never reported back
    TimedOut { missing: Vec<String> },
    /// The request expected nothing, so there was nothing to wait for
    NothingExpected,
    /// A previous run already completed provisioning
    AlreadyComplete,
}

impl ProvisionOutcome {
    /// True for the degraded-success outcome
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// An archive whose install session failed
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveFailure {
    pub archive: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Provisioning report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvisionReport {
    /// Identifier of the provisioning run
    pub run_id: Uuid,
    pub outcome: ProvisionOutcome,
    /// Archives whose install sessions were committed
    pub issued: Vec<String>,
    /// Archives whose sessions were abandoned
    pub failed: Vec<ArchiveFailure>,
    /// Expected package ids
    pub expected: Vec<String>,
    /// Expected package ids observed as installed
    pub observed: Vec<String>,
    /// Wall time of the run
    pub duration: Duration,
}
