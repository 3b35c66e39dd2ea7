//! Provisioning readiness state

use serde::{Deserialize, Serialize};

/// Whether onboarding may proceed past the provisioning wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessState {
    /// Provisioning has not reached a terminal state
    #[default]
    Pending,
    /// Provisioning completed (fully or after the timeout)
    Ready,
    /// Nothing to provision, e.g. no usable repository
    Skipped,
}

impl ReadinessState {
    /// `Ready` and `Skipped` both release waiting callers
    #[must_use]
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}
