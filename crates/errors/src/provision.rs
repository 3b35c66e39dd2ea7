//! Provisioning orchestration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ProvisionError {
    #[error("a provisioning run is already in progress ({run_id})")]
    AlreadyRunning { run_id: String },

    #[error("invalid provisioning request: {message}")]
    InvalidRequest { message: String },

    #[error("completion hook {hook} failed: {message}")]
    HookFailed { hook: String, message: String },

    #[error("missing component: {component}")]
    MissingComponent { component: String },
}

impl UserFacingError for ProvisionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::AlreadyRunning { .. } => Some("Wait for the running provisioning to finish."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::AlreadyRunning { .. } => "provision.already_running",
            Self::InvalidRequest { .. } => "provision.invalid_request",
            Self::HookFailed { .. } => "provision.hook_failed",
            Self::MissingComponent { .. } => "provision.missing_component",
        };
        Some(code)
    }
}
