use serde::{Deserialize, Serialize};

use crate::EventSource;
use firstrun_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, when the error carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod general;
pub mod install;
pub mod provision;
pub mod repo;

pub use general::*;
pub use install::*;
pub use provision::*;
pub use repo::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Repository loading and locale resolution
    Repo(RepoEvent),

    /// Install sessions and package-added notifications
    Install(InstallEvent),

    /// Provisioning runs and readiness
    Provision(ProvisionEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::General,
            Self::Repo(_) => EventSource::Repo,
            Self::Install(_) => EventSource::Install,
            Self::Provision(_) => EventSource::Provision,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::General(GeneralEvent::Error { .. } | GeneralEvent::OperationFailed { .. })
            | Self::Install(InstallEvent::SessionAbandoned { .. })
            | Self::Provision(ProvisionEvent::HookFailed { .. }) => Level::ERROR,

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Repo(RepoEvent::EntrySkipped { .. } | RepoEvent::Unavailable { .. })
            | Self::Install(InstallEvent::MetadataFallback { .. })
            | Self::Provision(ProvisionEvent::TimedOut { .. }) => Level::WARN,

            // Debug-level events
            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Repo(RepoEvent::LocalesResolved { .. })
            | Self::Install(
                InstallEvent::SessionCreated { .. } | InstallEvent::Streamed { .. },
            )
            | Self::Provision(
                ProvisionEvent::WaitTick { .. } | ProvisionEvent::StateChanged { .. },
            ) => Level::DEBUG,

            // Trace-level events
            Self::Install(InstallEvent::PackageAdded { expected: false, .. }) => Level::TRACE,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "firstrun::events::general",
            Self::Repo(_) => "firstrun::events::repo",
            Self::Install(_) => "firstrun::events::install",
            Self::Provision(_) => "firstrun::events::provision",
        }
    }

    /// Get structured fields for logging
    #[must_use]
    pub fn log_fields(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
