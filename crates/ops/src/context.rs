//! Operations context for dependency injection

use crate::gate::ReadinessGate;
use crate::hooks::CompletionHook;
use crate::orchestrator::{InstallOrchestrator, OrchestratorSettings};
use firstrun_config::Config;
use firstrun_errors::{Error, ProvisionError};
use firstrun_events::{EventEmitter, EventSender};
use firstrun_index::{IndexOptions, SystemLocales};
use firstrun_install::PackageInstaller;
use std::path::PathBuf;
use std::sync::Arc;

/// Operations context providing access to all provisioning components
pub struct OpsCtx {
    /// System configuration
    pub config: Config,
    /// System package installer
    pub installer: Arc<dyn PackageInstaller>,
    /// Readiness gate shared with every waiting caller
    pub gate: ReadinessGate,
    pub orchestrator: InstallOrchestrator,
    /// Event sender for progress reporting
    pub tx: EventSender,
}

impl OpsCtx {
    /// Repository directory from configuration
    #[must_use]
    pub fn repository(&self) -> PathBuf {
        self.config.repository.path.clone()
    }

    /// Index reader options derived from configuration.
    ///
    /// Falls back to the process locale when no preferences are configured.
    #[must_use]
    pub fn index_options(&self) -> IndexOptions {
        let preferences = if self.config.locale.preferences.is_empty() {
            SystemLocales::from_env().into_preferences()
        } else {
            self.config.locale.preferences.clone()
        };
        IndexOptions {
            manifest_file: self.config.repository.manifest.clone(),
            icon_density: self.config.repository.icon_density.clone(),
            archive_extension: self.config.repository.archive_extension.clone(),
            preferences,
        }
    }
}

impl EventEmitter for OpsCtx {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

impl std::fmt::Debug for OpsCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpsCtx")
            .field("config", &self.config)
            .field("gate", &self.gate)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

/// Builder for operations context
pub struct OpsContextBuilder {
    config: Option<Config>,
    installer: Option<Arc<dyn PackageInstaller>>,
    gate: Option<ReadinessGate>,
    hooks: Vec<Arc<dyn CompletionHook>>,
    tx: Option<EventSender>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: None,
            installer: None,
            gate: None,
            hooks: Vec::new(),
            tx: None,
        }
    }

    /// Set configuration
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the system installer
    #[must_use]
    pub fn with_installer(mut self, installer: Arc<dyn PackageInstaller>) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Share an existing readiness gate instead of creating one
    #[must_use]
    pub fn with_gate(mut self, gate: ReadinessGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Add a completion hook
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn CompletionHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if any required component is missing.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let config = self
            .config
            .ok_or_else(|| ProvisionError::MissingComponent {
                component: "config".to_string(),
            })?;

        let installer = self
            .installer
            .ok_or_else(|| ProvisionError::MissingComponent {
                component: "installer".to_string(),
            })?;

        let tx = self.tx.ok_or_else(|| ProvisionError::MissingComponent {
            component: "event_sender".to_string(),
        })?;

        let gate = self.gate.unwrap_or_default();
        let settings = OrchestratorSettings {
            timeout: config.provision.timeout(),
            poll_interval: config.provision.poll_interval(),
            installer_identity: config.install.installer_identity.clone(),
            chunk_size: config.install.chunk_size,
        };
        let orchestrator = self.hooks.into_iter().fold(
            InstallOrchestrator::new(Arc::clone(&installer), gate.clone(), settings)
                .with_event_sender(tx.clone()),
            InstallOrchestrator::with_hook,
        );

        Ok(OpsCtx {
            config,
            installer,
            gate,
            orchestrator,
            tx,
        })
    }
}

impl Default for OpsContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
