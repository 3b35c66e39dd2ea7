//! One-time side effects of a completed provisioning run

use async_trait::async_trait;
use firstrun_errors::Error;
use firstrun_install::DefaultHandlerRegistry;
use firstrun_types::ProvisionOutcome;
use std::sync::Arc;

/// Runs once, on the run that completes provisioning
#[async_trait]
pub trait CompletionHook: Send + Sync {
    fn name(&self) -> &str;

    async fn on_complete(&self, outcome: &ProvisionOutcome) -> Result<(), Error>;
}

/// Role under which the default browser is registered
pub const BROWSER_ROLE: &str = "browser";

/// Designates a package as the default handler for a role
pub struct DefaultHandlerHook {
    registry: Arc<dyn DefaultHandlerRegistry>,
    role: String,
    package_id: String,
}

impl DefaultHandlerHook {
    pub fn new(
        registry: Arc<dyn DefaultHandlerRegistry>,
        role: impl Into<String>,
        package_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            role: role.into(),
            package_id: package_id.into(),
        }
    }

    /// Hook that makes `package_id` the default browser
    pub fn browser(registry: Arc<dyn DefaultHandlerRegistry>, package_id: impl Into<String>) -> Self {
        Self::new(registry, BROWSER_ROLE, package_id)
    }
}

impl std::fmt::Debug for DefaultHandlerHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultHandlerHook")
            .field("role", &self.role)
            .field("package_id", &self.package_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CompletionHook for DefaultHandlerHook {
    fn name(&self) -> &str {
        "default-handler"
    }

    async fn on_complete(&self, _outcome: &ProvisionOutcome) -> Result<(), Error> {
        self.registry
            .set_default_handler(&self.role, &self.package_id)
            .await
    }
}
