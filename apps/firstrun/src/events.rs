//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use console::style;
use firstrun_events::{
    AppEvent, EventMessage, GeneralEvent, InstallEvent, ProvisionEvent, RepoEvent,
};
use firstrun_types::ProvisionOutcome;

/// Renders progress events to stderr and forwards them to tracing
pub struct EventHandler {
    colors_enabled: bool,
    debug_enabled: bool,
    /// Suppress terminal output entirely (JSON mode)
    quiet: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        log_event_with_tracing(&message);
        if self.quiet {
            return;
        }

        match message.event {
            AppEvent::General(event) => self.handle_general(event),
            AppEvent::Repo(event) => self.handle_repo(event),
            AppEvent::Install(event) => self.handle_install(event),
            AppEvent::Provision(event) => self.handle_provision(event),
        }
    }

    fn handle_general(&self, event: GeneralEvent) {
        match event {
            GeneralEvent::Warning { message, context } => match context {
                Some(context) => self.show_warning(&format!("{message}: {context}")),
                None => self.show_warning(&message),
            },
            GeneralEvent::Error { message, details } => match details {
                Some(details) => self.show_error(&format!("{message}: {details}")),
                None => self.show_error(&message),
            },
            GeneralEvent::DebugLog { message } => {
                if self.debug_enabled {
                    self.show_status(&message);
                }
            }
            GeneralEvent::OperationFailed { operation, error } => {
                self.show_error(&format!("{operation} failed: {error}"));
            }
            GeneralEvent::OperationStarted { .. } | GeneralEvent::OperationCompleted { .. } => {}
        }
    }

    fn handle_repo(&self, event: RepoEvent) {
        match event {
            RepoEvent::LoadStarted {
                path,
                layout,
                category,
            } => {
                self.show_status(&format!(
                    "Reading {} ({layout} layout, category {category})",
                    path.display()
                ));
            }
            RepoEvent::EntrySkipped { entry, reason } => {
                self.show_warning(&format!("Skipped {entry}: {reason}"));
            }
            RepoEvent::Unavailable { path, reason } => {
                self.show_warning(&format!("Repository {} unavailable: {reason}", path.display()));
            }
            RepoEvent::LoadCompleted { apps, skipped, .. } => {
                if skipped > 0 {
                    self.show_status(&format!("Found {apps} apps ({skipped} skipped)"));
                } else {
                    self.show_status(&format!("Found {apps} apps"));
                }
            }
            RepoEvent::LocalesResolved { candidates } => {
                if self.debug_enabled {
                    self.show_status(&format!("Locales: {}", candidates.join(", ")));
                }
            }
        }
    }

    fn handle_install(&self, event: InstallEvent) {
        match event {
            InstallEvent::SessionCreated {
                archive,
                package_id,
                ..
            } => {
                let name = package_id.unwrap_or_else(|| archive.display().to_string());
                self.show_status(&format!("Installing {name}"));
            }
            InstallEvent::MetadataFallback { archive, reason, .. } => {
                self.show_warning(&format!(
                    "Could not read metadata of {}: {reason}",
                    archive.display()
                ));
            }
            InstallEvent::SessionAbandoned {
                archive, failure, ..
            } => {
                self.show_error(&format!(
                    "Install of {} abandoned: {}",
                    archive.display(),
                    failure.message
                ));
            }
            InstallEvent::PackageAdded {
                package_id,
                expected: true,
            } => {
                self.show_success(&format!("Installed {package_id}"));
            }
            InstallEvent::Streamed { bytes, .. } => {
                if self.debug_enabled {
                    self.show_status(&format!("Streamed {bytes} bytes"));
                }
            }
            InstallEvent::SessionCommitted { .. } | InstallEvent::PackageAdded { .. } => {}
        }
    }

    fn handle_provision(&self, event: ProvisionEvent) {
        match event {
            ProvisionEvent::Started {
                archives, expected, ..
            } => {
                self.show_status(&format!(
                    "Provisioning {archives} archives, waiting for {} packages",
                    expected.len()
                ));
            }
            ProvisionEvent::WaitingStarted { timeout_secs, .. } => {
                self.show_status(&format!("Waiting up to {timeout_secs}s for installs to finish"));
            }
            ProvisionEvent::TimedOut { missing, .. } => {
                self.show_warning(&format!(
                    "Timed out; still missing: {}",
                    missing.join(", ")
                ));
            }
            ProvisionEvent::Completed { outcome, .. } => match outcome {
                ProvisionOutcome::AllInstalled => self.show_success("All apps installed"),
                ProvisionOutcome::TimedOut { .. } => {
                    self.show_warning("Provisioning finished with missing apps");
                }
                ProvisionOutcome::NothingExpected => self.show_success("Nothing to wait for"),
                ProvisionOutcome::AlreadyComplete => {
                    self.show_status("Provisioning was already complete");
                }
            },
            ProvisionEvent::HookFailed { hook, failure } => {
                self.show_warning(&format!("{hook} failed: {}", failure.message));
            }
            ProvisionEvent::ReadinessChanged { state } => {
                self.show_status(&format!("Readiness: {state}"));
            }
            ProvisionEvent::WaitTick {
                remaining,
                elapsed_ms,
            } => {
                if self.debug_enabled {
                    self.show_status(&format!(
                        "{remaining} packages outstanding after {}s",
                        elapsed_ms / 1000
                    ));
                }
            }
            ProvisionEvent::StateChanged { .. }
            | ProvisionEvent::PackageObserved { .. }
            | ProvisionEvent::HookCompleted { .. } => {}
        }
    }

    fn show_status(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{} {message}", style("::").cyan().bold());
        } else {
            eprintln!(":: {message}");
        }
    }

    fn show_success(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{} {message}", style("ok").green().bold());
        } else {
            eprintln!("ok {message}");
        }
    }

    fn show_warning(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{} {message}", style("warning:").yellow().bold());
        } else {
            eprintln!("warning: {message}");
        }
    }

    fn show_error(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{} {message}", style("error:").red().bold());
        } else {
            eprintln!("error: {message}");
        }
    }
}
