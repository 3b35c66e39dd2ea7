//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so a
//! debug log file carries the same information the terminal shows.

use firstrun_events::{AppEvent, EventMessage, InstallEvent, ProvisionEvent, RepoEvent};
use tracing::{debug, error, info, trace, warn, Level};

/// Log an event using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;

    match event {
        AppEvent::Repo(RepoEvent::LoadCompleted {
            path,
            apps,
            skipped,
            duration_ms,
        }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                path = %path.display(),
                apps,
                skipped,
                duration_ms,
                "Repository loaded"
            );
        }
        AppEvent::Install(InstallEvent::SessionCreated {
            session_id,
            archive,
            package_id,
            size_estimate,
        }) => {
            debug!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                session_id = %session_id,
                archive = %archive.display(),
                package = ?package_id,
                size_estimate,
                "Install session created"
            );
        }
        AppEvent::Install(InstallEvent::SessionAbandoned {
            session_id,
            archive,
            failure,
        }) => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                session_id = ?session_id,
                archive = %archive.display(),
                retryable = failure.retryable,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Install session abandoned"
            );
        }
        AppEvent::Provision(ProvisionEvent::TimedOut { run_id, missing }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                run_id = %run_id,
                missing = ?missing,
                "Provisioning timed out"
            );
        }
        AppEvent::Provision(ProvisionEvent::Completed { run_id, outcome }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                run_id = %run_id,
                outcome = ?outcome,
                "Provisioning completed"
            );
        }
        _ => log_generic(message),
    }
}

/// Fallback for events without a dedicated record: the event as JSON
fn log_generic(message: &EventMessage) {
    let meta = &message.meta;
    let fields = message.event.log_fields();
    let target = message.event.log_target();

    let level = meta.tracing_level();
    if level == Level::ERROR {
        error!(
            source = meta.source.as_str(),
            event_id = %meta.event_id,
            correlation = ?meta.correlation_id,
            event_target = target,
            fields = %fields,
            "Event"
        );
    } else if level == Level::WARN {
        warn!(
            source = meta.source.as_str(),
            event_id = %meta.event_id,
            correlation = ?meta.correlation_id,
            event_target = target,
            fields = %fields,
            "Event"
        );
    } else if level == Level::INFO {
        info!(
            source = meta.source.as_str(),
            event_id = %meta.event_id,
            correlation = ?meta.correlation_id,
            event_target = target,
            fields = %fields,
            "Event"
        );
    } else if level == Level::DEBUG {
        debug!(
            source = meta.source.as_str(),
            event_id = %meta.event_id,
            correlation = ?meta.correlation_id,
            event_target = target,
            fields = %fields,
            "Event"
        );
    } else {
        trace!(
            source = meta.source.as_str(),
            event_id = %meta.event_id,
            correlation = ?meta.correlation_id,
            event_target = target,
            fields = %fields,
            "Event"
        );
    }
}
