//! Provisioning operations

use crate::query::list_apps;
use crate::OpsCtx;
use firstrun_errors::{Error, UserFacingError};
use firstrun_events::{AppEvent, EventEmitter, ProvisionEvent};
use firstrun_selection::SelectionModel;
use firstrun_types::{
    ArchiveRefs, BatchRequest, ProvisionOutcome, ProvisionReport, ReadinessState, Uuid,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Install a batch and wait for its expected packages
///
/// # Errors
///
/// Returns an error if a provisioning run is already in progress.
pub async fn provision(ctx: &OpsCtx, request: BatchRequest) -> Result<ProvisionReport, Error> {
    ctx.emit_operation_started("provision");
    match ctx.orchestrator.run(request).await {
        Ok(report) => {
            ctx.emit_operation_completed("provision", report.failed.is_empty());
            Ok(report)
        }
        Err(err) => {
            ctx.emit_operation_failed("provision", err.user_message());
            Err(err)
        }
    }
}

/// Provision the checked apps of a selection
///
/// Archive references that are not absolute are resolved against the
/// configured repository directory.
///
/// # Errors
///
/// Returns an error if a provisioning run is already in progress.
pub async fn provision_selection(
    ctx: &OpsCtx,
    selection: &SelectionModel,
) -> Result<ProvisionReport, Error> {
    let request = batch_from_selection(&ctx.repository(), selection);
    provision(ctx, request).await
}

/// Build the batch request for the checked apps of a selection
#[must_use]
pub fn batch_from_selection(base: &Path, selection: &SelectionModel) -> BatchRequest {
    let refs = selection.selected_archive_refs();
    let archives = if refs.iter().all(|r| Path::new(r).is_absolute()) {
        ArchiveRefs::Absolute {
            paths: refs.into_iter().map(PathBuf::from).collect(),
        }
    } else {
        ArchiveRefs::Relative {
            base: base.to_path_buf(),
            names: refs,
        }
    };
    BatchRequest::new(archives, selection.selected_package_ids())
}

/// Load the configured repository, select apps and provision them.
///
/// With an empty `only` the apps checked by the category filter are
/// installed; otherwise exactly the listed package ids. An unusable
/// repository is not an error: the gate opens as skipped and the report
/// says nothing was expected.
///
/// # Errors
///
/// Returns an error if a provisioning run is already in progress.
pub async fn provision_repository(
    ctx: &OpsCtx,
    category: Option<&str>,
    only: &[String],
) -> Result<ProvisionReport, Error> {
    let listing = match list_apps(ctx, category).await {
        Ok(listing) => listing,
        Err(err) => {
            tracing::warn!(error = %err, "repository unavailable, skipping provisioning");
            skip_provisioning(ctx);
            return Ok(ProvisionReport {
                run_id: Uuid::new_v4(),
                outcome: ProvisionOutcome::NothingExpected,
                issued: Vec::new(),
                failed: Vec::new(),
                expected: Vec::new(),
                observed: Vec::new(),
                duration: Duration::ZERO,
            });
        }
    };

    let mut selection = SelectionModel::new();
    selection.insert_all(listing.apps);
    if !only.is_empty() {
        selection.set_all_checked(false);
        for package_id in only {
            if selection.find(package_id).is_none() {
                tracing::warn!(package = %package_id, "requested package is not in the repository");
                ctx.emit_warning(format!("{package_id} is not in the repository"));
                continue;
            }
            selection.set_checked(package_id, true);
        }
    }

    provision_selection(ctx, &selection).await
}

/// Open the gate as skipped when there is nothing to provision from
pub fn skip_provisioning(ctx: &OpsCtx) -> bool {
    let opened = ctx.gate.open(ReadinessState::Skipped);
    if opened {
        ctx.emit(AppEvent::Provision(ProvisionEvent::ReadinessChanged {
            state: ReadinessState::Skipped,
        }));
    }
    opened
}

/// Block until the readiness gate opens
pub async fn wait_until_ready(ctx: &OpsCtx) -> ReadinessState {
    ctx.gate.wait().await
}
