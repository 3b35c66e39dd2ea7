//! Repository listing and readiness queries

use crate::{OpsCtx, RepositoryListing, RepositoryStatus};
use firstrun_errors::{Error, IndexError, UserFacingError};
use firstrun_events::{AppEvent, EventEmitter, RepoEvent};
use firstrun_index::{load_repository, verify_index_readable, RepositoryLayout};
use firstrun_types::CategoryFilter;
use std::time::Instant;

/// Category filter for an optional requested category
pub(crate) fn category_filter(ctx: &OpsCtx, category: Option<&str>) -> CategoryFilter {
    let names = ctx.config.categories.names();
    match category {
        Some(requested) => CategoryFilter::for_category(requested, &names),
        None => CategoryFilter::Default(names),
    }
}

/// List the apps a repository offers
///
/// Without a category the default filter applies: backend providers are
/// hidden and default-category apps start checked.
///
/// # Errors
///
/// Returns an error if the repository or its manifest cannot be read.
pub async fn list_apps(ctx: &OpsCtx, category: Option<&str>) -> Result<RepositoryListing, Error> {
    let start = Instant::now();
    let repo = ctx.repository();
    let options = ctx.index_options();
    let filter = category_filter(ctx, category);

    let layout = match RepositoryLayout::detect(&repo, &options).await {
        Ok(layout) => layout,
        Err(err) => {
            ctx.emit(AppEvent::Repo(RepoEvent::Unavailable {
                path: repo.clone(),
                reason: err.user_message().into_owned(),
            }));
            return Err(err);
        }
    };
    ctx.emit(AppEvent::Repo(RepoEvent::LoadStarted {
        path: repo.clone(),
        layout: layout.name().to_string(),
        category: filter.category().to_string(),
    }));
    if !options.preferences.is_empty() {
        ctx.emit(AppEvent::Repo(RepoEvent::LocalesResolved {
            candidates: options.preferences.clone(),
        }));
    }

    let load = load_repository(&repo, &filter, &options).await?;
    let skipped: Vec<String> = load.skipped.iter().map(ToString::to_string).collect();
    for err in &load.skipped {
        let (entry, reason) = match err {
            IndexError::EntrySkipped { entry, reason } => (entry.clone(), reason.clone()),
            other => (repo.display().to_string(), other.to_string()),
        };
        ctx.emit(AppEvent::Repo(RepoEvent::EntrySkipped { entry, reason }));
    }

    ctx.emit(AppEvent::Repo(RepoEvent::LoadCompleted {
        path: repo.clone(),
        apps: load.apps.len(),
        skipped: skipped.len(),
        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    }));

    Ok(RepositoryListing {
        repository: repo,
        layout: load.layout.name().to_string(),
        category: filter.category().to_string(),
        apps: load.apps,
        skipped,
    })
}

/// Check whether the configured repository can be provisioned from
///
/// Never fails: an unusable repository is reported in the status.
pub async fn verify_repository(ctx: &OpsCtx) -> RepositoryStatus {
    let repo = ctx.repository();
    let options = ctx.index_options();

    let checked = match RepositoryLayout::detect(&repo, &options).await {
        Ok(RepositoryLayout::Manifest { .. }) => (
            Some("manifest"),
            verify_index_readable(&repo, &options).await,
        ),
        Ok(RepositoryLayout::Flat) => (Some("flat"), Ok(())),
        Err(err) => (None, Err(err)),
    };
    let (layout, result) = checked;

    let problem = result.err().map(|err| {
        tracing::info!(repo = %repo.display(), error = %err, "repository is not usable");
        err.user_message().into_owned()
    });

    RepositoryStatus {
        repository: repo,
        layout: layout.map(str::to_string),
        usable: problem.is_none(),
        problem,
        readiness: ctx.gate.state(),
    }
}

/// Whether a caller should block on provisioning.
///
/// False when the gate is already open or the repository is unusable, in
/// which case there is nothing that could ever open it for us.
pub async fn should_wait_for_provisioning(ctx: &OpsCtx) -> bool {
    if ctx.gate.is_ready() {
        return false;
    }
    verify_repository(ctx).await.usable
}
