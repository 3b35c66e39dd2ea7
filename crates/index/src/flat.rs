//! Flat repository layout: a directory of archives without a manifest

use firstrun_archive::inspect_archive;
use firstrun_errors::{Error, IndexError};
use firstrun_types::{AppDescriptor, CategoryFilter};
use std::path::{Path, PathBuf};

/// Build descriptors by introspecting every archive in `dir`
///
/// Archives are visited in file name order and each descriptor carries the
/// archive's absolute path. Declared categories pass through `filter` like
/// a manifest entry. An archive declaring none is included checked by the
/// default filter and left out when a single category is requested.
/// Archives whose metadata cannot be read are skipped.
///
/// # Errors
///
/// Returns `IndexError::RepositoryUnavailable` if the directory cannot be
/// listed.
pub async fn load_flat_directory(
    dir: &Path,
    extension: &str,
    filter: &CategoryFilter,
) -> Result<(Vec<AppDescriptor>, Vec<IndexError>), Error> {
    let unavailable = || IndexError::RepositoryUnavailable {
        path: dir.display().to_string(),
    };
    let dir = tokio::fs::canonicalize(dir).await.map_err(|_| unavailable())?;
    let mut entries = tokio::fs::read_dir(&dir).await.map_err(|_| unavailable())?;

    let mut archives: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|_| unavailable())? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && entry.file_type().await.is_ok_and(|t| t.is_file()) {
            archives.push(path);
        }
    }
    archives.sort();

    let mut apps: Vec<AppDescriptor> = Vec::new();
    let mut skipped = Vec::new();
    for path in archives {
        match inspect_archive(&path).await {
            Ok(meta) => {
                if apps.iter().any(|app| app.package_id == meta.package.id) {
                    let err = IndexError::EntrySkipped {
                        entry: path.display().to_string(),
                        reason: format!("duplicate package id {}", meta.package.id),
                    };
                    tracing::warn!(error = %err, "skipping archive");
                    skipped.push(err);
                    continue;
                }
                let package = meta.package;
                let admitted = match filter {
                    CategoryFilter::Default(_) if package.categories.is_empty() => Some(true),
                    _ => filter.admit(&package.categories),
                };
                let Some(checked) = admitted else {
                    tracing::debug!(
                        archive = %path.display(),
                        category = filter.category(),
                        "archive filtered out"
                    );
                    continue;
                };
                let mut app = AppDescriptor::new(package.id, path.display().to_string())
                    .with_categories(package.categories)
                    .with_checked(checked);
                app.display_name = package.label.filter(|l| !l.is_empty());
                app.summary = package.summary;
                app.description = package
                    .description
                    .as_deref()
                    .map(crate::format_description);
                apps.push(app);
            }
            Err(e) => {
                let err = IndexError::EntrySkipped {
                    entry: path.display().to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!(error = %err, "skipping archive");
                skipped.push(err);
            }
        }
    }

    Ok((apps, skipped))
}
