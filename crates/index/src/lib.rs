#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Repository index reading for firstrun
//!
//! This crate turns a locally staged app repository into app descriptors.
//! Two layouts are supported: a directory with an `index-v1.json` manifest
//! plus `icons-<density>/`, and a flat directory of archives that are
//! introspected one by one. Broken entries are logged and skipped; only an
//! unreadable repository or manifest fails the load.

mod flat;
pub mod locale;
mod models;

pub use flat::load_flat_directory;
pub use locale::{LocaleCandidates, SystemLocales};
pub use models::{format_description, ApkVariant, AppEntry, RepositoryIndex, LINE_BREAK};

use firstrun_errors::{Error, IndexError};
use firstrun_types::{AppDescriptor, CategoryFilter};
use std::path::{Path, PathBuf};

/// File and directory names used when reading a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    pub manifest_file: String,
    pub icon_density: String,
    pub archive_extension: String,
    /// Ordered locale preferences, most preferred first
    pub preferences: Vec<String>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            manifest_file: "index-v1.json".to_string(),
            icon_density: "640".to_string(),
            archive_extension: "apk".to_string(),
            preferences: Vec::new(),
        }
    }
}

impl IndexOptions {
    #[must_use]
    pub fn with_preferences(mut self, preferences: Vec<String>) -> Self {
        self.preferences = preferences;
        self
    }

    fn icon_dir(&self, repo: &Path) -> PathBuf {
        repo.join(format!("icons-{}", self.icon_density))
    }
}

/// How a repository directory is organized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryLayout {
    /// A manifest file describes the apps
    Manifest { manifest: PathBuf },
    /// No manifest; every archive is introspected
    Flat,
}

impl RepositoryLayout {
    /// Inspect a repository directory
    ///
    /// # Errors
    ///
    /// Returns `IndexError::RepositoryUnavailable` if `repo` is not a readable
    /// directory.
    pub async fn detect(repo: &Path, options: &IndexOptions) -> Result<Self, Error> {
        let unavailable = || IndexError::RepositoryUnavailable {
            path: repo.display().to_string(),
        };
        let meta = tokio::fs::metadata(repo).await.map_err(|_| unavailable())?;
        if !meta.is_dir() {
            return Err(unavailable().into());
        }

        let manifest = repo.join(&options.manifest_file);
        if tokio::fs::try_exists(&manifest).await.unwrap_or(false) {
            Ok(Self::Manifest { manifest })
        } else {
            Ok(Self::Flat)
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Manifest { .. } => "manifest",
            Self::Flat => "flat",
        }
    }
}

/// Outcome of reading a repository
#[derive(Debug, Clone)]
pub struct IndexLoad {
    pub layout: RepositoryLayout,
    /// Included apps in manifest (or file name) order
    pub apps: Vec<AppDescriptor>,
    /// Entries that could not be read
    pub skipped: Vec<IndexError>,
}

/// Read a repository in whichever layout it uses
///
/// # Errors
///
/// Returns an error if the repository directory or its manifest cannot be
/// read. Individual entries never fail the load.
pub async fn load_repository(
    repo: &Path,
    filter: &CategoryFilter,
    options: &IndexOptions,
) -> Result<IndexLoad, Error> {
    match RepositoryLayout::detect(repo, options).await? {
        RepositoryLayout::Manifest { .. } => load_index(repo, filter, options).await,
        RepositoryLayout::Flat => {
            let (apps, skipped) =
                load_flat_directory(repo, &options.archive_extension, filter).await?;
            Ok(IndexLoad {
                layout: RepositoryLayout::Flat,
                apps,
                skipped,
            })
        }
    }
}

/// Read the manifest of a repository and build descriptors for every app
/// the category filter admits
///
/// # Errors
///
/// Returns `ManifestNotFound` or `ManifestParse` when the manifest itself is
/// unusable.
pub async fn load_index(
    repo: &Path,
    filter: &CategoryFilter,
    options: &IndexOptions,
) -> Result<IndexLoad, Error> {
    let manifest = repo.join(&options.manifest_file);
    let index = read_manifest(&manifest).await?;
    let icon_dir = options.icon_dir(repo);

    let mut apps = Vec::new();
    let mut skipped = Vec::new();

    for (position, value) in index.apps.iter().enumerate() {
        match build_descriptor(&index, value, position, filter, options, &icon_dir).await {
            Ok(Some(app)) => apps.push(app),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "skipping repository entry");
                skipped.push(err);
            }
        }
    }

    tracing::debug!(
        repo = %repo.display(),
        apps = apps.len(),
        skipped = skipped.len(),
        category = filter.category(),
        "loaded repository index"
    );

    Ok(IndexLoad {
        layout: RepositoryLayout::Manifest { manifest },
        apps,
        skipped,
    })
}

/// Check up front whether the manifest can be read and parsed
///
/// # Errors
///
/// Returns `ManifestNotFound` or `ManifestParse`.
pub async fn verify_index_readable(repo: &Path, options: &IndexOptions) -> Result<(), Error> {
    read_manifest(&repo.join(&options.manifest_file))
        .await
        .map(|_| ())
}

async fn read_manifest(path: &Path) -> Result<RepositoryIndex, Error> {
    let contents =
        tokio::fs::read_to_string(path)
            .await
            .map_err(|_| IndexError::ManifestNotFound {
                path: path.display().to_string(),
            })?;
    RepositoryIndex::from_json(&contents, &path.display().to_string())
}

async fn build_descriptor(
    index: &RepositoryIndex,
    value: &serde_json::Value,
    position: usize,
    filter: &CategoryFilter,
    options: &IndexOptions,
    icon_dir: &Path,
) -> Result<Option<AppDescriptor>, IndexError> {
    let entry = AppEntry::from_value(value, position)?;
    let Some(checked) = filter.admit(&entry.categories) else {
        return Ok(None);
    };
    let variant = index.first_variant(&entry.package_name)?;

    let mut name = entry.name.clone().filter(|n| !n.is_empty());
    let mut summary = entry.summary.clone().filter(|s| !s.is_empty());
    let mut description = entry
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(format_description);

    if let Some(localized) = entry.localized_blocks() {
        let candidates =
            LocaleCandidates::resolve(localized.keys().map(String::as_str), &options.preferences);
        if let Some(value) = candidates.pick_field(localized, "name") {
            name = Some(value);
        }
        if let Some(value) = candidates.pick_field(localized, "description") {
            description = Some(format_description(&value));
        }
        if let Some(value) = candidates.pick_field(localized, "summary") {
            summary = Some(value);
        }
    }

    let icon = match entry.icon.as_deref().filter(|i| !i.is_empty()) {
        Some(icon) => resolve_icon(icon_dir, icon).await,
        None => None,
    };

    let mut app = AppDescriptor::new(entry.package_name, variant.apk_name)
        .with_categories(entry.categories)
        .with_checked(checked);
    app.display_name = name;
    app.summary = summary;
    app.description = description;
    app.icon = icon;
    Ok(Some(app))
}

/// Icon path if the file exists and stays inside the icon directory
async fn resolve_icon(icon_dir: &Path, icon: &str) -> Option<PathBuf> {
    let relative = Path::new(icon);
    if relative
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_)))
    {
        return None;
    }
    let path = icon_dir.join(relative);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Some(path),
        _ => None,
    }
}
