//! Installable app descriptor

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// One installable app as surfaced by a repository.
///
/// Identity is the package id alone: two descriptors with the same
/// `package_id` compare equal even if their other fields differ. Use
/// [`AppDescriptor::same_content`] to detect visible changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// Icon file on disk, if the repository ships one
    pub icon: Option<PathBuf>,
    /// Localized display name; absent until one could be resolved
    pub display_name: Option<String>,
    /// Stable package identity
    pub package_id: String,
    /// Archive file name (manifest layout) or absolute path (flat layout)
    pub archive_ref: String,
    /// Categories in manifest order, without duplicates
    pub categories: Vec<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    /// Whether the app is selected for installation
    pub checked: bool,
}

impl AppDescriptor {
    /// Create a descriptor with only its identity and archive set
    pub fn new(package_id: impl Into<String>, archive_ref: impl Into<String>) -> Self {
        Self {
            icon: None,
            display_name: None,
            package_id: package_id.into(),
            archive_ref: archive_ref.into(),
            categories: Vec::new(),
            description: None,
            summary: None,
            checked: false,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: PathBuf) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Set categories, dropping repeated entries while keeping first-seen order
    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.clear();
        for category in categories {
            let category = category.into();
            if !self.categories.contains(&category) {
                self.categories.push(category);
            }
        }
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    /// Check category membership
    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Identity plus the fields a list row renders (`checked`, `display_name`)
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self == other && self.checked == other.checked && self.display_name == other.display_name
    }

    /// Display order: by name, unnamed entries last, ties broken by package id
    #[must_use]
    pub fn display_order(&self, other: &Self) -> Ordering {
        match (&self.display_name, &other.display_name) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| self.package_id.cmp(&other.package_id))
    }
}

impl PartialEq for AppDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.package_id == other.package_id
    }
}

impl Eq for AppDescriptor {}

impl Hash for AppDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.package_id.hash(state);
    }
}
