//! Repository manifest data models
//!
//! The top level is parsed strictly; each app entry is parsed on its own so
//! one malformed entry cannot fail the whole manifest.

use firstrun_errors::{Error, IndexError};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Line-break marker that replaces newlines in descriptions
pub const LINE_BREAK: &str = "<br>";

/// Parsed `index-v1.json`
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryIndex {
    pub apps: Vec<Value>,
    /// Package id to build variants; only the first variant is used
    pub packages: Map<String, Value>,
}

/// One app entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEntry {
    pub package_name: String,
    pub categories: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub localized: Option<Value>,
}

/// One build variant of a package
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApkVariant {
    pub apk_name: String,
}

impl RepositoryIndex {
    /// Parse the manifest document
    ///
    /// # Errors
    ///
    /// Returns `IndexError::ManifestParse` if the document is not JSON or
    /// lacks the `apps`/`packages` members.
    pub fn from_json(json: &str, origin: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| {
            IndexError::ManifestParse {
                path: origin.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Number of app entries, including ones that will not parse
    #[must_use]
    pub fn app_count(&self) -> usize {
        self.apps.len()
    }

    /// First build variant declared for a package
    ///
    /// # Errors
    ///
    /// Returns `IndexError::EntrySkipped` when the package has no usable variant.
    pub fn first_variant(&self, package_id: &str) -> Result<ApkVariant, IndexError> {
        let skipped = |reason: String| IndexError::EntrySkipped {
            entry: package_id.to_string(),
            reason,
        };
        let first = self
            .packages
            .get(package_id)
            .ok_or_else(|| skipped("no packages entry".to_string()))?
            .as_array()
            .ok_or_else(|| skipped("packages entry is not an array".to_string()))?
            .first()
            .ok_or_else(|| skipped("packages entry is empty".to_string()))?;
        ApkVariant::deserialize(first).map_err(|e| skipped(format!("invalid variant: {e}")))
    }
}

impl AppEntry {
    /// Parse one element of the `apps` array
    ///
    /// # Errors
    ///
    /// Returns `IndexError::EntrySkipped` naming the entry (by package name
    /// when one can be read, else by position).
    pub fn from_value(value: &Value, position: usize) -> Result<Self, IndexError> {
        let entry = Self::deserialize(value).map_err(|e| IndexError::EntrySkipped {
            entry: value
                .get("packageName")
                .and_then(Value::as_str)
                .map_or_else(|| format!("apps[{position}]"), ToString::to_string),
            reason: e.to_string(),
        })?;
        if entry.package_name.trim().is_empty() {
            return Err(IndexError::EntrySkipped {
                entry: format!("apps[{position}]"),
                reason: "empty packageName".to_string(),
            });
        }
        Ok(entry)
    }

    /// Localized block as a map; anything but an object counts as absent
    #[must_use]
    pub fn localized_blocks(&self) -> Option<&Map<String, Value>> {
        self.localized.as_ref().and_then(Value::as_object)
    }
}

/// Replace every newline with the line-break marker
#[must_use]
pub fn format_description(text: &str) -> String {
    text.replace('\n', LINE_BREAK)
}
