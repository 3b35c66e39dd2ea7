//! `manifest.toml` carried inside an archive

use serde::{Deserialize, Serialize};

/// Where the installer should place the package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallLocation {
    #[default]
    Auto,
    Internal,
    External,
}

impl std::fmt::Display for InstallLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Internal => write!(f, "internal"),
            Self::External => write!(f, "external"),
        }
    }
}

/// The `[package]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSection {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub install_location: InstallLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_size: Option<u64>,
}

/// Whole metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub package: PackageSection,
}

impl ArchiveManifest {
    #[must_use]
    pub fn new(package: PackageSection) -> Self {
        Self { package }
    }

    /// Parse and check the document
    ///
    /// # Errors
    ///
    /// Returns the parser message, or a description of the missing field.
    pub fn from_toml(text: &str) -> Result<Self, String> {
        let manifest: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        if manifest.package.id.trim().is_empty() {
            return Err("package.id must not be empty".to_string());
        }
        if !is_valid_package_id(&manifest.package.id) {
            return Err(format!(
                "package.id {:?} must be a dotted name of letters, digits and underscores",
                manifest.package.id
            ));
        }
        Ok(manifest)
    }

    /// Render as TOML
    ///
    /// # Errors
    ///
    /// Returns the serializer message.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| e.to_string())
    }
}

/// Whether `id` is a dotted package name such as `org.example.app`
///
/// Segments are non-empty runs of `[A-Za-z0-9_]`, so an id never names a
/// parent directory, an absolute path or a nested path.
#[must_use]
pub fn is_valid_package_id(id: &str) -> bool {
    !id.is_empty()
        && id.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
