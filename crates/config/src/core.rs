//! Configuration sections

use crate::constants;
use firstrun_types::{CategoryNames, ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
    /// Directory for debug logs; falls back to the platform state dir
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
            log_dir: None,
        }
    }
}

/// Where the bundled repository lives and how it is laid out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default = "default_repo_path")]
    pub path: PathBuf,
    #[serde(default = "default_manifest")]
    pub manifest: String,
    #[serde(default = "default_icon_density")]
    pub icon_density: String,
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: default_repo_path(),
            manifest: default_manifest(),
            icon_density: default_icon_density(),
            archive_extension: default_archive_extension(),
        }
    }
}

impl RepositoryConfig {
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(&self.manifest)
    }

    #[must_use]
    pub fn icon_dir(&self) -> PathBuf {
        self.path.join(format!("icons-{}", self.icon_density))
    }
}

/// Category names that drive default selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    #[serde(default = "default_category")]
    pub default: String,
    #[serde(default = "default_backend_category")]
    pub backend: String,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            default: default_category(),
            backend: default_backend_category(),
        }
    }
}

impl CategoryConfig {
    #[must_use]
    pub fn names(&self) -> CategoryNames {
        CategoryNames {
            default: self.default.clone(),
            backend: self.backend.clone(),
        }
    }
}

/// Install session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default = "default_installer_identity")]
    pub installer_identity: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Staging root of the filesystem installer
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            installer_identity: default_installer_identity(),
            chunk_size: default_chunk_size(),
            root: None,
        }
    }
}

/// Provisioning wait settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Package designated as default browser once provisioning completes
    #[serde(default = "default_browser")]
    pub default_browser: Option<String>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            default_browser: default_browser(),
        }
    }
}

impl ProvisionConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Locale preferences; empty means use the system locale list
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocaleConfig {
    #[serde(default)]
    pub preferences: Vec<String>,
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_repo_path() -> PathBuf {
    PathBuf::from(constants::DEFAULT_REPO_PATH)
}

fn default_manifest() -> String {
    constants::MANIFEST_FILE.to_string()
}

fn default_icon_density() -> String {
    constants::ICON_DENSITY.to_string()
}

fn default_archive_extension() -> String {
    constants::ARCHIVE_EXTENSION.to_string()
}

fn default_category() -> String {
    constants::DEFAULT_CATEGORY.to_string()
}

fn default_backend_category() -> String {
    constants::BACKEND_CATEGORY.to_string()
}

fn default_installer_identity() -> String {
    constants::INSTALLER_IDENTITY.to_string()
}

fn default_chunk_size() -> usize {
    constants::DEFAULT_CHUNK_SIZE
}

fn default_timeout_secs() -> u64 {
    constants::DEFAULT_TIMEOUT_SECS
}

fn default_poll_interval_secs() -> u64 {
    constants::DEFAULT_POLL_INTERVAL_SECS
}

#[allow(clippy::unnecessary_wraps)]
fn default_browser() -> Option<String> {
    Some(constants::DEFAULT_BROWSER.to_string())
}
