#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for firstrun
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/firstrun/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;
pub mod core;

pub use core::{
    CategoryConfig, GeneralConfig, InstallConfig, LocaleConfig, ProvisionConfig, RepositoryConfig,
};

use firstrun_errors::{ConfigError, Error};
use firstrun_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub categories: CategoryConfig,

    #[serde(default)]
    pub install: InstallConfig,

    #[serde(default)]
    pub provision: ProvisionConfig,

    #[serde(default)]
    pub locale: LocaleConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("firstrun").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Write configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub async fn save_to_file(&self, path: &Path) -> Result<(), Error> {
        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            error: e.to_string(),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError {
                    path: parent.display().to_string(),
                    error: e.to_string(),
                })?;
        }

        fs::write(path, contents)
            .await
            .map_err(|e| ConfigError::WriteError {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // FIRSTRUN_REPO
        if let Ok(repo) = std::env::var("FIRSTRUN_REPO") {
            self.repository.path = PathBuf::from(repo);
        }

        // FIRSTRUN_INSTALL_ROOT
        if let Ok(root) = std::env::var("FIRSTRUN_INSTALL_ROOT") {
            self.install.root = Some(PathBuf::from(root));
        }

        // FIRSTRUN_TIMEOUT
        if let Ok(timeout) = std::env::var("FIRSTRUN_TIMEOUT") {
            self.provision.timeout_secs =
                timeout.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "FIRSTRUN_TIMEOUT".to_string(),
                    value: timeout,
                })?;
        }

        // FIRSTRUN_LOCALES, comma separated
        if let Ok(locales) = std::env::var("FIRSTRUN_LOCALES") {
            self.locale.preferences = locales
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(ToString::to_string)
                .collect();
        }

        // FIRSTRUN_OUTPUT
        if let Ok(output) = std::env::var("FIRSTRUN_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "FIRSTRUN_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        // FIRSTRUN_COLOR
        if let Ok(color) = std::env::var("FIRSTRUN_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "FIRSTRUN_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        Ok(())
    }

    /// Reject values the provisioning pipeline cannot work with
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |field: &str, value: String| -> Result<(), Error> {
            Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value,
            }
            .into())
        };

        if self.install.chunk_size < constants::MIN_CHUNK_SIZE {
            return invalid("install.chunk_size", self.install.chunk_size.to_string());
        }
        if self.install.installer_identity.trim().is_empty() {
            return invalid("install.installer_identity", String::new());
        }
        if self.provision.timeout_secs == 0 {
            return invalid("provision.timeout_secs", "0".to_string());
        }
        if self.provision.poll_interval_secs == 0
            || self.provision.poll_interval_secs > self.provision.timeout_secs
        {
            return invalid(
                "provision.poll_interval_secs",
                self.provision.poll_interval_secs.to_string(),
            );
        }
        if self.repository.manifest.trim().is_empty() {
            return invalid("repository.manifest", self.repository.manifest.clone());
        }
        if self.categories.default == self.categories.backend {
            return invalid("categories.backend", self.categories.backend.clone());
        }
        Ok(())
    }

    /// Staging root of the filesystem installer (with default)
    #[must_use]
    pub fn install_root(&self) -> PathBuf {
        self.install.root.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("firstrun")
                .join("install")
        })
    }

    /// Directory for debug logs (with default)
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.general.log_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(dirs::data_local_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join("firstrun")
                .join("logs")
        })
    }
}
