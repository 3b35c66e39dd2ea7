//! Fixed names and defaults used across the provisioning tool
//!
//! Values here are the defaults for the TOML sections; the ones without a
//! config key are not meant to be changed per device.

/// Location of the bundled app repository on a product image
pub const DEFAULT_REPO_PATH: &str = "/product/fdroid/repo";

pub const MANIFEST_FILE: &str = "index-v1.json";

/// Density suffix of the icon directory (`icons-<density>`)
pub const ICON_DENSITY: &str = "640";

pub const ARCHIVE_EXTENSION: &str = "apk";

pub const DEFAULT_CATEGORY: &str = "Default";
pub const BACKEND_CATEGORY: &str = "DefaultBackend";

/// Identity recorded as the installer of every provisioned package
pub const INSTALLER_IDENTITY: &str = "org.fdroid.fdroid.privileged";

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
pub const MIN_CHUNK_SIZE: usize = 64 * 1024;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

pub const DEFAULT_BROWSER: &str = "com.duckduckgo.mobile.android";

/// Archive-internal metadata file
pub const ARCHIVE_METADATA_FILE: &str = "manifest.toml";

/// File recording default-handler designations under the install root
pub const DEFAULT_HANDLERS_FILE: &str = "default-handlers.json";
