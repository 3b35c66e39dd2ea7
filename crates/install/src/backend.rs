//! Seams to the system package installer

use async_trait::async_trait;
use firstrun_archive::InstallLocation;
use firstrun_errors::{Error, InstallError};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

/// Kind of install transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Replace the whole package with the session contents
    #[default]
    FullInstall,
}

/// Parameters for a new install session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    pub mode: SessionMode,
    /// Identity recorded as the source of the install
    pub installer_identity: String,
    /// Package id declared by the archive, when it could be read
    pub package_id: Option<String>,
    pub install_location: InstallLocation,
    /// Expected installed size in bytes
    pub size_estimate: u64,
}

impl SessionParams {
    #[must_use]
    pub fn full_install(installer_identity: impl Into<String>) -> Self {
        Self {
            mode: SessionMode::FullInstall,
            installer_identity: installer_identity.into(),
            package_id: None,
            install_location: InstallLocation::Auto,
            size_estimate: 0,
        }
    }
}

/// Result of a commit once the installer finished with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Success { package_id: String },
    Failure { message: String },
}

/// Delivered to the commit target when the installer is done
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStatus {
    pub session_id: String,
    pub outcome: CommitOutcome,
}

/// Where commit results are delivered
pub type CommitSender = mpsc::UnboundedSender<CommitStatus>;

/// System notification that a package finished installing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageAdded {
    pub package_id: String,
}

/// The system package installer
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Create a session and return its id
    async fn create_session(&self, params: SessionParams) -> Result<String, InstallError>;

    /// Open a previously created session
    async fn open_session(&self, session_id: &str) -> Result<Box<dyn InstallSession>, InstallError>;

    /// Drop a created session that was never opened, with any staged files
    async fn abandon_session(&self, session_id: &str);

    /// Subscribe to package-added notifications
    ///
    /// Only notifications sent after this call are received.
    fn subscribe(&self) -> broadcast::Receiver<PackageAdded>;

    /// Whether a package is already installed
    async fn is_installed(&self, package_id: &str) -> bool;
}

/// One open install transaction
#[async_trait]
pub trait InstallSession: Send {
    fn id(&self) -> &str;

    /// Open a write stream for one named file in the session
    async fn open_write(
        &mut self,
        name: &str,
        size_hint: u64,
    ) -> Result<Box<dyn SessionWriter>, InstallError>;

    /// Hand the session to the installer.
    ///
    /// Returns once the request is accepted; the outcome arrives on `target`.
    async fn commit(self: Box<Self>, target: CommitSender) -> Result<(), InstallError>;

    /// Discard the session and everything written into it
    async fn abandon(self: Box<Self>);
}

/// Write stream into a session
#[async_trait]
pub trait SessionWriter: Send {
    async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()>;

    /// Force written bytes to durable storage
    async fn fsync(&mut self) -> std::io::Result<()>;

    async fn close(self: Box<Self>) -> std::io::Result<()>;
}

/// Records which package handles a role such as the default browser
#[async_trait]
pub trait DefaultHandlerRegistry: Send + Sync {
    async fn set_default_handler(&self, role: &str, package_id: &str) -> Result<(), Error>;
}
