//! Filesystem-backed system installer
//!
//! Layout under the root:
//!
//! ```text
//! sessions/<id>/           open sessions and their written files
//! apps/<package-id>/       installed packages, with session.json
//! default-handlers.json    role -> package id
//! ```

use crate::backend::{
    CommitOutcome, CommitSender, CommitStatus, DefaultHandlerRegistry, InstallSession,
    PackageAdded, PackageInstaller, SessionParams, SessionWriter,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firstrun_archive::{inspect_archive, InstallLocation};
use firstrun_errors::{Error, InstallError, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

const SESSIONS_DIR: &str = "sessions";
const APPS_DIR: &str = "apps";
const RECORD_FILE: &str = "session.json";
const DEFAULT_HANDLERS_FILE: &str = "default-handlers.json";
const EVENT_CAPACITY: usize = 256;

/// Record written next to every installed package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    pub package_id: String,
    pub session_id: String,
    pub installer_identity: String,
    pub install_location: InstallLocation,
    pub size_estimate: u64,
    pub files: Vec<String>,
    pub committed_at: DateTime<Utc>,
}

struct Inner {
    root: PathBuf,
    sessions: Mutex<HashMap<String, SessionParams>>,
    handlers: Mutex<()>,
    events: broadcast::Sender<PackageAdded>,
}

impl Inner {
    fn session_dir(&self, id: &str) -> PathBuf {
        self.root.join(SESSIONS_DIR).join(id)
    }

    /// Directory of an installed package; `None` unless the id is a single
    /// plain path component
    fn app_dir(&self, package_id: &str) -> Option<PathBuf> {
        let mut components = Path::new(package_id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == package_id => {
                Some(self.root.join(APPS_DIR).join(name))
            }
            _ => None,
        }
    }
}

/// Installer that stages sessions on disk and installs by directory rename
#[derive(Clone)]
pub struct StagingInstaller {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for StagingInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingInstaller")
            .field("root", &self.inner.root)
            .finish_non_exhaustive()
    }
}

impl StagingInstaller {
    /// Create an installer rooted at `root`, creating its directories
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        for dir in [root.join(SESSIONS_DIR), root.join(APPS_DIR)] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StorageError::from_io_with_path(&e, &dir))?;
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                root,
                sessions: Mutex::new(HashMap::new()),
                handlers: Mutex::new(()),
                events,
            }),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Ids of sessions created but not yet committed or abandoned
    pub async fn open_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Installed package record, if present
    pub async fn installed_record(&self, package_id: &str) -> Option<InstalledRecord> {
        let bytes = tokio::fs::read(self.inner.app_dir(package_id)?.join(RECORD_FILE))
            .await
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Ids of every installed package, sorted
    ///
    /// # Errors
    ///
    /// Returns an error if the apps directory cannot be listed.
    pub async fn installed_packages(&self) -> Result<Vec<String>, Error> {
        let dir = self.inner.root.join(APPS_DIR);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, &dir))?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().join(RECORD_FILE).is_file() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Current role -> package designations
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub async fn default_handlers(&self) -> Result<BTreeMap<String, String>, Error> {
        let path = self.inner.root.join(DEFAULT_HANDLERS_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(Error::io_with_path(&e, path)),
        }
    }
}

#[async_trait]
impl PackageInstaller for StagingInstaller {
    async fn create_session(&self, params: SessionParams) -> Result<String, InstallError> {
        let id = Uuid::new_v4().to_string();
        let dir = self.inner.session_dir(&id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| InstallError::SessionCreateFailed {
                message: format!("{}: {e}", dir.display()),
            })?;
        self.inner.sessions.lock().await.insert(id.clone(), params);
        tracing::debug!(session = %id, "created install session");
        Ok(id)
    }

    async fn open_session(&self, session_id: &str) -> Result<Box<dyn InstallSession>, InstallError> {
        let params = self
            .inner
            .sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| InstallError::UnknownSession {
                session_id: session_id.to_string(),
            })?;
        Ok(Box::new(StagingSession {
            id: session_id.to_string(),
            dir: self.inner.session_dir(session_id),
            params,
            files: Vec::new(),
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn abandon_session(&self, session_id: &str) {
        if self.inner.sessions.lock().await.remove(session_id).is_some() {
            discard(&self.inner.session_dir(session_id)).await;
            tracing::debug!(session = %session_id, "unopened install session abandoned");
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<PackageAdded> {
        self.inner.events.subscribe()
    }

    async fn is_installed(&self, package_id: &str) -> bool {
        let Some(dir) = self.inner.app_dir(package_id) else {
            return false;
        };
        tokio::fs::try_exists(dir.join(RECORD_FILE))
            .await
            .unwrap_or(false)
    }
}

#[async_trait]
impl DefaultHandlerRegistry for StagingInstaller {
    async fn set_default_handler(&self, role: &str, package_id: &str) -> Result<(), Error> {
        let _guard = self.inner.handlers.lock().await;
        let mut handlers = self.default_handlers().await?;
        handlers.insert(role.to_string(), package_id.to_string());

        let path = self.inner.root.join(DEFAULT_HANDLERS_FILE);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&handlers)?)
            .await
            .map_err(|e| Error::io_with_path(&e, &tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::AtomicRenameFailed {
                message: format!("{} -> {}: {e}", tmp.display(), path.display()),
            })?;
        tracing::info!(role, package = package_id, "designated default handler");
        Ok(())
    }
}

struct StagingSession {
    id: String,
    dir: PathBuf,
    params: SessionParams,
    files: Vec<String>,
    inner: Arc<Inner>,
}

#[async_trait]
impl InstallSession for StagingSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn open_write(
        &mut self,
        name: &str,
        _size_hint: u64,
    ) -> Result<Box<dyn SessionWriter>, InstallError> {
        let valid = Path::new(name)
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
        if !valid || name.is_empty() {
            return Err(InstallError::WriteFailed {
                session_id: self.id.clone(),
                path: name.to_string(),
                message: "file name must be a plain relative name".to_string(),
            });
        }
        let path = self.dir.join(name);
        let file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| InstallError::WriteFailed {
                session_id: self.id.clone(),
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        self.files.push(name.to_string());
        Ok(Box::new(StagingWriter { file }))
    }

    async fn commit(self: Box<Self>, target: CommitSender) -> Result<(), InstallError> {
        if self.inner.sessions.lock().await.remove(&self.id).is_none() {
            return Err(InstallError::UnknownSession {
                session_id: self.id.clone(),
            });
        }
        if self.files.is_empty() {
            discard(&self.dir).await;
            return Err(InstallError::CommitFailed {
                session_id: self.id.clone(),
                message: "session has no files".to_string(),
            });
        }

        tracing::debug!(session = %self.id, "install session committed");
        let session = *self;
        tokio::spawn(async move {
            let session_id = session.id.clone();
            let outcome = match finalize(&session).await {
                Ok(package_id) => {
                    let _ = session.inner.events.send(PackageAdded {
                        package_id: package_id.clone(),
                    });
                    CommitOutcome::Success { package_id }
                }
                Err(e) => {
                    tracing::warn!(session = %session_id, error = %e, "install failed");
                    discard(&session.dir).await;
                    CommitOutcome::Failure {
                        message: e.to_string(),
                    }
                }
            };
            let _ = target.send(CommitStatus {
                session_id,
                outcome,
            });
        });
        Ok(())
    }

    async fn abandon(self: Box<Self>) {
        self.inner.sessions.lock().await.remove(&self.id);
        discard(&self.dir).await;
        tracing::debug!(session = %self.id, "install session abandoned");
    }
}

/// Validate the staged archive and move it into place
async fn finalize(session: &StagingSession) -> Result<String, InstallError> {
    let fs_error = |operation: &str, path: &Path, e: std::io::Error| InstallError::FilesystemError {
        operation: operation.to_string(),
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let primary = session.dir.join(&session.files[0]);
    let metadata = inspect_archive(&primary)
        .await
        .map_err(|e| InstallError::CommitFailed {
            session_id: session.id.clone(),
            message: format!("staged archive rejected: {e}"),
        })?;
    let package_id = metadata.package_id().to_string();
    if let Some(declared) = &session.params.package_id {
        if *declared != package_id {
            return Err(InstallError::CommitFailed {
                session_id: session.id.clone(),
                message: format!("session declared {declared} but archive contains {package_id}"),
            });
        }
    }

    let target = session
        .inner
        .app_dir(&package_id)
        .ok_or_else(|| InstallError::CommitFailed {
            session_id: session.id.clone(),
            message: format!("package id {package_id:?} is not a plain name"),
        })?;
    if tokio::fs::try_exists(&target).await.unwrap_or(false) {
        tokio::fs::remove_dir_all(&target)
            .await
            .map_err(|e| fs_error("remove", &target, e))?;
    }
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| fs_error("create_dir", parent, e))?;
    }
    tokio::fs::rename(&session.dir, &target)
        .await
        .map_err(|e| fs_error("rename", &session.dir, e))?;

    let record = InstalledRecord {
        package_id: package_id.clone(),
        session_id: session.id.clone(),
        installer_identity: session.params.installer_identity.clone(),
        install_location: session.params.install_location,
        size_estimate: session.params.size_estimate,
        files: session.files.clone(),
        committed_at: Utc::now(),
    };
    let record_path = target.join(RECORD_FILE);
    let json = serde_json::to_vec_pretty(&record).map_err(|e| InstallError::CommitFailed {
        session_id: session.id.clone(),
        message: e.to_string(),
    })?;
    tokio::fs::write(&record_path, json)
        .await
        .map_err(|e| fs_error("write", &record_path, e))?;

    tracing::info!(package = %package_id, session = %session.id, "package installed");
    Ok(package_id)
}

async fn discard(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to remove session directory");
        }
    }
}

struct StagingWriter {
    file: tokio::fs::File,
}

#[async_trait]
impl SessionWriter for StagingWriter {
    async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.file.write_all(chunk).await
    }

    async fn fsync(&mut self) -> std::io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await
    }

    async fn close(mut self: Box<Self>) -> std::io::Result<()> {
        self.file.shutdown().await
    }
}
