//! Integration tests for install sessions

use async_trait::async_trait;
use firstrun_errors::{Error, InstallError};
use firstrun_install::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::{broadcast, mpsc};

#[derive(Default)]
struct Journal {
    calls: Mutex<Vec<String>>,
    bytes: Mutex<Vec<u8>>,
}

impl Journal {
    fn push(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

/// Installer that records every call and can fail writes on demand
struct RecordingInstaller {
    journal: Arc<Journal>,
    fail_write_at: Option<usize>,
    fail_open: bool,
    params: Mutex<Vec<SessionParams>>,
    events: broadcast::Sender<PackageAdded>,
}

impl RecordingInstaller {
    fn new(fail_write_at: Option<usize>) -> Self {
        Self {
            journal: Arc::new(Journal::default()),
            fail_write_at,
            fail_open: false,
            params: Mutex::new(Vec::new()),
            events: broadcast::channel(16).0,
        }
    }
}

#[async_trait]
impl PackageInstaller for RecordingInstaller {
    async fn create_session(&self, params: SessionParams) -> Result<String, InstallError> {
        self.journal.push("create");
        self.params.lock().unwrap().push(params);
        Ok("s1".to_string())
    }

    async fn open_session(&self, session_id: &str) -> Result<Box<dyn InstallSession>, InstallError> {
        self.journal.push(format!("open {session_id}"));
        if self.fail_open {
            return Err(InstallError::UnknownSession {
                session_id: session_id.to_string(),
            });
        }
        Ok(Box::new(RecordingSession {
            journal: Arc::clone(&self.journal),
            fail_write_at: self.fail_write_at,
        }))
    }

    async fn abandon_session(&self, session_id: &str) {
        self.journal.push(format!("abandon {session_id}"));
    }

    fn subscribe(&self) -> broadcast::Receiver<PackageAdded> {
        self.events.subscribe()
    }

    async fn is_installed(&self, _package_id: &str) -> bool {
        false
    }
}

struct RecordingSession {
    journal: Arc<Journal>,
    fail_write_at: Option<usize>,
}

#[async_trait]
impl InstallSession for RecordingSession {
    fn id(&self) -> &str {
        "s1"
    }

    async fn open_write(
        &mut self,
        name: &str,
        size_hint: u64,
    ) -> Result<Box<dyn SessionWriter>, InstallError> {
        self.journal.push(format!("open_write {name} {size_hint}"));
        Ok(Box::new(RecordingWriter {
            journal: Arc::clone(&self.journal),
            fail_write_at: self.fail_write_at,
            writes: 0,
        }))
    }

    async fn commit(self: Box<Self>, target: CommitSender) -> Result<(), InstallError> {
        self.journal.push("commit");
        let _ = target.send(CommitStatus {
            session_id: "s1".to_string(),
            outcome: CommitOutcome::Success {
                package_id: "org.example".to_string(),
            },
        });
        Ok(())
    }

    async fn abandon(self: Box<Self>) {
        self.journal.push("abandon");
    }
}

struct RecordingWriter {
    journal: Arc<Journal>,
    fail_write_at: Option<usize>,
    writes: usize,
}

#[async_trait]
impl SessionWriter for RecordingWriter {
    async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        if self.fail_write_at == Some(self.writes) {
            return Err(std::io::Error::other("device full"));
        }
        self.writes += 1;
        self.journal.bytes.lock().unwrap().extend_from_slice(chunk);
        Ok(())
    }

    async fn fsync(&mut self) -> std::io::Result<()> {
        self.journal.push("fsync");
        Ok(())
    }

    async fn close(self: Box<Self>) -> std::io::Result<()> {
        self.journal.push("close");
        Ok(())
    }
}

async fn pack(dir: &Path, id: &str, payload: &[u8]) -> PathBuf {
    let src = dir.join(format!("{id}-src"));
    tokio::fs::create_dir_all(&src).await.unwrap();
    tokio::fs::write(
        src.join("manifest.toml"),
        format!("[package]\nid = \"{id}\"\n"),
    )
    .await
    .unwrap();
    tokio::fs::write(src.join("payload.bin"), payload).await.unwrap();
    let dest = dir.join(format!("{id}.apk"));
    firstrun_archive::create_archive(&src, &dest).await.unwrap();
    dest
}

fn ctx(chunk_size: usize) -> ArchiveInstallContext {
    ArchiveInstallContext::new().with_chunk_size(chunk_size)
}

#[tokio::test]
async fn test_streams_whole_archive_then_commits() {
    let dir = TempDir::new().unwrap();
    let archive = pack(dir.path(), "org.example", &[7u8; 10_000]).await;
    let expected = tokio::fs::read(&archive).await.unwrap();

    let installer = RecordingInstaller::new(None);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let receipt = install_archive(&installer, &archive, &ctx(4096), tx)
        .await
        .unwrap();

    assert_eq!(receipt.bytes_written, expected.len() as u64);
    assert_eq!(receipt.package_id.as_deref(), Some("org.example"));
    assert!(!receipt.metadata_fallback);
    assert_eq!(*installer.journal.bytes.lock().unwrap(), expected);

    let calls = installer.journal.calls();
    assert_eq!(calls.first().map(String::as_str), Some("create"));
    let fsync = calls.iter().position(|c| c == "fsync").unwrap();
    let close = calls.iter().position(|c| c == "close").unwrap();
    let commit = calls.iter().position(|c| c == "commit").unwrap();
    assert!(fsync < close && close < commit);
    assert!(!calls.contains(&"abandon".to_string()));

    let params = installer.params.lock().unwrap();
    assert_eq!(params[0].mode, SessionMode::FullInstall);
    assert_eq!(params[0].installer_identity, "org.fdroid.fdroid.privileged");
    assert_eq!(params[0].size_estimate, 10_000);

    let status = rx.recv().await.unwrap();
    assert_eq!(status.session_id, "s1");
}

#[tokio::test]
async fn test_write_failure_abandons_session() {
    let dir = TempDir::new().unwrap();
    let archive = pack(dir.path(), "org.example", &[1u8; 5000]).await;

    let installer = RecordingInstaller::new(Some(1));
    let (tx, _rx) = mpsc::unbounded_channel();
    let err = install_archive(&installer, &archive, &ctx(1024), tx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Install(InstallError::WriteFailed { .. })
    ));
    let calls = installer.journal.calls();
    assert_eq!(calls.last().map(String::as_str), Some("abandon"));
    assert!(!calls.contains(&"commit".to_string()));
}

#[tokio::test]
async fn test_empty_archive_is_abandoned() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("empty.apk");
    tokio::fs::write(&archive, b"").await.unwrap();

    let installer = RecordingInstaller::new(None);
    let (events_tx, mut events_rx) = firstrun_events::channel();
    let (tx, _rx) = mpsc::unbounded_channel();
    let err = install_archive(
        &installer,
        &archive,
        &ctx(1024).with_event_sender(events_tx),
        tx,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Install(InstallError::EmptyArchive { .. })
    ));
    assert_eq!(installer.journal.calls().last().map(String::as_str), Some("abandon"));

    let mut saw_fallback = false;
    while let Ok(message) = events_rx.try_recv() {
        if matches!(
            message.event,
            firstrun_events::AppEvent::Install(firstrun_events::InstallEvent::MetadataFallback { .. })
        ) {
            saw_fallback = true;
        }
    }
    assert!(saw_fallback);
}

#[tokio::test]
async fn test_unreadable_metadata_uses_file_size() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("raw.apk");
    tokio::fs::write(&archive, vec![3u8; 2048]).await.unwrap();

    let installer = RecordingInstaller::new(None);
    let (tx, _rx) = mpsc::unbounded_channel();
    let receipt = install_archive(&installer, &archive, &ctx(512), tx)
        .await
        .unwrap();

    assert!(receipt.metadata_fallback);
    assert_eq!(receipt.size_estimate, 2048);
    assert_eq!(receipt.package_id, None);
}

#[tokio::test]
async fn test_directory_is_not_installable() {
    let dir = TempDir::new().unwrap();
    let installer = RecordingInstaller::new(None);
    let (tx, _rx) = mpsc::unbounded_channel();
    let err = install_archive(&installer, dir.path(), &ctx(1024), tx)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Install(InstallError::NotAFile { .. })));
    assert!(installer.journal.calls().is_empty());
}

#[tokio::test]
async fn test_staging_installer_installs_and_notifies() {
    let dir = TempDir::new().unwrap();
    let archive = pack(dir.path(), "org.example.notes", &[9u8; 3000]).await;
    let installer = StagingInstaller::new(dir.path().join("root")).await.unwrap();
    let mut added = installer.subscribe();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let receipt = install_archive(&installer, &archive, &ctx(1024), tx)
        .await
        .unwrap();

    let status = rx.recv().await.unwrap();
    assert_eq!(status.session_id, receipt.session_id);
    assert_eq!(
        status.outcome,
        CommitOutcome::Success {
            package_id: "org.example.notes".to_string()
        }
    );
    assert_eq!(added.recv().await.unwrap().package_id, "org.example.notes");

    assert!(installer.is_installed("org.example.notes").await);
    let record = installer.installed_record("org.example.notes").await.unwrap();
    assert_eq!(record.installer_identity, "org.fdroid.fdroid.privileged");
    assert_eq!(record.files, vec!["org.example.notes.apk".to_string()]);
    assert!(installer.open_sessions().await.is_empty());
    assert_eq!(
        installer.installed_packages().await.unwrap(),
        vec!["org.example.notes".to_string()]
    );
}

#[tokio::test]
async fn test_staging_rejects_unreadable_archive_on_commit() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("garbage.apk");
    tokio::fs::write(&archive, vec![0xffu8; 700]).await.unwrap();
    let installer = StagingInstaller::new(dir.path().join("root")).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    install_archive(&installer, &archive, &ctx(1024), tx)
        .await
        .unwrap();

    let status = rx.recv().await.unwrap();
    assert!(matches!(status.outcome, CommitOutcome::Failure { .. }));
    assert!(installer.installed_packages().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_abandon_removes_session_files() {
    let dir = TempDir::new().unwrap();
    let installer = StagingInstaller::new(dir.path()).await.unwrap();
    let id = installer
        .create_session(SessionParams::full_install("test"))
        .await
        .unwrap();
    let mut session = installer.open_session(&id).await.unwrap();
    let mut writer = session.open_write("base.apk", 4).await.unwrap();
    writer.write(b"data").await.unwrap();
    writer.close().await.unwrap();
    session.abandon().await;

    assert!(!dir.path().join("sessions").join(&id).exists());
    assert!(installer.open_sessions().await.is_empty());
    assert!(matches!(
        installer.open_session(&id).await,
        Err(InstallError::UnknownSession { .. })
    ));
}

#[tokio::test]
async fn test_default_handler_designation_persists() {
    let dir = TempDir::new().unwrap();
    let installer = StagingInstaller::new(dir.path()).await.unwrap();
    installer
        .set_default_handler("browser", "org.example.browser")
        .await
        .unwrap();
    installer
        .set_default_handler("browser", "com.duckduckgo.mobile.android")
        .await
        .unwrap();

    let handlers = installer.default_handlers().await.unwrap();
    assert_eq!(
        handlers.get("browser").map(String::as_str),
        Some("com.duckduckgo.mobile.android")
    );
}

#[tokio::test]
async fn test_path_like_package_id_never_leaves_install_root() {
    let dir = TempDir::new().unwrap();
    let victim = dir.path().join("victim");
    tokio::fs::create_dir_all(&victim).await.unwrap();
    tokio::fs::write(victim.join("precious.txt"), b"keep").await.unwrap();

    let src = dir.path().join("hostile-src");
    tokio::fs::create_dir_all(&src).await.unwrap();
    tokio::fs::write(
        src.join("manifest.toml"),
        format!("[package]\nid = {:?}\n", victim.display().to_string()),
    )
    .await
    .unwrap();
    tokio::fs::write(src.join("payload.bin"), [3u8; 600]).await.unwrap();
    let archive = dir.path().join("hostile.apk");
    firstrun_archive::create_archive(&src, &archive).await.unwrap();

    let installer = StagingInstaller::new(dir.path().join("root")).await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    install_archive(&installer, &archive, &ctx(256), tx)
        .await
        .unwrap();

    let status = rx.recv().await.unwrap();
    assert!(matches!(status.outcome, CommitOutcome::Failure { .. }));
    assert!(victim.join("precious.txt").exists());
    assert!(installer.installed_packages().await.unwrap().is_empty());

    for id in ["..", "../victim", "/etc", "a/b", ""] {
        assert!(!installer.is_installed(id).await, "{id}");
        assert!(installer.installed_record(id).await.is_none(), "{id}");
    }
}

#[tokio::test]
async fn test_open_failure_abandons_created_session() {
    let dir = TempDir::new().unwrap();
    let archive = pack(dir.path(), "org.example", &[5u8; 2000]).await;
    let mut installer = RecordingInstaller::new(None);
    installer.fail_open = true;

    let (tx, _rx) = mpsc::unbounded_channel();
    let err = install_archive(&installer, &archive, &ctx(1024), tx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Install(InstallError::UnknownSession { .. })
    ));
    assert_eq!(installer.journal.calls(), vec!["create", "open s1", "abandon s1"]);
}

#[tokio::test]
async fn test_staging_abandon_unopened_session() {
    let dir = TempDir::new().unwrap();
    let installer = StagingInstaller::new(dir.path()).await.unwrap();
    let id = installer
        .create_session(SessionParams::full_install("test"))
        .await
        .unwrap();
    assert!(dir.path().join("sessions").join(&id).is_dir());

    installer.abandon_session(&id).await;

    assert!(!dir.path().join("sessions").join(&id).exists());
    assert!(installer.open_sessions().await.is_empty());
}
