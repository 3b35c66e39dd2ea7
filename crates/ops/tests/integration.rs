//! Integration tests for provisioning operations

use async_trait::async_trait;
use firstrun_config::Config;
use firstrun_errors::{Error, InstallError, ProvisionError};
use firstrun_events::{AppEvent, EventReceiver, ProvisionEvent};
use firstrun_install::{
    CommitOutcome, CommitSender, CommitStatus, DefaultHandlerRegistry, InstallSession,
    PackageAdded, PackageInstaller, SessionParams, SessionWriter, StagingInstaller,
};
use firstrun_ops::*;
use firstrun_types::{ArchiveRefs, BatchRequest, ProvisionOutcome, ReadinessState};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Installer that reports package-added for committed sessions unless the
/// package is listed as silent
struct FakeInstaller {
    events: broadcast::Sender<PackageAdded>,
    silent: BTreeSet<String>,
    repeat: usize,
    installed: Arc<Mutex<BTreeSet<String>>>,
    params: Mutex<HashMap<String, SessionParams>>,
    sessions: AtomicUsize,
}

impl FakeInstaller {
    fn new(silent: &[&str], repeat: usize) -> Self {
        Self {
            events: broadcast::channel(64).0,
            silent: silent.iter().map(ToString::to_string).collect(),
            repeat,
            installed: Arc::new(Mutex::new(BTreeSet::new())),
            params: Mutex::new(HashMap::new()),
            sessions: AtomicUsize::new(0),
        }
    }

    fn announce(&self, package_id: &str) {
        let _ = self.events.send(PackageAdded {
            package_id: package_id.to_string(),
        });
    }
}

#[async_trait]
impl PackageInstaller for FakeInstaller {
    async fn create_session(&self, params: SessionParams) -> Result<String, InstallError> {
        let id = format!("s{}", self.sessions.fetch_add(1, Ordering::SeqCst));
        self.params.lock().unwrap().insert(id.clone(), params);
        Ok(id)
    }

    async fn open_session(&self, session_id: &str) -> Result<Box<dyn InstallSession>, InstallError> {
        let params = self.params.lock().unwrap().get(session_id).cloned().ok_or_else(|| {
            InstallError::UnknownSession {
                session_id: session_id.to_string(),
            }
        })?;
        let package_id = params.package_id.unwrap_or_default();
        let report = !self.silent.contains(&package_id);
        Ok(Box::new(FakeSession {
            id: session_id.to_string(),
            package_id,
            report,
            repeat: self.repeat,
            events: self.events.clone(),
            installed: Arc::clone(&self.installed),
        }))
    }

    async fn abandon_session(&self, session_id: &str) {
        self.params.lock().unwrap().remove(session_id);
    }

    fn subscribe(&self) -> broadcast::Receiver<PackageAdded> {
        self.events.subscribe()
    }

    async fn is_installed(&self, package_id: &str) -> bool {
        self.installed.lock().unwrap().contains(package_id)
    }
}

struct FakeSession {
    id: String,
    package_id: String,
    report: bool,
    repeat: usize,
    events: broadcast::Sender<PackageAdded>,
    installed: Arc<Mutex<BTreeSet<String>>>,
}

#[async_trait]
impl InstallSession for FakeSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn open_write(
        &mut self,
        _name: &str,
        _size_hint: u64,
    ) -> Result<Box<dyn SessionWriter>, InstallError> {
        Ok(Box::new(NullWriter))
    }

    async fn commit(self: Box<Self>, target: CommitSender) -> Result<(), InstallError> {
        let _ = target.send(CommitStatus {
            session_id: self.id.clone(),
            outcome: CommitOutcome::Success {
                package_id: self.package_id.clone(),
            },
        });
        if self.report {
            self.installed.lock().unwrap().insert(self.package_id.clone());
            for _ in 0..self.repeat {
                let _ = self.events.send(PackageAdded {
                    package_id: self.package_id.clone(),
                });
            }
        }
        Ok(())
    }

    async fn abandon(self: Box<Self>) {}
}

struct NullWriter;

#[async_trait]
impl SessionWriter for NullWriter {
    async fn write(&mut self, _chunk: &[u8]) -> std::io::Result<()> {
        Ok(())
    }

    async fn fsync(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> std::io::Result<()> {
        Ok(())
    }
}

/// Registry that counts designations
#[derive(Default)]
struct CountingRegistry {
    calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl DefaultHandlerRegistry for CountingRegistry {
    async fn set_default_handler(&self, role: &str, package_id: &str) -> Result<(), Error> {
        self.calls
            .lock()
            .unwrap()
            .push((role.to_string(), package_id.to_string()));
        Ok(())
    }
}

async fn pack(dir: &Path, id: &str, categories: &[&str]) -> PathBuf {
    let src = dir.join(format!("{id}-src"));
    tokio::fs::create_dir_all(&src).await.unwrap();
    let categories = categories
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    tokio::fs::write(
        src.join("manifest.toml"),
        format!("[package]\nid = \"{id}\"\nlabel = \"{id}\"\ncategories = [{categories}]\n"),
    )
    .await
    .unwrap();
    tokio::fs::write(src.join("classes.dex"), id.as_bytes()).await.unwrap();
    let dest = dir.join("repo").join(format!("{id}.apk"));
    firstrun_archive::create_archive(&src, &dest).await.unwrap();
    dest
}

fn config(repo: &Path) -> Config {
    let mut config = Config::default();
    config.repository.path = repo.to_path_buf();
    config.locale.preferences = vec!["en-US".to_string()];
    config
}

fn context(
    repo: &Path,
    installer: Arc<dyn PackageInstaller>,
    registry: Option<Arc<CountingRegistry>>,
) -> (OpsCtx, EventReceiver) {
    let (tx, rx) = firstrun_events::channel();
    let mut builder = OpsContextBuilder::new()
        .with_config(config(repo))
        .with_installer(installer)
        .with_event_sender(tx);
    if let Some(registry) = registry {
        builder = builder.with_hook(Arc::new(DefaultHandlerHook::browser(
            registry,
            "com.duckduckgo.mobile.android",
        )));
    }
    (builder.build().unwrap(), rx)
}

fn provision_events(rx: &mut EventReceiver) -> Vec<ProvisionEvent> {
    let mut events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let AppEvent::Provision(event) = message.event {
            events.push(event);
        }
    }
    events
}

fn count_completed(events: &[ProvisionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, ProvisionEvent::Completed { .. }))
        .count()
}

#[tokio::test]
async fn test_empty_expected_completes_without_waiting() {
    let dir = TempDir::new().unwrap();
    let archive = pack(dir.path(), "org.example.a", &["Default"]).await;
    let installer = Arc::new(FakeInstaller::new(&[], 1));
    let registry = Arc::new(CountingRegistry::default());
    let (ctx, mut rx) = context(dir.path(), installer.clone(), Some(registry.clone()));

    let request = BatchRequest::new(
        ArchiveRefs::Absolute {
            paths: vec![archive],
        },
        Vec::<String>::new(),
    );
    let report = provision(&ctx, request).await.unwrap();

    assert_eq!(report.outcome, ProvisionOutcome::NothingExpected);
    assert_eq!(report.issued.len(), 1);
    assert_eq!(ctx.gate.state(), ReadinessState::Ready);
    assert_eq!(ctx.orchestrator.state(), OrchestratorState::Complete);
    assert_eq!(registry.calls.lock().unwrap().len(), 1);

    let events = provision_events(&mut rx);
    assert!(!events
        .iter()
        .any(|e| matches!(e, ProvisionEvent::WaitingStarted { .. })));
    assert_eq!(count_completed(&events), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_still_opens_gate_once() {
    let dir = TempDir::new().unwrap();
    let a = pack(dir.path(), "a", &["Default"]).await;
    let b = pack(dir.path(), "b", &["Default"]).await;
    let installer = Arc::new(FakeInstaller::new(&["b"], 1));
    let registry = Arc::new(CountingRegistry::default());
    let (ctx, mut rx) = context(dir.path(), installer.clone(), Some(registry.clone()));
    let listener = ctx.gate.subscribe();

    let request = BatchRequest::new(ArchiveRefs::Absolute { paths: vec![a, b] }, ["a", "b"]);
    let report = provision(&ctx, request).await.unwrap();

    assert_eq!(
        report.outcome,
        ProvisionOutcome::TimedOut {
            missing: vec!["b".to_string()]
        }
    );
    assert_eq!(report.observed, vec!["a".to_string()]);
    assert!(report.duration >= Duration::from_secs(60));
    assert_eq!(listener.ready().await, ReadinessState::Ready);
    assert_eq!(registry.calls.lock().unwrap().len(), 1);

    // A late notification after completion changes nothing
    installer.announce("b");
    tokio::task::yield_now().await;

    let events = provision_events(&mut rx);
    assert_eq!(count_completed(&events), 1);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ProvisionEvent::TimedOut { .. }))
            .count(),
        1
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, ProvisionEvent::WaitTick { .. })));
}

#[tokio::test]
async fn test_duplicate_notifications_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let a = pack(dir.path(), "a", &["Default"]).await;
    let installer = Arc::new(FakeInstaller::new(&[], 3));
    let (ctx, mut rx) = context(dir.path(), installer.clone(), None);

    let request = BatchRequest::new(ArchiveRefs::Absolute { paths: vec![a] }, ["a"]);
    let report = provision(&ctx, request).await.unwrap();
    installer.announce("a");
    tokio::task::yield_now().await;

    assert_eq!(report.outcome, ProvisionOutcome::AllInstalled);
    assert_eq!(report.observed.len(), 1);

    let events = provision_events(&mut rx);
    assert_eq!(count_completed(&events), 1);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ProvisionEvent::PackageObserved { .. }))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_failed_archive_does_not_stop_batch() {
    let dir = TempDir::new().unwrap();
    let good = pack(dir.path(), "good", &["Default"]).await;
    let missing = dir.path().join("repo").join("missing.apk");
    let installer = Arc::new(FakeInstaller::new(&[], 1));
    let (ctx, _rx) = context(dir.path(), installer, None);

    let request = BatchRequest::new(
        ArchiveRefs::Absolute {
            paths: vec![missing, good],
        },
        ["good"],
    );
    let report = provision(&ctx, request).await.unwrap();

    assert_eq!(report.outcome, ProvisionOutcome::AllInstalled);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].code.as_deref(), Some("install.not_a_file"));
    assert_eq!(report.issued.len(), 1);
}

#[tokio::test]
async fn test_second_run_reports_already_complete() {
    let dir = TempDir::new().unwrap();
    let installer = Arc::new(FakeInstaller::new(&[], 1));
    let registry = Arc::new(CountingRegistry::default());
    let (ctx, _rx) = context(dir.path(), installer, Some(registry.clone()));

    let first = provision(&ctx, BatchRequest::default()).await.unwrap();
    let second = provision(&ctx, BatchRequest::new(ArchiveRefs::default(), ["x"]))
        .await
        .unwrap();

    assert_eq!(first.outcome, ProvisionOutcome::NothingExpected);
    assert_eq!(second.outcome, ProvisionOutcome::AlreadyComplete);
    assert_eq!(registry.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let dir = TempDir::new().unwrap();
    let a = pack(dir.path(), "a", &["Default"]).await;
    let installer = Arc::new(FakeInstaller::new(&["a"], 1));
    let (ctx, _rx) = context(dir.path(), installer, None);
    let ctx = Arc::new(ctx);

    let running = {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            provision(&ctx, BatchRequest::new(ArchiveRefs::Absolute { paths: vec![a] }, ["a"]))
                .await
        })
    };
    while ctx.orchestrator.state() != OrchestratorState::Waiting {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let err = provision(&ctx, BatchRequest::default()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Provision(ProvisionError::AlreadyRunning { .. })
    ));
    running.abort();
}

#[tokio::test]
async fn test_provision_repository_end_to_end() {
    let dir = TempDir::new().unwrap();
    pack(dir.path(), "org.example.maps", &["Default"]).await;
    pack(dir.path(), "org.example.extra", &["Games"]).await;
    pack(dir.path(), "org.example.location", &["DefaultBackend"]).await;
    let repo = dir.path().join("repo");

    let installer = Arc::new(StagingInstaller::new(dir.path().join("root")).await.unwrap());
    let (tx, _rx) = firstrun_events::channel();
    let ctx = OpsContextBuilder::new()
        .with_config(config(&repo))
        .with_installer(installer.clone())
        .with_hook(Arc::new(DefaultHandlerHook::browser(
            installer.clone(),
            "com.duckduckgo.mobile.android",
        )))
        .with_event_sender(tx)
        .build()
        .unwrap();

    assert!(should_wait_for_provisioning(&ctx).await);
    let report = provision_repository(&ctx, None, &[]).await.unwrap();

    assert_eq!(report.outcome, ProvisionOutcome::AllInstalled);
    assert_eq!(report.expected, vec!["org.example.maps".to_string()]);
    assert!(installer.is_installed("org.example.maps").await);
    assert!(!installer.is_installed("org.example.extra").await);
    assert!(!installer.is_installed("org.example.location").await);
    assert_eq!(wait_until_ready(&ctx).await, ReadinessState::Ready);
    assert!(!should_wait_for_provisioning(&ctx).await);

    let handlers = installer.default_handlers().await.unwrap();
    assert_eq!(
        handlers.get(BROWSER_ROLE).map(String::as_str),
        Some("com.duckduckgo.mobile.android")
    );
}

#[tokio::test]
async fn test_only_installs_listed_packages() {
    let dir = TempDir::new().unwrap();
    pack(dir.path(), "org.example.maps", &["Default"]).await;
    pack(dir.path(), "org.example.notes", &["Default"]).await;
    let repo = dir.path().join("repo");

    let installer = Arc::new(StagingInstaller::new(dir.path().join("root")).await.unwrap());
    let (ctx, _rx) = context(&repo, installer.clone(), None);

    let report = provision_repository(&ctx, None, &["org.example.notes".to_string()])
        .await
        .unwrap();

    assert_eq!(report.expected, vec!["org.example.notes".to_string()]);
    assert_eq!(report.outcome, ProvisionOutcome::AllInstalled);
    assert!(!installer.is_installed("org.example.maps").await);
}

#[tokio::test]
async fn test_missing_repository_skips_provisioning() {
    let dir = TempDir::new().unwrap();
    let installer = Arc::new(FakeInstaller::new(&[], 1));
    let (ctx, mut rx) = context(&dir.path().join("absent"), installer, None);

    assert!(!should_wait_for_provisioning(&ctx).await);
    let status = verify_repository(&ctx).await;
    assert!(!status.usable);
    assert!(status.problem.is_some());

    let report = provision_repository(&ctx, None, &[]).await.unwrap();
    assert_eq!(report.outcome, ProvisionOutcome::NothingExpected);
    assert_eq!(ctx.gate.state(), ReadinessState::Skipped);
    assert!(provision_events(&mut rx).iter().any(|e| matches!(
        e,
        ProvisionEvent::ReadinessChanged {
            state: ReadinessState::Skipped
        }
    )));
}

#[tokio::test]
async fn test_list_apps_from_manifest_repository() {
    let dir = TempDir::new().unwrap();
    let repo = dir.path();
    let manifest = serde_json::json!({
        "apps": [
            {"packageName": "org.example.browser", "name": "Browser", "categories": ["Default"]},
            {"packageName": "org.example.backend", "name": "Backend", "categories": ["DefaultBackend"]},
            {"packageName": "org.example.game", "name": "Game", "categories": ["Games"]}
        ],
        "packages": {
            "org.example.browser": [{"apkName": "browser.apk"}],
            "org.example.backend": [{"apkName": "backend.apk"}],
            "org.example.game": [{"apkName": "game.apk"}]
        }
    });
    tokio::fs::write(repo.join("index-v1.json"), manifest.to_string())
        .await
        .unwrap();
    let installer = Arc::new(FakeInstaller::new(&[], 1));
    let (ctx, _rx) = context(repo, installer, None);

    let listing = list_apps(&ctx, None).await.unwrap();
    assert_eq!(listing.layout, "manifest");
    let ids: Vec<_> = listing.apps.iter().map(|a| a.package_id.as_str()).collect();
    assert_eq!(ids, vec!["org.example.browser", "org.example.game"]);
    assert_eq!(listing.checked().count(), 1);

    let backend = list_apps(&ctx, Some("DefaultBackend")).await.unwrap();
    assert_eq!(backend.apps.len(), 1);
    assert!(backend.apps[0].checked);

    let mut selection = firstrun_selection::SelectionModel::new();
    selection.insert_all(listing.apps);
    let request = batch_from_selection(repo, &selection);
    assert_eq!(
        request.archives,
        ArchiveRefs::Relative {
            base: repo.to_path_buf(),
            names: vec!["browser.apk".to_string()]
        }
    );
}

#[test]
fn test_missing_component() {
    let err = OpsContextBuilder::new().build().unwrap_err();
    assert!(matches!(
        err,
        Error::Provision(ProvisionError::MissingComponent { .. })
    ));
}
