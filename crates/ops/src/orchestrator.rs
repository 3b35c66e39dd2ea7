//! Batch install orchestration
//!
//! A run moves `Idle -> Installing -> Waiting -> Complete`. Installs are
//! issued one archive at a time; a failed archive is recorded and the batch
//! carries on. Package-added notifications are matched against the expected
//! set on a listener task while the run waits for either a full match or
//! the deadline. The deadline is a degraded success: the gate opens either
//! way, and it opens only once.

use crate::gate::ReadinessGate;
use crate::hooks::CompletionHook;
use firstrun_errors::{Error, ProvisionError, UserFacingError};
use firstrun_events::{
    AppEvent, EventEmitter, EventSender, FailureContext, InstallEvent, ProvisionEvent,
};
use firstrun_install::{
    install_archive, ArchiveInstallContext, CommitOutcome, CommitStatus, PackageAdded,
    PackageInstaller,
};
use firstrun_types::{
    ArchiveFailure, BatchRequest, ProvisionOutcome, ProvisionReport, ReadinessState,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Where the orchestrator is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestratorState {
    #[default]
    Idle,
    Installing,
    Waiting,
    Complete,
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Installing => write!(f, "installing"),
            Self::Waiting => write!(f, "waiting"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Timing and install settings for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Total time to wait for expected packages after installs are issued
    pub timeout: Duration,
    /// How often missing packages are re-checked while waiting
    pub poll_interval: Duration,
    pub installer_identity: String,
    pub chunk_size: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        let install = ArchiveInstallContext::default();
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
            installer_identity: install.installer_identity,
            chunk_size: install.chunk_size,
        }
    }
}

#[derive(Debug, Default)]
struct Tracking {
    expected: BTreeSet<String>,
    installed: BTreeSet<String>,
    /// (session id, message) for commits the installer rejected
    commit_failures: Vec<(String, String)>,
}

impl Tracking {
    /// Remaining count if `package_id` was expected and not yet seen
    fn record(&mut self, package_id: &str) -> Option<usize> {
        if self.expected.contains(package_id) && self.installed.insert(package_id.to_string()) {
            Some(self.remaining())
        } else {
            None
        }
    }

    fn remaining(&self) -> usize {
        self.expected.len() - self.installed.len()
    }

    fn is_satisfied(&self) -> bool {
        self.installed.len() == self.expected.len()
    }

    fn missing(&self) -> Vec<String> {
        self.expected.difference(&self.installed).cloned().collect()
    }
}

/// State shared between the waiting run and its listener task
#[derive(Debug)]
struct RunShared {
    tracking: Mutex<Tracking>,
    progress: Notify,
}

impl RunShared {
    fn new(expected: BTreeSet<String>) -> Self {
        Self {
            tracking: Mutex::new(Tracking {
                expected,
                ..Tracking::default()
            }),
            progress: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tracking> {
        self.tracking.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observe(&self, package_id: &str, emitter: &RunEmitter) {
        let (recorded, expected) = {
            let mut tracking = self.lock();
            let expected = tracking.expected.contains(package_id);
            (tracking.record(package_id), expected)
        };
        emitter.emit(AppEvent::Install(InstallEvent::PackageAdded {
            package_id: package_id.to_string(),
            expected,
        }));
        if let Some(remaining) = recorded {
            tracing::debug!(package = package_id, remaining, "expected package installed");
            emitter.emit(AppEvent::Provision(ProvisionEvent::PackageObserved {
                package_id: package_id.to_string(),
                remaining,
            }));
            self.progress.notify_one();
        }
    }

    fn record_commit(&self, status: CommitStatus, emitter: &RunEmitter) {
        match status.outcome {
            CommitOutcome::Success { package_id } => {
                tracing::debug!(session = %status.session_id, package = %package_id, "commit accepted");
            }
            CommitOutcome::Failure { message } => {
                tracing::warn!(session = %status.session_id, %message, "installer rejected session");
                emitter.emit_warning_with_context(
                    format!("installer rejected session {}", status.session_id),
                    message.clone(),
                );
                self.lock()
                    .commit_failures
                    .push((status.session_id, message));
            }
        }
    }

    fn is_satisfied(&self) -> bool {
        self.lock().is_satisfied()
    }

    fn remaining(&self) -> usize {
        self.lock().remaining()
    }

    fn missing(&self) -> Vec<String> {
        self.lock().missing()
    }
}

/// Emits with the run id as correlation id
#[derive(Clone, Debug)]
struct RunEmitter {
    tx: Option<EventSender>,
    run_id: String,
}

impl EventEmitter for RunEmitter {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }

    fn correlation_id(&self) -> Option<&str> {
        Some(&self.run_id)
    }
}

/// Clears the active run slot when a run ends, however it ends
struct ActiveRun<'a> {
    slot: &'a Mutex<Option<Uuid>>,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Drives a batch of installs to a single completion
pub struct InstallOrchestrator {
    installer: Arc<dyn PackageInstaller>,
    gate: ReadinessGate,
    hooks: Vec<Arc<dyn CompletionHook>>,
    settings: OrchestratorSettings,
    event_sender: Option<EventSender>,
    state: Mutex<OrchestratorState>,
    active: Mutex<Option<Uuid>>,
}

impl std::fmt::Debug for InstallOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallOrchestrator")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl InstallOrchestrator {
    #[must_use]
    pub fn new(
        installer: Arc<dyn PackageInstaller>,
        gate: ReadinessGate,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            installer,
            gate,
            hooks: Vec::new(),
            settings,
            event_sender: None,
            state: Mutex::new(OrchestratorState::Idle),
            active: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn CompletionHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.event_sender = Some(tx);
        self
    }

    #[must_use]
    pub fn state(&self) -> OrchestratorState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    #[must_use]
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Install a batch and wait for its expected packages.
    ///
    /// Returns once the run is complete: every expected package was
    /// observed, nothing was expected, the gate was already open, or the
    /// deadline passed. Individual archive failures are reported, not
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::AlreadyRunning` if another run is in flight.
    pub async fn run(&self, request: BatchRequest) -> Result<ProvisionReport, Error> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let _active = self.claim(run_id)?;
        let emitter = RunEmitter {
            tx: self.event_sender.clone(),
            run_id: run_id.to_string(),
        };
        let expected: Vec<String> = request.expected.iter().cloned().collect();

        if self.gate.is_ready() {
            tracing::info!(run = %run_id, "provisioning already complete, nothing to do");
            emitter.emit(AppEvent::Provision(ProvisionEvent::Completed {
                run_id,
                outcome: ProvisionOutcome::AlreadyComplete,
            }));
            return Ok(ProvisionReport {
                run_id,
                outcome: ProvisionOutcome::AlreadyComplete,
                issued: Vec::new(),
                failed: Vec::new(),
                expected,
                observed: Vec::new(),
                duration: started.elapsed(),
            });
        }

        self.set_state(OrchestratorState::Installing, run_id, &emitter);
        emitter.emit(AppEvent::Provision(ProvisionEvent::Started {
            run_id,
            archives: request.archives.len(),
            expected: expected.clone(),
        }));

        // Subscribe before the first install so no notification is missed
        let shared = Arc::new(RunShared::new(request.expected.clone()));
        let (commit_tx, commit_rx) = mpsc::unbounded_channel();
        let listener = tokio::spawn(listen(
            self.installer.subscribe(),
            commit_rx,
            Arc::clone(&shared),
            emitter.clone(),
        ));

        let (issued, mut failed, sessions) = self
            .issue_installs(&request, run_id, &emitter, commit_tx)
            .await;

        let outcome = if request.expected.is_empty() {
            ProvisionOutcome::NothingExpected
        } else {
            self.check_installed(&shared, &emitter).await;
            if shared.is_satisfied() {
                ProvisionOutcome::AllInstalled
            } else {
                self.wait(run_id, &shared, &emitter).await
            }
        };
        let outcome = self.complete(run_id, outcome, &emitter).await;
        listener.abort();

        let tracking = std::mem::take(&mut *shared.lock());
        for (session_id, message) in tracking.commit_failures {
            failed.push(ArchiveFailure {
                archive: sessions.get(&session_id).cloned().unwrap_or(session_id),
                message,
                code: Some("install.commit_failed".to_string()),
            });
        }

        Ok(ProvisionReport {
            run_id,
            outcome,
            issued,
            failed,
            expected,
            observed: tracking.installed.into_iter().collect(),
            duration: started.elapsed(),
        })
    }

    fn claim(&self, run_id: Uuid) -> Result<ActiveRun<'_>, ProvisionError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = *active {
            return Err(ProvisionError::AlreadyRunning {
                run_id: current.to_string(),
            });
        }
        *active = Some(run_id);
        Ok(ActiveRun { slot: &self.active })
    }

    fn set_state(&self, state: OrchestratorState, run_id: Uuid, emitter: &RunEmitter) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
        tracing::debug!(run = %run_id, %state, "orchestrator state changed");
        emitter.emit(AppEvent::Provision(ProvisionEvent::StateChanged {
            run_id,
            state: state.to_string(),
        }));
    }

    /// Install every archive in order; returns issued archives, failures
    /// and a session id to archive map
    async fn issue_installs(
        &self,
        request: &BatchRequest,
        run_id: Uuid,
        emitter: &RunEmitter,
        commit_tx: mpsc::UnboundedSender<CommitStatus>,
    ) -> (Vec<String>, Vec<ArchiveFailure>, HashMap<String, String>) {
        let ctx = ArchiveInstallContext::new()
            .with_installer_identity(self.settings.installer_identity.clone())
            .with_chunk_size(self.settings.chunk_size)
            .with_run_id(Some(run_id.to_string()))
            .with_optional_sender(self.event_sender.clone());

        let mut issued = Vec::new();
        let mut failed = Vec::new();
        let mut sessions = HashMap::new();
        for archive in request.archives.resolve() {
            let name = archive.display().to_string();
            match install_archive(self.installer.as_ref(), &archive, &ctx, commit_tx.clone()).await
            {
                Ok(receipt) => {
                    sessions.insert(receipt.session_id, name.clone());
                    issued.push(name);
                }
                Err(err) => {
                    tracing::warn!(archive = %name, error = %err, "install failed, continuing with batch");
                    emitter.emit_warning_with_context(
                        format!("failed to install {name}"),
                        err.user_message().into_owned(),
                    );
                    failed.push(ArchiveFailure {
                        archive: name,
                        message: err.user_message().into_owned(),
                        code: err.user_code().map(str::to_string),
                    });
                }
            }
        }
        (issued, failed, sessions)
    }

    /// Ask the installer about expected packages not yet observed
    async fn check_installed(&self, shared: &RunShared, emitter: &RunEmitter) {
        for package_id in shared.missing() {
            if self.installer.is_installed(&package_id).await {
                shared.observe(&package_id, emitter);
            }
        }
    }

    async fn wait(&self, run_id: Uuid, shared: &RunShared, emitter: &RunEmitter) -> ProvisionOutcome {
        self.set_state(OrchestratorState::Waiting, run_id, emitter);
        emitter.emit(AppEvent::Provision(ProvisionEvent::WaitingStarted {
            run_id,
            timeout_secs: self.settings.timeout.as_secs(),
        }));

        let started = Instant::now();
        let poll = self.settings.poll_interval.max(MIN_POLL_INTERVAL);
        let mut ticker = tokio::time::interval_at(started + poll, poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = tokio::time::sleep_until(started + self.settings.timeout);
        tokio::pin!(deadline);

        loop {
            if shared.is_satisfied() {
                return ProvisionOutcome::AllInstalled;
            }
            tokio::select! {
                () = shared.progress.notified() => {}
                _ = ticker.tick() => {
                    emitter.emit(AppEvent::Provision(ProvisionEvent::WaitTick {
                        remaining: shared.remaining(),
                        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    }));
                    self.check_installed(shared, emitter).await;
                }
                () = &mut deadline => {
                    if shared.is_satisfied() {
                        return ProvisionOutcome::AllInstalled;
                    }
                    let missing = shared.missing();
                    tracing::warn!(
                        run = %run_id,
                        missing = ?missing,
                        "timed out waiting for packages, continuing anyway"
                    );
                    emitter.emit(AppEvent::Provision(ProvisionEvent::TimedOut {
                        run_id,
                        missing: missing.clone(),
                    }));
                    return ProvisionOutcome::TimedOut { missing };
                }
            }
        }
    }

    /// Enter `Complete`. The gate, the readiness event and the hooks only
    /// fire for the call that actually opens the gate.
    async fn complete(
        &self,
        run_id: Uuid,
        outcome: ProvisionOutcome,
        emitter: &RunEmitter,
    ) -> ProvisionOutcome {
        self.set_state(OrchestratorState::Complete, run_id, emitter);

        let opened = self.gate.open(ReadinessState::Ready);
        if opened {
            emitter.emit(AppEvent::Provision(ProvisionEvent::ReadinessChanged {
                state: ReadinessState::Ready,
            }));
        } else {
            tracing::debug!(run = %run_id, "readiness gate was already open");
        }

        tracing::info!(run = %run_id, outcome = ?outcome, "provisioning complete");
        emitter.emit(AppEvent::Provision(ProvisionEvent::Completed {
            run_id,
            outcome: outcome.clone(),
        }));

        if opened {
            self.run_hooks(&outcome, emitter).await;
        }
        outcome
    }

    async fn run_hooks(&self, outcome: &ProvisionOutcome, emitter: &RunEmitter) {
        for hook in &self.hooks {
            let name = hook.name().to_string();
            match hook.on_complete(outcome).await {
                Ok(()) => {
                    emitter.emit(AppEvent::Provision(ProvisionEvent::HookCompleted { hook: name }));
                }
                Err(err) => {
                    tracing::warn!(hook = %name, error = %err, "completion hook failed");
                    emitter.emit(AppEvent::Provision(ProvisionEvent::HookFailed {
                        hook: name,
                        failure: FailureContext::from_error(&err),
                    }));
                }
            }
        }
    }
}

/// Feed package-added notifications and commit results into the run
async fn listen(
    mut added: broadcast::Receiver<PackageAdded>,
    mut commits: mpsc::UnboundedReceiver<CommitStatus>,
    shared: Arc<RunShared>,
    emitter: RunEmitter,
) {
    let mut commits_open = true;
    loop {
        tokio::select! {
            received = added.recv() => match received {
                Ok(PackageAdded { package_id }) => shared.observe(&package_id, &emitter),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Wake the waiter so it asks the installer directly
                    tracing::warn!(skipped, "missed package notifications");
                    shared.progress.notify_one();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            status = commits.recv(), if commits_open => match status {
                Some(status) => shared.record_commit(status, &emitter),
                None => commits_open = false,
            },
        }
    }
}
