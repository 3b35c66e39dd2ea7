//! Readiness gate shared by every caller waiting on provisioning

use firstrun_types::ReadinessState;
use std::sync::Arc;
use tokio::sync::watch;

/// Opens once and stays open.
///
/// Clones share the same state. Any number of callers may wait, poll or
/// subscribe, before or after the gate opens.
#[derive(Clone, Debug)]
pub struct ReadinessGate {
    state: Arc<watch::Sender<ReadinessState>>,
}

impl ReadinessGate {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(ReadinessState::Pending);
        Self {
            state: Arc::new(state),
        }
    }

    /// Current state without waiting
    #[must_use]
    pub fn state(&self) -> ReadinessState {
        *self.state.borrow()
    }

    /// True once the gate is `Ready` or `Skipped`
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state().is_open()
    }

    /// Open the gate.
    ///
    /// Returns true only for the call that actually opened it. Passing
    /// `Pending` never changes anything.
    pub fn open(&self, state: ReadinessState) -> bool {
        if !state.is_open() {
            return false;
        }
        self.state.send_if_modified(|current| {
            if current.is_open() {
                false
            } else {
                *current = state;
                true
            }
        })
    }

    /// Wait until the gate opens; returns immediately if it already has
    pub async fn wait(&self) -> ReadinessState {
        self.subscribe().ready().await
    }

    /// Register a listener that resolves once the gate is open
    #[must_use]
    pub fn subscribe(&self) -> GateListener {
        GateListener {
            rx: self.state.subscribe(),
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of the gate
#[derive(Debug)]
pub struct GateListener {
    rx: watch::Receiver<ReadinessState>,
}

impl GateListener {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_open()
    }

    /// Resolve with the open state. Consumes the listener so it fires once.
    pub async fn ready(mut self) -> ReadinessState {
        let current = *self.rx.borrow();
        match self.rx.wait_for(|state| state.is_open()).await {
            Ok(state) => *state,
            // The sender lives as long as any gate clone; fall back to the last value
            Err(_) => current,
        }
    }
}
