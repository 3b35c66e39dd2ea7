use firstrun_events::{EventEmitter, EventSender};

/// Settings for streaming one archive into an install session
#[derive(Clone, Debug)]
pub struct ArchiveInstallContext {
    /// Identity attributed as the source of the install
    pub installer_identity: String,
    /// Bytes per write into the session
    pub chunk_size: usize,
    /// Correlation id stamped on emitted events
    pub run_id: Option<String>,

    /// Event sender for progress reporting
    pub event_sender: Option<EventSender>,
}

context_builder! {
    ArchiveInstallContext {
        installer_identity: String = "org.fdroid.fdroid.privileged".to_string(),
        chunk_size: usize = 1024 * 1024,
        run_id: Option<String> = None,
    }
}

impl EventEmitter for ArchiveInstallContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }

    fn correlation_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }
}
