//! Single-writer ownership of a [`SelectionModel`]
//!
//! The model lives on one task. Parsers and UI code hold cloneable
//! [`SelectionPoster`]s and post commands; changes flow back on one
//! channel in the order they were applied.

use crate::{SelectionChange, SelectionModel};
use firstrun_errors::Error;
use firstrun_types::AppDescriptor;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Commands applied by the owning task
#[derive(Debug)]
pub enum SelectionCommand {
    Insert(AppDescriptor),
    Remove { package_id: String },
    SetChecked { package_id: String, checked: bool },
    SetAllChecked(bool),
    Snapshot {
        respond_to: oneshot::Sender<Vec<AppDescriptor>>,
    },
    SelectedArchiveRefs {
        respond_to: oneshot::Sender<Vec<String>>,
    },
}

/// Cloneable handle for posting commands to the owner
#[derive(Debug, Clone)]
pub struct SelectionPoster {
    tx: mpsc::UnboundedSender<SelectionCommand>,
}

impl SelectionPoster {
    fn post(&self, command: SelectionCommand) -> Result<(), Error> {
        self.tx
            .send(command)
            .map_err(|_| Error::internal("selection owner has stopped"))
    }

    /// # Errors
    ///
    /// Fails only if the owning task has stopped.
    pub fn insert(&self, item: AppDescriptor) -> Result<(), Error> {
        self.post(SelectionCommand::Insert(item))
    }

    /// # Errors
    ///
    /// Fails only if the owning task has stopped.
    pub fn remove(&self, package_id: impl Into<String>) -> Result<(), Error> {
        self.post(SelectionCommand::Remove {
            package_id: package_id.into(),
        })
    }

    /// # Errors
    ///
    /// Fails only if the owning task has stopped.
    pub fn set_checked(&self, package_id: impl Into<String>, checked: bool) -> Result<(), Error> {
        self.post(SelectionCommand::SetChecked {
            package_id: package_id.into(),
            checked,
        })
    }

    /// # Errors
    ///
    /// Fails only if the owning task has stopped.
    pub fn set_all_checked(&self, checked: bool) -> Result<(), Error> {
        self.post(SelectionCommand::SetAllChecked(checked))
    }

    /// Current items in model order, after every earlier post was applied
    ///
    /// # Errors
    ///
    /// Fails only if the owning task has stopped.
    pub async fn snapshot(&self) -> Result<Vec<AppDescriptor>, Error> {
        let (respond_to, rx) = oneshot::channel();
        self.post(SelectionCommand::Snapshot { respond_to })?;
        rx.await
            .map_err(|_| Error::internal("selection owner dropped the reply"))
    }

    /// Archive references of checked apps
    ///
    /// # Errors
    ///
    /// Fails only if the owning task has stopped.
    pub async fn selected_archive_refs(&self) -> Result<Vec<String>, Error> {
        let (respond_to, rx) = oneshot::channel();
        self.post(SelectionCommand::SelectedArchiveRefs { respond_to })?;
        rx.await
            .map_err(|_| Error::internal("selection owner dropped the reply"))
    }
}

/// Task that owns the model
pub struct SelectionOwner {
    handle: JoinHandle<SelectionModel>,
}

impl SelectionOwner {
    /// Start the owning task.
    ///
    /// Returns the owner, a poster, and the change stream. The task stops
    /// when every poster is dropped; [`SelectionOwner::finish`] then yields
    /// the final model.
    #[must_use]
    pub fn spawn(
        model: SelectionModel,
    ) -> (
        Self,
        SelectionPoster,
        mpsc::UnboundedReceiver<SelectionChange>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(model, rx, changes_tx));
        (Self { handle }, SelectionPoster { tx }, changes_rx)
    }

    /// Wait for the task to stop and take the model back
    ///
    /// # Errors
    ///
    /// Returns an error if the task panicked or was aborted.
    pub async fn finish(self) -> Result<SelectionModel, Error> {
        self.handle
            .await
            .map_err(|e| Error::internal(format!("selection owner failed: {e}")))
    }
}

async fn run(
    mut model: SelectionModel,
    mut commands: mpsc::UnboundedReceiver<SelectionCommand>,
    changes: mpsc::UnboundedSender<SelectionChange>,
) -> SelectionModel {
    while let Some(command) = commands.recv().await {
        let applied = match command {
            SelectionCommand::Insert(item) => model.insert(item),
            SelectionCommand::Remove { package_id } => model
                .remove(&package_id)
                .map(|(_, change)| change)
                .into_iter()
                .collect(),
            SelectionCommand::SetChecked {
                package_id,
                checked,
            } => model.set_checked(&package_id, checked).into_iter().collect(),
            SelectionCommand::SetAllChecked(checked) => model.set_all_checked(checked),
            SelectionCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(model.items().to_vec());
                Vec::new()
            }
            SelectionCommand::SelectedArchiveRefs { respond_to } => {
                let _ = respond_to.send(model.selected_archive_refs());
                Vec::new()
            }
        };
        for change in applied {
            // Nobody rendering is fine
            let _ = changes.send(change);
        }
    }
    tracing::trace!(items = model.len(), "selection owner stopped");
    model
}
