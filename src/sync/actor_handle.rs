//! GroupHandle - public API for a group engine
//!
//! Fire-and-forget methods for the gesture hot path, async methods with
//! oneshot channels for queries and lifecycle. Rendering reads the latest
//! published [`GroupView`] without a round trip.

use super::commands::GroupCommand;
use super::group::ParameterGroup;
use super::types::{EditError, GroupView, ParamValue};
use crate::remote::TransportError;
use tokio::sync::{mpsc, oneshot, watch};

/// Cheap to clone; the engine stops once every handle is dropped
#[derive(Clone)]
pub struct GroupHandle<G: ParameterGroup> {
    cmd_tx: mpsc::UnboundedSender<GroupCommand<G>>,
    view_rx: watch::Receiver<GroupView<G>>,
}

impl<G: ParameterGroup> GroupHandle<G> {
    pub(crate) fn new(
        cmd_tx: mpsc::UnboundedSender<GroupCommand<G>>,
        view_rx: watch::Receiver<GroupView<G>>,
    ) -> Self {
        Self { cmd_tx, view_rx }
    }

    // =========================================================================
    // Hot path methods (fire-and-forget, no await)
    // =========================================================================

    /// Apply an edit; rejections are logged by the engine
    pub fn apply_edit(&self, field: G::Field, value: impl Into<ParamValue>) {
        let _ = self.cmd_tx.send(GroupCommand::Edit {
            field,
            value: value.into(),
            respond: None,
        });
    }

    /// Merge a snapshot obtained elsewhere (e.g. a preset load response)
    pub fn ingest_external_update(&self, snapshot: G) {
        let _ = self.cmd_tx.send(GroupCommand::Ingest(snapshot));
    }

    /// Re-read the group from the server; ignored unless loaded
    pub fn refresh(&self) {
        let _ = self.cmd_tx.send(GroupCommand::Refresh);
    }

    // =========================================================================
    // Query methods (async with response)
    // =========================================================================

    /// Apply an edit and report whether the engine accepted it
    pub async fn try_edit(&self, field: G::Field, value: impl Into<ParamValue>) -> Result<(), EditError> {
        let (respond, response_rx) = oneshot::channel();
        let cmd = GroupCommand::Edit {
            field,
            value: value.into(),
            respond: Some(respond),
        };
        if self.cmd_tx.send(cmd).is_err() {
            return Err(EditError::EngineStopped);
        }
        response_rx.await.unwrap_or(Err(EditError::EngineStopped))
    }

    /// Current view as seen by the engine after all queued commands
    pub async fn snapshot(&self) -> Option<GroupView<G>> {
        let (respond, response_rx) = oneshot::channel();
        if self.cmd_tx.send(GroupCommand::Snapshot(respond)).is_err() {
            return None;
        }
        response_rx.await.ok()
    }

    /// Send the pending write now
    ///
    /// A stopped engine has nothing pending: it flushed on shutdown.
    pub async fn flush(&self) -> Result<(), TransportError> {
        let (respond, response_rx) = oneshot::channel();
        if self.cmd_tx.send(GroupCommand::Flush(respond)).is_err() {
            return Ok(());
        }
        response_rx.await.unwrap_or(Ok(()))
    }

    /// Flush, stop polling and wait for the engine to exit
    pub async fn shutdown(&self) {
        let (done, done_rx) = oneshot::channel();
        if self.cmd_tx.send(GroupCommand::Shutdown(done)).is_ok() {
            let _ = done_rx.await;
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Latest published view, without waiting
    pub fn view(&self) -> GroupView<G> {
        self.view_rx.borrow().clone()
    }

    /// Receiver that wakes on every published change
    pub fn subscribe(&self) -> watch::Receiver<GroupView<G>> {
        self.view_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.cmd_tx.is_closed()
    }
}
