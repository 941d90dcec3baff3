//! Commands for the group engine
//!
//! Like the rest of the actor plumbing, commands split into:
//! - **Hot path** (no response): edits from knob drags, refreshes from the poller
//! - **Request-response**: queries and lifecycle operations via oneshot

use super::group::ParameterGroup;
use super::types::{EditError, GroupView, ParamValue};
use crate::remote::TransportError;
use std::fmt;
use tokio::sync::oneshot;

pub enum GroupCommand<G: ParameterGroup> {
    // -------------------------------------------------------------------------
    // Hot path commands (no response - fire and forget)
    // -------------------------------------------------------------------------
    /// Apply a user edit to `local`; `respond` reports rejection if present
    Edit {
        field: G::Field,
        value: ParamValue,
        respond: Option<oneshot::Sender<Result<(), EditError>>>,
    },

    /// Merge an externally obtained snapshot
    Ingest(G),

    /// Re-read the server state now (e.g. after a preset load)
    Refresh,

    // -------------------------------------------------------------------------
    // Request-response commands
    // -------------------------------------------------------------------------
    /// Current view
    Snapshot(oneshot::Sender<GroupView<G>>),

    /// Fire the pending write now; replies once it has been sent
    Flush(oneshot::Sender<Result<(), TransportError>>),

    /// Flush, stop polling and exit
    Shutdown(oneshot::Sender<()>),
}

impl<G: ParameterGroup> fmt::Debug for GroupCommand<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupCommand::Edit { field, value, .. } => write!(f, "Edit({} = {})", field, value),
            GroupCommand::Ingest(_) => write!(f, "Ingest"),
            GroupCommand::Refresh => write!(f, "Refresh"),
            GroupCommand::Snapshot(_) => write!(f, "Snapshot"),
            GroupCommand::Flush(_) => write!(f, "Flush"),
            GroupCommand::Shutdown(_) => write!(f, "Shutdown"),
        }
    }
}

/// Outcome of a background read (poll or requested refresh)
#[derive(Debug)]
pub(crate) struct Refresh<G> {
    /// Writes known to have landed when the read was issued
    pub settled: u64,
    pub result: Result<G, TransportError>,
}
