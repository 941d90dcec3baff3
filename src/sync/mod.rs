//! Debounced reconciliation engine
//!
//! Keeps a locally edited parameter group consistent with the server while
//! bounding write traffic:
//!
//! - every edit re-arms a trailing debounce timer; only the quiet period
//!   after the *last* edit fires a write
//! - a write carries exactly the fields that differ from the last synced
//!   state
//! - server refreshes never clobber fields with an unsent edit
//!
//! One engine (a tokio task) runs per group; callers talk to it through a
//! [`GroupHandle`].

mod actor;
mod actor_handle;
mod commands;
mod group;
mod poller;
mod reconciler;
mod timer;
mod types;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use actor::{EngineOptions, GroupActor, DEFAULT_DEBOUNCE_MS};
pub use actor_handle::GroupHandle;
pub use group::ParameterGroup;
pub use reconciler::{EditOutcome, Reconciler, WritePatch};
pub use timer::DebounceTimer;
pub use types::{EditError, GroupView, LoadState, ParamValue};
