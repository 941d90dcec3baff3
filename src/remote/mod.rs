//! Read/write collaborators for parameter groups
//!
//! The synth server owns all signal processing. The surface only ever talks
//! to it through two calls per group:
//! - **fetch**: read the group's current state (initial load and polling)
//! - **send**: push the fields that changed since the last sync
//!
//! Writes are fire-and-forget: failures are reported, never retried here.

pub mod actions;
pub mod http;

use crate::sync::ParameterGroup;
use async_trait::async_trait;
use thiserror::Error;

pub use actions::{PresetSummary, RecorderAction};
pub use http::SynthClient;

/// Transient failure talking to the server
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("{url} refused the request: {message}")]
    Rejected { url: String, message: String },

    #[error("server unavailable: {0}")]
    Unavailable(String),
}

/// Read/write access to one group's remote state
///
/// Note: methods take `&self` so one collaborator can be shared (`Arc`)
/// between the engine, its poller and in-flight writes.
#[async_trait]
pub trait Remote<G: ParameterGroup>: Send + Sync + 'static {
    /// Read the group. `template` carries identity (e.g. oscillator index).
    async fn fetch(&self, template: &G) -> Result<G, TransportError>;

    /// Write `changed` fields of `snapshot`, plus whatever keys identify the group
    async fn send(&self, snapshot: &G, changed: &[G::Field]) -> Result<(), TransportError>;
}
