//! Periodic refresh of a group from the server

use super::commands::Refresh;
use super::group::ParameterGroup;
use crate::remote::Remote;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

/// Repeating read task; aborted on [`stop`](Self::stop) or drop
#[derive(Debug)]
pub(crate) struct PollTask {
    handle: JoinHandle<()>,
}

impl PollTask {
    /// First read happens one `every` from now
    pub fn spawn<G, R>(
        remote: Arc<R>,
        template: G,
        every: Duration,
        settled: Arc<AtomicU64>,
        results: mpsc::UnboundedSender<Refresh<G>>,
    ) -> Self
    where
        G: ParameterGroup,
        R: Remote<G> + ?Sized,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            // No catch-up bursts after a slow read
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                trace!("Polling {}", template.label());
                let seen = settled.load(Ordering::Acquire);
                let result = remote.fetch(&template).await;
                if results.send(Refresh { settled: seen, result }).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
