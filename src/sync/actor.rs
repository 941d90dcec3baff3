//! GroupActor - debounced reconciliation engine for one parameter group
//!
//! Owns the group's [`Reconciler`], its debounce timer and its poller, and
//! processes commands sequentially so edits apply in arrival order without
//! locks.
//!
//! # Lifecycle
//!
//! ```text
//!            fetch ok            edit               timer fires
//! Loading ────────────► Loaded ───────► Pending ────────────────► Loaded
//!    │                    ▲               │  ▲ edit (re-arm)        (write spawned)
//!    │ fetch err          └───────────────┘──┘
//!    ▼
//! Failed (terminal: edits stay local, nothing is polled or written)
//! ```
//!
//! Shutdown flushes any pending write and waits for in-flight writes.

use super::actor_handle::GroupHandle;
use super::commands::{GroupCommand, Refresh};
use super::group::ParameterGroup;
use super::poller::PollTask;
use super::reconciler::{EditOutcome, Reconciler, WritePatch};
use super::timer::DebounceTimer;
use super::types::{GroupView, LoadState};
use crate::remote::{Remote, TransportError};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

/// Default trailing debounce before a write fires
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub debounce: Duration,
    /// Re-read the group periodically once loaded
    pub poll_interval: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            poll_interval: None,
        }
    }
}

pub struct GroupActor<G: ParameterGroup, R: Remote<G> + ?Sized> {
    reconciler: Reconciler<G>,
    /// Identity passed to reads (carries e.g. the oscillator index)
    template: G,
    remote: Arc<R>,
    options: EngineOptions,
    timer: DebounceTimer,
    load: LoadState,
    last_error: Option<String>,
    write_count: u64,
    poller: Option<PollTask>,
    in_flight: JoinSet<(u64, Result<(), TransportError>)>,
    /// Sequence numbers of writes spawned but not yet answered
    unanswered: BTreeSet<u64>,
    /// Highest write sequence with every write up to it answered; reads
    /// issued before a write lands must not revert it
    settled: Arc<AtomicU64>,
    command_rx: mpsc::UnboundedReceiver<GroupCommand<G>>,
    refresh_tx: mpsc::UnboundedSender<Refresh<G>>,
    refresh_rx: mpsc::UnboundedReceiver<Refresh<G>>,
    view_tx: watch::Sender<GroupView<G>>,
}

impl<G: ParameterGroup, R: Remote<G> + ?Sized> GroupActor<G, R> {
    /// Spawn the engine and start its initial read
    ///
    /// `initial` seeds `local` until the read completes and identifies the
    /// group to the remote.
    pub fn spawn(initial: G, remote: Arc<R>, options: EngineOptions) -> GroupHandle<G> {
        let (cmd_tx, command_rx) = mpsc::unbounded_channel();
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(GroupView {
            load: LoadState::Loading,
            local: initial.clone(),
            pending: false,
            last_error: None,
            writes: 0,
        });

        let actor = GroupActor {
            reconciler: Reconciler::new(initial.clone()),
            template: initial,
            remote,
            options,
            timer: DebounceTimer::new(),
            load: LoadState::Loading,
            last_error: None,
            write_count: 0,
            poller: None,
            in_flight: JoinSet::new(),
            unanswered: BTreeSet::new(),
            settled: Arc::new(AtomicU64::new(0)),
            command_rx,
            refresh_tx,
            refresh_rx,
            view_tx,
        };

        tokio::spawn(actor.run());

        GroupHandle::new(cmd_tx, view_rx)
    }

    async fn run(mut self) {
        let label = self.template.label();
        info!(
            "Group engine started for {} (debounce: {:?})",
            label, self.options.debounce
        );

        if !self.initialize().await {
            info!("Group engine for {} stopped while loading", label);
            return;
        }

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(GroupCommand::Shutdown(done)) => {
                        self.shutdown().await;
                        let _ = done.send(());
                        return;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        debug!("All handles to {} dropped", label);
                        self.shutdown().await;
                        return;
                    }
                },
                _ = self.timer.expired() => {
                    trace!("Debounce window expired for {}", label);
                    if let Some(patch) = self.take_write() {
                        self.spawn_write(patch);
                    }
                    self.publish();
                }
                Some(refresh) = self.refresh_rx.recv() => self.handle_refresh(refresh),
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    match joined {
                        Ok((seq, result)) => {
                            self.unanswered.remove(&seq);
                            self.record_write_result(&result);
                        }
                        Err(e) => warn!("Write task for {} aborted: {}", label, e),
                    }
                    self.update_settled();
                    self.publish();
                }
            }
        }
    }

    /// Perform the single initial read, serving commands meanwhile
    ///
    /// Returns false if shutdown was requested before the read completed.
    async fn initialize(&mut self) -> bool {
        let remote = Arc::clone(&self.remote);
        let template = self.template.clone();
        let fetch = async move { remote.fetch(&template).await };
        tokio::pin!(fetch);

        loop {
            tokio::select! {
                result = &mut fetch => {
                    self.finish_load(result);
                    return true;
                }
                cmd = self.command_rx.recv() => match cmd {
                    Some(GroupCommand::Shutdown(done)) => {
                        let _ = done.send(());
                        return false;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                    None => return false,
                }
            }
        }
    }

    fn finish_load(&mut self, result: Result<G, TransportError>) {
        let label = self.template.label();
        match result {
            Ok(fetched) => {
                self.reconciler.mark_loaded(fetched);
                self.load = LoadState::Loaded;
                info!("Loaded {}", label);
                if let Some(every) = self.options.poll_interval {
                    debug!("Polling {} every {:?}", label, every);
                    self.poller = Some(PollTask::spawn(
                        Arc::clone(&self.remote),
                        self.template.clone(),
                        every,
                        Arc::clone(&self.settled),
                        self.refresh_tx.clone(),
                    ));
                }
            }
            Err(e) => {
                warn!("Failed to load {}: {}", label, e);
                self.load = LoadState::Failed(e.to_string());
            }
        }
        self.publish();
    }

    async fn handle_command(&mut self, cmd: GroupCommand<G>) {
        trace!("{}: {:?}", self.template.label(), cmd);
        match cmd {
            GroupCommand::Edit {
                field,
                value,
                respond,
            } => {
                let result = self.reconciler.apply_edit(field, value);
                match &result {
                    Ok(EditOutcome::Scheduled) => {
                        self.timer.schedule(self.options.debounce);
                        self.publish();
                    }
                    Ok(EditOutcome::LocalOnly) => {
                        debug!("{} not loaded, {} changed locally only", self.template.label(), field);
                        self.publish();
                    }
                    Err(e) => debug!("Rejected edit on {}: {}", self.template.label(), e),
                }
                if let Some(respond) = respond {
                    let _ = respond.send(result.map(|_| ()));
                }
            }
            GroupCommand::Ingest(snapshot) => self.ingest(&snapshot),
            GroupCommand::Refresh => self.spawn_refresh(),
            GroupCommand::Snapshot(respond) => {
                let _ = respond.send(self.view());
            }
            GroupCommand::Flush(respond) => {
                let result = self.flush().await;
                self.publish();
                let _ = respond.send(result);
            }
            // Handled by the run loops
            GroupCommand::Shutdown(done) => {
                let _ = done.send(());
            }
        }
    }

    fn ingest(&mut self, snapshot: &G) {
        if self.reconciler.ingest(snapshot) {
            debug!("Refreshed {} from server", self.template.label());
            self.publish();
        }
    }

    /// Merge a background read
    ///
    /// Fields written after the read was issued are skipped, so a poll that
    /// crosses a write cannot revert it. The write's own failure is still
    /// only reported (see the divergence note on `record_write_result`).
    fn handle_refresh(&mut self, refresh: Refresh<G>) {
        match refresh.result {
            Ok(snapshot) => {
                if self.reconciler.ingest_read(&snapshot, refresh.settled) {
                    debug!("Refreshed {} from server", self.template.label());
                    self.publish();
                }
            }
            Err(e) => {
                debug!("Refresh of {} failed: {}", self.template.label(), e);
                self.last_error = Some(e.to_string());
                self.publish();
            }
        }
    }

    fn spawn_refresh(&self) {
        if self.load != LoadState::Loaded {
            debug!("Ignoring refresh of {} ({})", self.template.label(), self.load);
            return;
        }
        let remote = Arc::clone(&self.remote);
        let template = self.template.clone();
        let results = self.refresh_tx.clone();
        let settled = self.settled.load(Ordering::Acquire);
        tokio::spawn(async move {
            let result = remote.fetch(&template).await;
            let _ = results.send(Refresh { settled, result });
        });
    }

    fn take_write(&mut self) -> Option<WritePatch<G>> {
        self.timer.cancel();
        let patch = self.reconciler.take_write()?;
        self.write_count += 1;
        debug!(
            "Writing {} field(s) of {}: {:?}",
            patch.changed.len(),
            self.template.label(),
            patch.entries()
        );
        Some(patch)
    }

    /// Fire-and-forget: the result arrives through `in_flight`
    fn spawn_write(&mut self, patch: WritePatch<G>) {
        let remote = Arc::clone(&self.remote);
        self.unanswered.insert(patch.seq);
        self.in_flight.spawn(async move {
            let result = remote.send(&patch.snapshot, &patch.changed).await;
            (patch.seq, result)
        });
    }

    fn update_settled(&mut self) {
        if self.in_flight.is_empty() {
            self.unanswered.clear();
        }
        let settled = match self.unanswered.first() {
            Some(&oldest) => oldest - 1,
            None => self.reconciler.write_seq(),
        };
        self.settled.store(settled, Ordering::Release);
    }

    /// Send the pending write now and wait for the server's answer
    async fn flush(&mut self) -> Result<(), TransportError> {
        let Some(patch) = self.take_write() else {
            return Ok(());
        };
        let result = self.remote.send(&patch.snapshot, &patch.changed).await;
        self.record_write_result(&result);
        self.update_settled();
        result
    }

    /// A failed write is reported, not rolled back: `last_synced` already
    /// holds the written values, so local and server differ until a read
    /// issued after the failure brings the server's values back.
    fn record_write_result(&mut self, result: &Result<(), TransportError>) {
        match result {
            Ok(()) => self.last_error = None,
            Err(e) => {
                warn!("Write to {} failed: {}", self.template.label(), e);
                self.last_error = Some(e.to_string());
            }
        }
    }

    async fn shutdown(&mut self) {
        let label = self.template.label();
        info!("Group engine for {} shutting down, flushing pending write", label);

        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        if self.timer.is_armed() {
            let _ = self.flush().await;
        }
        while let Some(joined) = self.in_flight.join_next().await {
            if let Ok((_, result)) = joined {
                self.record_write_result(&result);
            }
        }
        self.publish();

        info!(
            "Group engine for {} shutdown complete (total writes: {})",
            label, self.write_count
        );
    }

    fn view(&self) -> GroupView<G> {
        GroupView {
            load: self.load.clone(),
            local: self.reconciler.local().clone(),
            pending: self.timer.is_armed(),
            last_error: self.last_error.clone(),
            writes: self.write_count,
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }
}
