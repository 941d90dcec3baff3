//! Pure reconciliation state for one group
//!
//! Holds the `local` / `last_synced` pair and the set of fields edited since
//! the last write. No timers, no I/O: the engine decides *when*, this type
//! decides *what*.

use super::group::ParameterGroup;
use super::types::{EditError, ParamValue};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// What an accepted edit requires from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Group is loaded: (re)start the debounce timer
    Scheduled,
    /// Group is not loaded yet: local change only, never written
    LocalOnly,
}

/// Fields to send, with the snapshot they are read from
#[derive(Debug, Clone)]
pub struct WritePatch<G: ParameterGroup> {
    pub snapshot: G,
    pub changed: Vec<G::Field>,
    /// Sequence number of this write, starting at 1
    pub seq: u64,
}

impl<G: ParameterGroup> WritePatch<G> {
    /// `(field, value)` pairs carried by this write
    pub fn entries(&self) -> Vec<(G::Field, ParamValue)> {
        self.changed
            .iter()
            .map(|&f| (f, self.snapshot.get(f)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler<G: ParameterGroup> {
    local: G,
    last_synced: G,
    loaded: bool,
    /// Fields edited since the last write fired
    pending: BTreeSet<G::Field>,
    /// Writes taken so far
    write_seq: u64,
    /// Sequence number of the latest write carrying each field
    written_at: BTreeMap<G::Field, u64>,
}

impl<G: ParameterGroup> Reconciler<G> {
    /// Unloaded state seeded with `initial` (the group's defaults)
    pub fn new(initial: G) -> Self {
        Self {
            local: initial.clone(),
            last_synced: initial,
            loaded: false,
            pending: BTreeSet::new(),
            write_seq: 0,
            written_at: BTreeMap::new(),
        }
    }

    pub fn local(&self) -> &G {
        &self.local
    }

    pub fn last_synced(&self) -> &G {
        &self.last_synced
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of writes taken so far
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn pending_fields(&self) -> impl Iterator<Item = G::Field> + '_ {
        self.pending.iter().copied()
    }

    /// Adopt the server snapshot from the initial read
    ///
    /// Overwrites any edits made while loading.
    pub fn mark_loaded(&mut self, fetched: G) {
        self.local = fetched.clone();
        self.last_synced = fetched;
        self.pending.clear();
        self.loaded = true;
    }

    /// Apply a user edit to `local`
    ///
    /// A rejected edit leaves `local` untouched.
    pub fn apply_edit(&mut self, field: G::Field, value: ParamValue) -> Result<EditOutcome, EditError> {
        if !G::is_editable(field) {
            return Err(EditError::ReadOnly(field.to_string()));
        }
        let mut next = self.local.clone();
        next.set(field, value)?;
        self.local = next;

        if !self.loaded {
            return Ok(EditOutcome::LocalOnly);
        }
        self.pending.insert(field);
        Ok(EditOutcome::Scheduled)
    }

    /// Merge a server state known to be current, without clobbering pending edits
    ///
    /// Returns true when `local` changed. Ignored until the group has loaded.
    pub fn ingest(&mut self, server: &G) -> bool {
        self.ingest_read(server, self.write_seq)
    }

    /// Merge a server read that reflects writes up to `settled` only
    ///
    /// Fields carried by a later write are skipped along with pending ones,
    /// so a read issued before a write landed cannot revert it.
    pub fn ingest_read(&mut self, server: &G, settled: u64) -> bool {
        if !self.loaded {
            trace!("Ignoring refresh for unloaded {}", self.local.label());
            return false;
        }

        let mut changed = false;
        for &field in G::fields() {
            if self.pending.contains(&field) {
                continue;
            }
            if self.written_at.get(&field).is_some_and(|&seq| seq > settled) {
                trace!("Skipping {} of {}: read predates write", field, self.local.label());
                continue;
            }
            let value = server.get(field);
            if self.local.get(field) != value {
                if let Err(e) = self.local.set(field, value.clone()) {
                    debug!("Ignoring server value {} for {}: {}", value, self.local.label(), e);
                    continue;
                }
                changed = true;
            }
            if self.last_synced.get(field) != value {
                if let Err(e) = self.last_synced.set(field, value) {
                    debug!("Server value rejected for synced {}: {}", self.local.label(), e);
                }
            }
        }
        changed
    }

    /// Close the pending write: diff, advance `last_synced`, clear pending
    ///
    /// `None` when nothing differs from the last synced state, and always
    /// while the group is unloaded: unloaded edits are never written.
    pub fn take_write(&mut self) -> Option<WritePatch<G>> {
        self.pending.clear();
        if !self.loaded {
            return None;
        }
        let changed = self.local.changed_fields(&self.last_synced);
        if changed.is_empty() {
            return None;
        }
        self.write_seq += 1;
        for &field in &changed {
            self.written_at.insert(field, self.write_seq);
        }
        self.last_synced = self.local.clone();
        Some(WritePatch {
            snapshot: self.local.clone(),
            changed,
            seq: self.write_seq,
        })
    }
}
