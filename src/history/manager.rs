use log::debug;

use crate::error::HistoryError;
use crate::splits::SplitStore;

use super::snapshot::HistorySnapshot;

/// Maximum number of snapshots kept before the oldest fall off.
pub const MAX_HISTORY: usize = 100;

/// Linear undo/redo history over canonical snapshot strings.
///
/// The manager owns the snapshot list and cursor exclusively. Appending
/// while the cursor sits before the end discards the redo branch; once the
/// list is full the oldest entry is evicted silently (a sliding window).
///
/// Change detection coalesces: a check requested while one is already in
/// progress is recorded in `needs_rerun` and replayed before the in-flight
/// check finishes, so a change landing mid-check is never dropped and an
/// unchanged state is never appended twice.
#[derive(Debug, Default)]
pub struct HistoryManager {
    entries: Vec<String>,
    cursor: Option<usize>,
    check_in_progress: bool,
    needs_rerun: bool,
    pending_persist: Option<String>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cursor position, or `None` while the history is empty.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The snapshot the cursor points at.
    pub fn current(&self) -> Option<&str> {
        self.cursor.and_then(|c| self.entries.get(c)).map(String::as_str)
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.entries.len())
    }

    /// Compare the store's current state against the snapshot under the
    /// cursor and append a new snapshot if they differ. The first check on
    /// an empty history always appends.
    pub fn check_for_changes(&mut self, store: &SplitStore) -> Result<(), HistoryError> {
        if self.check_in_progress {
            self.needs_rerun = true;
            return Ok(());
        }
        self.check_in_progress = true;
        let result = self.run_checks(store);
        self.check_in_progress = false;
        result
    }

    /// Retry-until-quiescent loop: one pass per deferred request, so a
    /// change recorded during a check is replayed before returning.
    fn run_checks(&mut self, store: &SplitStore) -> Result<(), HistoryError> {
        loop {
            let current_state =
                HistorySnapshot::capture(store.times(), store.running_state())
                    .to_canonical_json()?;

            let changed = match self.current() {
                Some(last_state) => last_state != current_state,
                None => true,
            };
            if changed {
                self.append_snapshot(current_state);
            }

            if self.needs_rerun {
                self.needs_rerun = false;
                continue;
            }
            return Ok(());
        }
    }

    /// Append a canonical snapshot: truncate the redo branch, evict the
    /// oldest entry when the window is full, and record the snapshot for the
    /// owner to persist.
    fn append_snapshot(&mut self, snapshot: String) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);

        if self.entries.len() >= MAX_HISTORY {
            self.entries.remove(0);
        }

        self.pending_persist = Some(snapshot.clone());
        self.entries.push(snapshot);
        self.cursor = Some(self.entries.len() - 1);
        debug!(
            "appended history snapshot ({} entries, cursor {})",
            self.entries.len(),
            self.entries.len() - 1
        );
    }

    /// Step the cursor back and return the revived snapshot to restore.
    /// `None` when already at the oldest entry. The cursor only moves after
    /// the snapshot decodes, so a corrupt entry leaves the history intact.
    pub fn undo(&mut self) -> Result<Option<HistorySnapshot>, HistoryError> {
        let Some(cursor) = self.cursor.filter(|c| *c > 0) else {
            return Ok(None);
        };
        let snapshot = HistorySnapshot::from_canonical_json(&self.entries[cursor - 1])?;
        self.cursor = Some(cursor - 1);
        Ok(Some(snapshot))
    }

    /// Step the cursor forward and return the revived snapshot to restore.
    /// `None` when there is nothing ahead of the cursor.
    pub fn redo(&mut self) -> Result<Option<HistorySnapshot>, HistoryError> {
        let Some(cursor) = self.cursor.filter(|c| c + 1 < self.entries.len()) else {
            return Ok(None);
        };
        let snapshot = HistorySnapshot::from_canonical_json(&self.entries[cursor + 1])?;
        self.cursor = Some(cursor + 1);
        Ok(Some(snapshot))
    }

    /// The most recently appended snapshot, handed out once for durable
    /// storage. Persistence failures are the owner's problem; the in-memory
    /// history is already updated either way.
    pub fn take_pending_persist(&mut self) -> Option<String> {
        self.pending_persist.take()
    }
}
