use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use log::info;

use crate::history::{HistoryManager, HistorySnapshot};

use super::model::{RunningState, SavedTime};
use super::store::SplitStore;

/// A split store paired with its undo/redo history.
///
/// Every mutator runs change detection after the change, so history keeps
/// up without the caller thinking about it; the periodic clock tick calls
/// `check_for_changes` directly to catch running-state flips between
/// mutations.
#[derive(Debug, Default)]
pub struct SplitSession {
    store: SplitStore,
    history: HistoryManager,
}

impl SplitSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &SplitStore {
        &self.store
    }

    pub fn times(&self) -> Vec<SavedTime> {
        self.store.times()
    }

    pub fn running_state(&self) -> RunningState {
        self.store.running_state()
    }

    /// Running-state flips alone are picked up by the next check; the
    /// callers that flip state always record a split right after, which
    /// triggers one.
    pub fn set_running_state(&mut self, state: RunningState) {
        self.store.set_running_state(state);
    }

    pub fn add_time(&mut self, time: SavedTime) -> Result<()> {
        self.store.add_time(time);
        self.check_for_changes()
    }

    pub fn delete_time(&mut self, index: usize) -> Result<SavedTime> {
        let removed = self.store.delete_time(index)?;
        self.check_for_changes()?;
        Ok(removed)
    }

    pub fn clear_times(&mut self) -> Result<()> {
        self.store.clear_times();
        self.check_for_changes()
    }

    pub fn insert_time(
        &mut self,
        elapsed_seconds: i64,
        label: Option<String>,
        offset_seconds: Option<i64>,
    ) -> Result<usize> {
        let index = self.store.insert_time(elapsed_seconds, label, offset_seconds)?;
        self.check_for_changes()?;
        Ok(index)
    }

    pub fn diff_to(&self, instant: DateTime<Utc>) -> Result<Duration> {
        Ok(self.store.diff_to(instant)?)
    }

    pub fn check_for_changes(&mut self) -> Result<()> {
        self.history.check_for_changes(&self.store)?;
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back one snapshot. `proceed` is queried once, and only when an
    /// undo is actually possible; returning false vetoes the undo (the
    /// import-cancellation gate). Returns whether state was restored.
    pub fn undo<F: FnOnce() -> bool>(&mut self, proceed: F) -> Result<bool> {
        if !self.history.can_undo() {
            return Ok(false);
        }
        if !proceed() {
            info!("undo vetoed by confirmation gate");
            return Ok(false);
        }
        let Some(snapshot) = self.history.undo()? else {
            return Ok(false);
        };
        self.apply_snapshot(snapshot);
        Ok(true)
    }

    /// Step forward one snapshot, if an undone state is still ahead of the
    /// cursor. Returns whether state was restored.
    pub fn redo(&mut self) -> Result<bool> {
        let Some(snapshot) = self.history.redo()? else {
            return Ok(false);
        };
        self.apply_snapshot(snapshot);
        Ok(true)
    }

    /// Replace the live state from a canonical snapshot string, the resume
    /// path at startup. Decoding happens before anything is touched, so a
    /// corrupt string leaves the session as it was.
    pub fn restore_from_snapshot(&mut self, raw: &str) -> Result<()> {
        let snapshot = HistorySnapshot::from_canonical_json(raw)?;
        self.apply_snapshot(snapshot);
        Ok(())
    }

    /// The latest appended snapshot for durable storage, handed out once.
    pub fn take_pending_persist(&mut self) -> Option<String> {
        self.history.take_pending_persist()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    fn apply_snapshot(&mut self, snapshot: HistorySnapshot) {
        let (times, running_state) = snapshot.into_parts();
        self.store.replace(times, running_state);
    }
}
