use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use tokio::{sync::Mutex, task::JoinHandle, time};

use crate::{
    export,
    import::{self, CancelMode, ImportSession},
    splits::{RunningState, SavedTime, SplitSession},
    storage::Storage,
};

/// A read-only view of the session for display layers.
#[derive(Debug, Clone)]
pub struct SplitsView {
    pub times: Vec<SavedTime>,
    pub running_state: RunningState,
    pub can_undo: bool,
    pub can_redo: bool,
    pub importing: bool,
}

/// Clone-able handle around the shared split session.
///
/// Owns the storage connection and the clock ticker. The ticker fires every
/// 100 ms; checking history that often would be wasteful, so only every
/// tenth tick runs change detection, the same cadence the interactive clock
/// display updates at.
#[derive(Clone)]
pub struct SplitsController {
    session: Arc<Mutex<SplitSession>>,
    import: Arc<Mutex<ImportSession>>,
    storage: Storage,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    history_every_ticks: u32,
}

impl SplitsController {
    pub fn new(storage: Storage) -> Self {
        Self {
            session: Arc::new(Mutex::new(SplitSession::new())),
            import: Arc::new(Mutex::new(ImportSession::new())),
            storage,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_millis(100),
            history_every_ticks: 10,
        }
    }

    /// Restore the last persisted snapshot, if any, through the same decode
    /// path undo/redo uses. A corrupt stored state is logged and skipped so
    /// a damaged database never blocks startup.
    pub async fn resume_from_storage(&self) -> Result<()> {
        let Some(raw) = self.storage.load_history_state().await? else {
            return Ok(());
        };

        let mut session = self.session.lock().await;
        match session.restore_from_snapshot(&raw) {
            Ok(()) => {
                info!("resumed {} splits from storage", session.times().len());
                session.check_for_changes()?;
                self.persist_pending(&mut session).await;
            }
            Err(err) => {
                warn!("stored history state is corrupt, starting fresh: {err:#}");
            }
        }
        Ok(())
    }

    /// Spawn the periodic change-detection ticker. A previous ticker, if
    /// any, is replaced.
    pub async fn start_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let session = self.session.clone();
        let storage = self.storage.clone();
        let tick_interval = self.tick_interval;
        let history_every = self.history_every_ticks;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            let mut ticks: u32 = 0;
            loop {
                interval.tick().await;
                ticks = ticks.wrapping_add(1);
                if ticks % history_every != 0 {
                    continue;
                }

                let pending = {
                    let mut guard = session.lock().await;
                    if let Err(err) = guard.check_for_changes() {
                        warn!("periodic history check failed: {err:#}");
                        continue;
                    }
                    guard.take_pending_persist()
                };

                if let Some(state) = pending {
                    if let Err(err) = storage.save_history_state(&state, Utc::now()).await {
                        warn!("failed to persist history state: {err:#}");
                    }
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    pub async fn stop_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    /// Start (or resume) the clock: any pending import is discarded, the
    /// state flips to Running, and a "Start" or "Unpaused" split marks the
    /// transition.
    pub async fn play(&self) -> Result<()> {
        self.import.lock().await.cancel(CancelMode::Never, || true);

        let mut session = self.session.lock().await;
        session.set_running_state(RunningState::Running);
        let label = if session.times().is_empty() {
            "Start"
        } else {
            "Unpaused"
        };
        session.add_time(SavedTime::with_label(Utc::now(), label))?;
        self.persist_pending(&mut session).await;
        Ok(())
    }

    /// Stop the clock and mark the transition with a "Paused" split.
    pub async fn stop(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        session.set_running_state(RunningState::Stopped);
        session.add_time(SavedTime::with_label(Utc::now(), "Paused"))?;
        self.persist_pending(&mut session).await;
        Ok(())
    }

    /// Record an unlabeled split at the current instant.
    pub async fn split(&self) -> Result<()> {
        self.add_time(SavedTime::new(Utc::now())).await
    }

    pub async fn add_time(&self, time: SavedTime) -> Result<()> {
        let mut session = self.session.lock().await;
        session.add_time(time)?;
        self.persist_pending(&mut session).await;
        Ok(())
    }

    pub async fn delete_split(&self, index: usize) -> Result<SavedTime> {
        let mut session = self.session.lock().await;
        let removed = session.delete_time(index)?;
        self.persist_pending(&mut session).await;
        Ok(removed)
    }

    pub async fn clear_splits(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        session.clear_times()?;
        self.persist_pending(&mut session).await;
        Ok(())
    }

    /// Insert a split at an elapsed offset from the start split, repairing
    /// neighbors. Returns the insertion index.
    pub async fn insert_split(
        &self,
        elapsed_seconds: i64,
        label: Option<String>,
        offset_seconds: Option<i64>,
    ) -> Result<usize> {
        let mut session = self.session.lock().await;
        let index = session.insert_time(elapsed_seconds, label, offset_seconds)?;
        self.persist_pending(&mut session).await;
        Ok(index)
    }

    /// Undo the last change. When an import with unsaved chapter text is in
    /// progress, `proceed` stands in for the user's confirmation that
    /// cancelling it is fine; without it the undo is vetoed.
    pub async fn undo(&self, proceed: bool) -> Result<bool> {
        let mut import = self.import.lock().await;
        let mut session = self.session.lock().await;
        let undone = session.undo(|| import.cancel(CancelMode::IfNeeded, || proceed))?;
        Ok(undone)
    }

    pub async fn redo(&self) -> Result<bool> {
        let mut session = self.session.lock().await;
        session.redo()
    }

    pub async fn start_import(&self) {
        self.import.lock().await.start();
    }

    pub async fn append_import_line(&self, line: &str) {
        self.import.lock().await.push_line(line);
    }

    pub async fn cancel_import(&self, mode: CancelMode, proceed: bool) -> bool {
        self.import.lock().await.cancel(mode, || proceed)
    }

    /// Parse the buffered chapter text and add one split per chapter,
    /// anchored so the latest chapter is treated as having just occurred.
    /// Returns how many splits were added. A parse failure leaves the
    /// buffer in place so the user can fix it.
    pub async fn finish_import(&self) -> Result<usize> {
        let mut import = self.import.lock().await;
        let chapters = import::parse_chapters(import.buffer())?;
        import.finish();
        drop(import);

        let times = import::chapters_to_times(&chapters, Utc::now());
        let count = times.len();

        let mut session = self.session.lock().await;
        for time in times {
            session.add_time(time)?;
        }
        self.persist_pending(&mut session).await;
        info!("imported {count} chapter splits");
        Ok(count)
    }

    pub async fn importing(&self) -> bool {
        self.import.lock().await.is_importing()
    }

    /// Whether an undo would throw away typed-but-unimported chapter text,
    /// the case that warrants asking the user first.
    pub async fn has_unsaved_import(&self) -> bool {
        self.import.lock().await.has_unsaved_chapters()
    }

    // Lock order is import before session everywhere, matching undo().
    pub async fn view(&self) -> SplitsView {
        let import = self.import.lock().await;
        let session = self.session.lock().await;
        SplitsView {
            times: session.times(),
            running_state: session.running_state(),
            can_undo: session.can_undo(),
            can_redo: session.can_redo(),
            importing: import.is_importing(),
        }
    }

    /// The split list as copyable text, chronological.
    pub async fn copy_text(&self) -> Result<String> {
        let session = self.session.lock().await;
        Ok(export::copy_text(session.store())?)
    }

    /// Display lines in the given chronological order mapping.
    pub async fn timestamp_lines(&self, order: &[usize]) -> Result<Vec<String>> {
        let session = self.session.lock().await;
        let mut lines = Vec::with_capacity(order.len());
        for &index in order {
            lines.push(export::timestamp_line(session.store(), index)?);
        }
        Ok(lines)
    }

    /// Elapsed time from the start split to now, `00:00:00` when no splits
    /// exist yet.
    pub async fn elapsed_display(&self) -> String {
        let session = self.session.lock().await;
        match session.diff_to(Utc::now()) {
            Ok(diff) => export::format_duration_hms(diff),
            Err(_) => "00:00:00".to_string(),
        }
    }

    async fn persist_pending(&self, session: &mut SplitSession) {
        if let Some(state) = session.take_pending_persist() {
            if let Err(err) = self.storage.save_history_state(&state, Utc::now()).await {
                warn!("failed to persist history state: {err:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_storage(dir: &tempfile::TempDir) -> Storage {
        Storage::new(dir.path().join("splitlog.sqlite3")).unwrap()
    }

    #[tokio::test]
    async fn play_labels_first_and_later_starts() {
        let dir = tempfile::tempdir().unwrap();
        let controller = SplitsController::new(test_storage(&dir));

        controller.play().await.unwrap();
        controller.stop().await.unwrap();
        controller.play().await.unwrap();

        let view = controller.view().await;
        assert_eq!(view.running_state, RunningState::Running);
        let labels: Vec<_> = view
            .times
            .iter()
            .map(|t| t.label.as_deref().unwrap())
            .collect();
        assert_eq!(labels, vec!["Start", "Paused", "Unpaused"]);
    }

    #[tokio::test]
    async fn splits_persist_and_resume() {
        let dir = tempfile::tempdir().unwrap();
        let storage = test_storage(&dir);

        {
            let controller = SplitsController::new(storage.clone());
            controller.play().await.unwrap();
            controller.split().await.unwrap();
        }

        let controller = SplitsController::new(storage);
        controller.resume_from_storage().await.unwrap();

        let view = controller.view().await;
        assert_eq!(view.times.len(), 2);
        assert_eq!(view.running_state, RunningState::Running);
        // resume seeds history with exactly the restored state
        assert!(!view.can_undo);
        assert!(!view.can_redo);
    }

    #[tokio::test]
    async fn resume_with_corrupt_state_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let storage = test_storage(&dir);
        storage
            .save_history_state("{definitely not json", Utc::now())
            .await
            .unwrap();

        let controller = SplitsController::new(storage);
        controller.resume_from_storage().await.unwrap();
        assert!(controller.view().await.times.is_empty());
    }

    #[tokio::test]
    async fn undo_is_vetoed_while_an_unsaved_import_is_pending() {
        let dir = tempfile::tempdir().unwrap();
        let controller = SplitsController::new(test_storage(&dir));

        controller.play().await.unwrap();
        controller.split().await.unwrap();

        controller.start_import().await;
        controller.append_import_line("00:00:10 - pending").await;

        assert!(!controller.undo(false).await.unwrap());
        assert_eq!(controller.view().await.times.len(), 2);
        assert!(controller.importing().await);

        // confirmed: the import is discarded and the undo goes through
        assert!(controller.undo(true).await.unwrap());
        assert_eq!(controller.view().await.times.len(), 1);
        assert!(!controller.importing().await);
    }

    #[tokio::test]
    async fn import_adds_anchored_splits() {
        let dir = tempfile::tempdir().unwrap();
        let controller = SplitsController::new(test_storage(&dir));

        controller.start_import().await;
        controller.append_import_line("00:00:00 - intro").await;
        controller.append_import_line("00:01:00 - second").await;
        let count = controller.finish_import().await.unwrap();
        assert_eq!(count, 2);

        let view = controller.view().await;
        assert_eq!(view.times.len(), 2);
        let gap = view.times[1].value - view.times[0].value;
        assert_eq!(gap.num_seconds(), 60);
        assert!(!view.importing);
    }

    #[tokio::test]
    async fn failed_import_parse_keeps_the_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let controller = SplitsController::new(test_storage(&dir));

        controller.start_import().await;
        controller.append_import_line("garbage line").await;
        assert!(controller.finish_import().await.is_err());
        assert!(controller.importing().await);
        assert!(controller.view().await.times.is_empty());
    }

    #[tokio::test]
    async fn insert_and_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let controller = SplitsController::new(test_storage(&dir));

        controller.play().await.unwrap();
        let index = controller
            .insert_split(30, Some("Inserted".into()), None)
            .await
            .unwrap();
        assert_eq!(index, 1);

        let removed = controller.delete_split(1).await.unwrap();
        assert_eq!(removed.label.as_deref(), Some("Inserted"));
        assert_eq!(controller.view().await.times.len(), 1);
    }

    #[tokio::test]
    async fn copy_text_defaults_labels() {
        let dir = tempfile::tempdir().unwrap();
        let controller = SplitsController::new(test_storage(&dir));

        controller.play().await.unwrap();
        controller.split().await.unwrap();

        let text = controller.copy_text().await.unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("- Start"));
        assert!(lines[1].ends_with("- Split 2"));
    }
}
