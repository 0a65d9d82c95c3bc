//! splitlog: a timestamp/"splits" logger with linear undo/redo history.
//!
//! The core is the split session — an ordered list of timed events with
//! snapshot-based change detection, chronological-insertion repair, and a
//! bounded undo history — persisted through a SQLite-backed key-value
//! store so a fresh session resumes where the last one stopped.

pub mod controller;
pub mod error;
pub mod export;
pub mod history;
pub mod import;
pub mod outline;
pub mod settings;
pub mod splits;
pub mod storage;

pub use controller::{SplitsController, SplitsView};
pub use error::{HistoryError, ImportError, SplitError};
pub use settings::{SettingsStore, SortState, ViewState};
pub use splits::{RunningState, SavedTime, SplitSession, SplitStore};
pub use storage::Storage;

/// Initialize logging (reads the RUST_LOG env var, defaults to info).
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
