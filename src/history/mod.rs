pub mod manager;
pub mod snapshot;

pub use manager::{HistoryManager, MAX_HISTORY};
pub use snapshot::HistorySnapshot;
