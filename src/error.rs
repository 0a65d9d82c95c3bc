//! Typed errors for the distinct failure conditions of the core.
//!
//! The controller and storage layers wrap these in `anyhow` like the rest of
//! the application; the enums exist so callers can tell an empty-store diff
//! apart from a corrupt snapshot without string matching.

use thiserror::Error;

/// Failures of split-list operations.
#[derive(Debug, Error)]
pub enum SplitError {
    /// Diff and insert operations need a start split to measure against.
    #[error("no reference split to measure against; the split list is empty")]
    NoReferencePoint,

    /// The given index does not point at a split.
    #[error("split index {index} is out of range (list has {len} splits)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Failures of snapshot serialization and revival.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A snapshot string could not be revived into typed state. Nothing is
    /// applied when this is returned.
    #[error("corrupt history snapshot")]
    CorruptSnapshot(#[source] serde_json::Error),

    /// The current state could not be serialized into canonical form.
    #[error("failed to serialize history snapshot")]
    Serialize(#[source] serde_json::Error),
}

/// Failures of chapter-import parsing.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A chapter line did not start with an `HH:mm:ss` timecode.
    #[error("invalid timecode '{text}' (expected HH:mm:ss)")]
    InvalidTimecode { text: String },
}
