//! Display formatting for the split list.
//!
//! Default labels live here, not in the store: an unlabeled split renders
//! as `Split N` by its chronological position, so the stored data stays
//! exactly what the user entered.

use chrono::Duration;

use crate::error::SplitError;
use crate::settings::SortState;
use crate::splits::SplitStore;

/// Render a duration as `HH:mm:ss`. Hours are unbounded rather than
/// wrapping at 24; negative durations clamp to zero.
pub fn format_duration_hms(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// The split's label, or `Split N` from its chronological position.
pub fn split_label(store: &SplitStore, index: usize) -> String {
    store
        .get(index)
        .and_then(|time| time.label.clone())
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| format!("Split {}", index + 1))
}

/// One display line: `"HH:mm:ss - label"`, the diff measured from the start
/// split.
pub fn timestamp_line(store: &SplitStore, index: usize) -> Result<String, SplitError> {
    let time = store.get(index).ok_or(SplitError::IndexOutOfRange {
        index,
        len: store.len(),
    })?;
    let diff = store.diff_for(time)?;
    Ok(format!(
        "{} - {}",
        format_duration_hms(diff),
        split_label(store, index)
    ))
}

/// The whole list as copyable text, one line per split, always in
/// chronological order regardless of the configured sort.
pub fn copy_text(store: &SplitStore) -> Result<String, SplitError> {
    let mut out = String::new();
    for index in 0..store.len() {
        out.push_str(&timestamp_line(store, index)?);
        out.push('\n');
    }
    Ok(out)
}

/// Chronological indices in display order for the given sort.
pub fn display_order(len: usize, sort: SortState) -> Vec<usize> {
    match sort {
        SortState::Chron => (0..len).collect(),
        SortState::RevChron => (0..len).rev().collect(),
    }
}
