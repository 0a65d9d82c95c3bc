use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Whether the split clock is currently running.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunningState {
    Stopped,
    Running,
}

impl Default for RunningState {
    fn default() -> Self {
        RunningState::Stopped
    }
}

/// A single recorded split: its timestamp, an optional description, and an
/// optional whole-second correction for a mistimed capture.
///
/// The serialized field names (`value`, `label`, `offsetSeconds`) are the
/// canonical snapshot format; changing them invalidates persisted history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavedTime {
    pub value: DateTime<Utc>,
    pub label: Option<String>,
    pub offset_seconds: Option<i64>,
}

impl SavedTime {
    pub fn new(value: DateTime<Utc>) -> Self {
        Self {
            value,
            label: None,
            offset_seconds: None,
        }
    }

    pub fn with_label(value: DateTime<Utc>, label: impl Into<String>) -> Self {
        Self {
            value,
            label: Some(label.into()),
            offset_seconds: None,
        }
    }

    /// The split's corrected instant: `value` plus the offset, if any.
    ///
    /// This is the externally meaningful timestamp. `value` is an internal
    /// anchor that repairs may shift as long as the adjusted time holds.
    pub fn adjusted_time(&self) -> DateTime<Utc> {
        self.value + Duration::seconds(self.offset_seconds.unwrap_or(0))
    }

    /// Move `value` by `delta_seconds` and compensate the offset in the
    /// opposite direction so the adjusted time is unchanged. Whole seconds
    /// only, so the offset stays integral.
    pub(crate) fn shift_value_keep_adjusted(&mut self, delta_seconds: i64) {
        if delta_seconds == 0 {
            return;
        }
        self.value += Duration::seconds(delta_seconds);
        self.offset_seconds = Some(self.offset_seconds.unwrap_or(0) - delta_seconds);
    }
}
