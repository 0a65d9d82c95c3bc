use serde::{Deserialize, Serialize};

use crate::error::HistoryError;
use crate::splits::{RunningState, SavedTime};

/// An immutable capture of the full split list and running state.
///
/// The canonical string form is `serde_json` with the struct's declared
/// field order (`times`, then `runningState`), which makes two snapshots
/// equal exactly when their canonical strings are byte-identical. The same
/// string is what gets persisted, so decoding revives typed values: each
/// `value` becomes a `DateTime<Utc>`, `runningState` becomes the enum, and
/// every array element becomes a `SavedTime` with its behavior attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    times: Vec<SavedTime>,
    running_state: RunningState,
}

impl HistorySnapshot {
    pub fn capture(times: Vec<SavedTime>, running_state: RunningState) -> Self {
        Self {
            times,
            running_state,
        }
    }

    pub fn times(&self) -> &[SavedTime] {
        &self.times
    }

    pub fn running_state(&self) -> RunningState {
        self.running_state
    }

    pub fn into_parts(self) -> (Vec<SavedTime>, RunningState) {
        (self.times, self.running_state)
    }

    pub fn to_canonical_json(&self) -> Result<String, HistoryError> {
        serde_json::to_string(self).map_err(HistoryError::Serialize)
    }

    /// Revive a canonical string into a typed snapshot. Fails as a whole on
    /// malformed input; nothing is partially applied.
    pub fn from_canonical_json(raw: &str) -> Result<Self, HistoryError> {
        serde_json::from_str(raw).map_err(HistoryError::CorruptSnapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample() -> HistorySnapshot {
        let mut second = SavedTime::new(at(65));
        second.offset_seconds = Some(-5);
        HistorySnapshot::capture(
            vec![SavedTime::with_label(at(0), "Start"), second],
            RunningState::Running,
        )
    }

    #[test]
    fn canonical_form_round_trips_typed_values() {
        let snapshot = sample();
        let raw = snapshot.to_canonical_json().unwrap();
        let revived = HistorySnapshot::from_canonical_json(&raw).unwrap();

        assert_eq!(revived, snapshot);
        assert_eq!(revived.running_state(), RunningState::Running);
        // behavior survives revival, not just data
        assert_eq!(revived.times()[1].adjusted_time(), at(60));
    }

    #[test]
    fn equal_states_serialize_byte_identically() {
        let a = sample().to_canonical_json().unwrap();
        let b = sample().to_canonical_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_states_serialize_differently() {
        let a = sample();
        let mut b = sample();
        b.running_state = RunningState::Stopped;
        assert_ne!(
            a.to_canonical_json().unwrap(),
            b.to_canonical_json().unwrap()
        );
    }

    #[test]
    fn corrupt_input_is_rejected_whole() {
        let err = HistorySnapshot::from_canonical_json("{\"times\": [{\"va").unwrap_err();
        assert!(matches!(err, HistoryError::CorruptSnapshot(_)));

        // schema mismatch, not just truncation
        let err =
            HistorySnapshot::from_canonical_json("{\"times\":[],\"runningState\":\"paused\"}")
                .unwrap_err();
        assert!(matches!(err, HistoryError::CorruptSnapshot(_)));
    }
}
