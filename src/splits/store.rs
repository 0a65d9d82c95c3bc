use chrono::{DateTime, Duration, Utc};

use crate::error::SplitError;

use super::model::{RunningState, SavedTime};

/// The ordered list of splits and the running state.
///
/// The list is owned exclusively by the store: `times()` hands out a copy,
/// and every change goes through a store operation. The first split is the
/// reference point for all diff calculations.
#[derive(Debug, Clone, Default)]
pub struct SplitStore {
    times: Vec<SavedTime>,
    running_state: RunningState,
}

impl SplitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the split list. Mutations on the copy never reach the store.
    pub fn times(&self) -> Vec<SavedTime> {
        self.times.clone()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SavedTime> {
        self.times.get(index)
    }

    pub fn running_state(&self) -> RunningState {
        self.running_state
    }

    pub fn set_running_state(&mut self, state: RunningState) {
        self.running_state = state;
    }

    /// The earliest split in the list, the reference point for diffs.
    pub fn start_time(&self) -> Option<&SavedTime> {
        self.times.first()
    }

    /// The most recent split in the list.
    pub fn latest_time(&self) -> Option<&SavedTime> {
        self.times.last()
    }

    /// Append a split to the end of the list. No ordering is enforced here;
    /// chronological placement is `insert_time`'s job.
    pub fn add_time(&mut self, time: SavedTime) {
        self.times.push(time);
    }

    /// Remove and return the split at `index`.
    ///
    /// An out-of-range index is an explicit error rather than a silent no-op.
    pub fn delete_time(&mut self, index: usize) -> Result<SavedTime, SplitError> {
        if index >= self.times.len() {
            return Err(SplitError::IndexOutOfRange {
                index,
                len: self.times.len(),
            });
        }
        Ok(self.times.remove(index))
    }

    /// Remove all splits.
    pub fn clear_times(&mut self) {
        self.times.clear();
    }

    /// Replace the whole state at once. Used when a history snapshot or the
    /// persisted resume state is applied.
    pub(crate) fn replace(&mut self, times: Vec<SavedTime>, running_state: RunningState) {
        self.times = times;
        self.running_state = running_state;
    }

    /// Elapsed duration from the start split's adjusted time to `instant`.
    pub fn diff_to(&self, instant: DateTime<Utc>) -> Result<Duration, SplitError> {
        let start = self.start_time().ok_or(SplitError::NoReferencePoint)?;
        Ok(instant - start.adjusted_time())
    }

    /// Elapsed duration from the start split to the given split's adjusted
    /// time.
    pub fn diff_for(&self, time: &SavedTime) -> Result<Duration, SplitError> {
        self.diff_to(time.adjusted_time())
    }

    /// Insert a new split `elapsed_seconds` after the start split's adjusted
    /// time, keeping the list ordered by adjusted time, then repair the
    /// neighbors around the insertion point. Returns the insertion index.
    ///
    /// Repairs shift a neighbor's `value` anchor so its correction interval
    /// does not cross the adjusted time of the split next to it; adjusted
    /// times themselves never move. The ±2 pass covers cascades when three
    /// or more splits land within a second of each other; it is a local
    /// best-effort, not a global re-flow.
    pub fn insert_time(
        &mut self,
        elapsed_seconds: i64,
        label: Option<String>,
        offset_seconds: Option<i64>,
    ) -> Result<usize, SplitError> {
        let start = self.start_time().ok_or(SplitError::NoReferencePoint)?;
        let value = start.adjusted_time() + Duration::seconds(elapsed_seconds);

        let new_time = SavedTime {
            value,
            label,
            offset_seconds,
        };
        let new_adjusted = new_time.adjusted_time();

        let insert_index = self
            .times
            .iter()
            .position(|t| new_adjusted < t.adjusted_time())
            .unwrap_or(self.times.len());

        self.times.insert(insert_index, new_time);

        let p = insert_index as i64;
        for neighbor in [p - 1, p + 1, p - 2, p + 2] {
            self.repair_index(neighbor);
        }

        Ok(insert_index)
    }

    /// Clamp the split at `index` so its `value` anchor stays between the
    /// adjusted times of its immediate neighbors. Out-of-range indices are
    /// skipped so callers can name neighbors that do not exist at list ends.
    fn repair_index(&mut self, index: i64) {
        if index < 0 || index as usize >= self.times.len() {
            return;
        }
        let index = index as usize;

        let prev_adjusted = index
            .checked_sub(1)
            .and_then(|i| self.times.get(i))
            .map(SavedTime::adjusted_time);
        let next_adjusted = self.times.get(index + 1).map(SavedTime::adjusted_time);

        clamp_value_keep_adjusted(&mut self.times[index], prev_adjusted, next_adjusted);
    }
}

/// Clamp a split's `value` between two adjusted-time bounds while keeping
/// its own adjusted time constant. Bounds are inclusive, so zero spacing
/// between adjusted times is allowed. The shift is truncated to whole
/// seconds so the offset stays integral.
fn clamp_value_keep_adjusted(
    time: &mut SavedTime,
    min_bound: Option<DateTime<Utc>>,
    max_bound: Option<DateTime<Utc>>,
) {
    let current = time.value;
    let mut target = current;

    if let Some(min) = min_bound {
        if target < min {
            target = min;
        }
    }
    if let Some(max) = max_bound {
        if target > max {
            target = max;
        }
    }

    if target != current {
        let delta_seconds = (target - current).num_seconds();
        time.shift_value_keep_adjusted(delta_seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn store_with(times: Vec<SavedTime>) -> SplitStore {
        let mut store = SplitStore::new();
        for time in times {
            store.add_time(time);
        }
        store
    }

    #[test]
    fn add_and_accessors() {
        let mut store = SplitStore::new();
        assert!(store.start_time().is_none());
        assert!(store.latest_time().is_none());

        store.add_time(SavedTime::with_label(at(0), "Start"));
        store.add_time(SavedTime::new(at(30)));

        assert_eq!(store.len(), 2);
        assert_eq!(store.start_time().unwrap().value, at(0));
        assert_eq!(store.latest_time().unwrap().value, at(30));
    }

    #[test]
    fn times_returns_a_defensive_copy() {
        let mut store = store_with(vec![SavedTime::new(at(0))]);
        let mut copy = store.times();
        copy.push(SavedTime::new(at(99)));
        copy[0].label = Some("mutated".into());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().label, None);
        store.clear_times();
        assert!(store.is_empty());
    }

    #[test]
    fn delete_time_returns_removed_split() {
        let mut store = store_with(vec![
            SavedTime::with_label(at(0), "Start"),
            SavedTime::with_label(at(10), "Middle"),
            SavedTime::with_label(at(20), "End"),
        ]);

        let removed = store.delete_time(1).unwrap();
        assert_eq!(removed.label.as_deref(), Some("Middle"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().label.as_deref(), Some("End"));
    }

    #[test]
    fn delete_time_out_of_range_is_an_error() {
        let mut store = store_with(vec![SavedTime::new(at(0))]);
        let err = store.delete_time(5).unwrap_err();
        assert!(matches!(
            err,
            SplitError::IndexOutOfRange { index: 5, len: 1 }
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn diff_uses_adjusted_times() {
        let mut start = SavedTime::with_label(at(0), "Start");
        start.offset_seconds = Some(5);
        let store = store_with(vec![start]);

        // 65 seconds after the start split's adjusted time
        let mut split = SavedTime::new(at(72));
        split.offset_seconds = Some(-2);
        let diff = store.diff_for(&split).unwrap();
        assert_eq!(diff.num_seconds(), 65);
    }

    #[test]
    fn diff_on_empty_store_fails_loud() {
        let store = SplitStore::new();
        assert!(matches!(
            store.diff_to(at(10)),
            Err(SplitError::NoReferencePoint)
        ));
    }

    #[test]
    fn insert_on_empty_store_fails_loud() {
        let mut store = SplitStore::new();
        assert!(matches!(
            store.insert_time(10, None, None),
            Err(SplitError::NoReferencePoint)
        ));
    }

    #[test]
    fn insert_keeps_adjusted_time_order() {
        let mut store = store_with(vec![
            SavedTime::with_label(at(0), "Start"),
            SavedTime::new(at(60)),
            SavedTime::new(at(120)),
        ]);

        let index = store.insert_time(90, Some("Between".into()), None).unwrap();
        assert_eq!(index, 2);

        let adjusted: Vec<_> = store.times().iter().map(SavedTime::adjusted_time).collect();
        let mut sorted = adjusted.clone();
        sorted.sort();
        assert_eq!(adjusted, sorted);
        assert_eq!(store.get(2).unwrap().label.as_deref(), Some("Between"));
    }

    #[test]
    fn insert_after_everything_goes_last() {
        let mut store = store_with(vec![SavedTime::new(at(0)), SavedTime::new(at(10))]);
        let index = store.insert_time(50, None, None).unwrap();
        assert_eq!(index, 2);
        assert_eq!(store.latest_time().unwrap().value, at(50));
    }

    #[test]
    fn insert_honors_offset_when_placing() {
        let mut store = store_with(vec![SavedTime::new(at(0)), SavedTime::new(at(100))]);
        // value lands at +120 but the offset pulls the adjusted time to +50,
        // so it belongs before the +100 split
        let index = store.insert_time(120, None, Some(-70)).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn repair_never_moves_adjusted_times() {
        let mut left = SavedTime::new(at(10));
        left.offset_seconds = Some(25); // correction interval [10, 35]
        let mut store = store_with(vec![SavedTime::new(at(0)), left, SavedTime::new(at(60))]);

        let before: Vec<_> = store.times().iter().map(SavedTime::adjusted_time).collect();
        store.insert_time(20, None, None).unwrap();
        let after: Vec<_> = store
            .times()
            .iter()
            .filter(|t| t.adjusted_time() != at(20))
            .map(SavedTime::adjusted_time)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn repair_clamps_value_to_neighbor_adjusted_times() {
        // Split whose raw value sits well before its adjusted time: the
        // correction interval [0s, 40s] would swallow an insertion at 20s.
        let mut wide = SavedTime::new(at(0));
        wide.offset_seconds = Some(40);
        let mut store = store_with(vec![SavedTime::with_label(at(0), "Start"), wide]);

        store.insert_time(20, None, None).unwrap();

        let times = store.times();
        // order by adjusted time: start (0), inserted (20), wide (40)
        assert_eq!(times[1].adjusted_time(), at(20));
        let repaired = &times[2];
        assert_eq!(repaired.adjusted_time(), at(40));
        // its value anchor was pulled up to the inserted neighbor's adjusted time
        assert_eq!(repaired.value, at(20));
        assert_eq!(repaired.offset_seconds, Some(20));
    }

    #[test]
    fn repair_invariant_holds_for_direct_neighbors() {
        let mut a = SavedTime::new(at(0));
        a.offset_seconds = Some(8);
        let mut b = SavedTime::new(at(3));
        b.offset_seconds = Some(12);
        let mut store = store_with(vec![SavedTime::new(at(-30)), a, b]);

        store.insert_time(40, None, None).unwrap();
        store.insert_time(10, None, None).unwrap();

        let times = store.times();
        for pair in times.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            assert!(left.adjusted_time() <= right.adjusted_time());
            // the right anchor never crosses left's adjusted time (and the
            // symmetric case for negative offsets)
            let (lo, hi) = if right.value <= right.adjusted_time() {
                (right.value, right.adjusted_time())
            } else {
                (right.adjusted_time(), right.value)
            };
            assert!(lo >= left.adjusted_time() || hi <= left.adjusted_time());
        }
    }

    #[test]
    fn zero_width_overlap_is_allowed() {
        let mut store = store_with(vec![SavedTime::new(at(0)), SavedTime::new(at(10))]);
        // inserting exactly on an existing adjusted time places it after
        let index = store.insert_time(10, None, None).unwrap();
        assert_eq!(index, 2);
    }
}
