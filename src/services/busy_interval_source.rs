//! External collaborator interface (C6): yields a user's committed intervals.
//! The ORM-backed task table lives outside this crate, so the collaborator is
//! expressed as a trait; `InMemoryBusyIntervalSource` is the deterministic
//! stand-in used by tests and by hosts that want to inject a precomputed list.

use chrono::{DateTime, FixedOffset};

use crate::error::AppResult;

/// One committed interval on a user's calendar.
pub type BusyInterval = (DateTime<FixedOffset>, DateTime<FixedOffset>);

pub trait BusyIntervalSource {
    /// All non-completed busy intervals for `user_id`, in no particular order.
    fn busy_intervals(&self, user_id: i64) -> AppResult<Vec<BusyInterval>>;
}

/// Deterministic in-memory implementation: one flat list per user, set up
/// ahead of time by the caller rather than read from a live store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBusyIntervalSource {
    intervals_by_user: std::collections::HashMap<i64, Vec<BusyInterval>>,
}

impl InMemoryBusyIntervalSource {
    pub fn new() -> Self {
        InMemoryBusyIntervalSource::default()
    }

    pub fn insert(&mut self, user_id: i64, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) {
        self.intervals_by_user
            .entry(user_id)
            .or_default()
            .push((start, end));
    }

    /// Derives an interval from a due date and duration when no explicit
    /// start/end was recorded: the due date (at midnight if it carries no
    /// time component) becomes the start, `start + duration` the end.
    pub fn insert_from_due_date(
        &mut self,
        user_id: i64,
        due_date: DateTime<FixedOffset>,
        duration_minutes: i64,
    ) -> AppResult<()> {
        let end = crate::services::schedule_utils::add_minutes(due_date, duration_minutes)?;
        self.insert(user_id, due_date, end);
        Ok(())
    }
}

impl BusyIntervalSource for InMemoryBusyIntervalSource {
    fn busy_intervals(&self, user_id: i64) -> AppResult<Vec<BusyInterval>> {
        Ok(self
            .intervals_by_user
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(0).unwrap();
        offset.with_ymd_and_hms(y, m, d, h, mi, 0).unwrap()
    }

    #[test]
    fn unknown_user_returns_empty_list() {
        let source = InMemoryBusyIntervalSource::new();
        assert!(source.busy_intervals(99).unwrap().is_empty());
    }

    #[test]
    fn inserted_intervals_are_returned_for_their_user_only() {
        let mut source = InMemoryBusyIntervalSource::new();
        source.insert(1, dt(2025, 11, 27, 10, 0), dt(2025, 11, 27, 11, 0));
        source.insert(2, dt(2025, 11, 27, 12, 0), dt(2025, 11, 27, 13, 0));

        let intervals = source.busy_intervals(1).unwrap();
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].0, dt(2025, 11, 27, 10, 0));
    }

    #[test]
    fn insert_from_due_date_derives_end_from_duration() {
        let mut source = InMemoryBusyIntervalSource::new();
        let due = dt(2025, 11, 27, 0, 0);
        source.insert_from_due_date(1, due, 90).unwrap();
        let intervals = source.busy_intervals(1).unwrap();
        assert_eq!(intervals[0], (due, dt(2025, 11, 27, 1, 30)));
    }
}
