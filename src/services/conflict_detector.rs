//! Conflict detection (C8): a pure overlap check over a busy-interval list.
//! Used both as a pre-create gate (direct creation) and for post-create
//! reporting; the caller decides what to do with the returned conflicts.

use chrono::{DateTime, FixedOffset};

use crate::error::AppResult;
use crate::services::busy_interval_source::BusyInterval;
use crate::services::schedule_utils::overlaps;

/// Returns every interval in `busy` that overlaps `[start, end]`. Adjacency
/// (sharing only an endpoint) does not count as a conflict.
pub fn find_conflicts(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    busy: &[BusyInterval],
) -> AppResult<Vec<BusyInterval>> {
    let mut conflicts = Vec::new();
    for (b_start, b_end) in busy {
        if overlaps(start, end, *b_start, *b_end)? {
            conflicts.push((*b_start, *b_end));
        }
    }
    Ok(conflicts)
}

pub fn has_conflict(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    busy: &[BusyInterval],
) -> AppResult<bool> {
    Ok(!find_conflicts(start, end, busy)?.is_empty())
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
    fn overlapping_interval_is_reported() {
        let busy = vec![(dt(2025, 11, 27, 10, 0), dt(2025, 11, 27, 11, 0))];
        let conflicts = find_conflicts(dt(2025, 11, 27, 10, 30), dt(2025, 11, 27, 11, 30), &busy).unwrap();
        assert_eq!(conflicts.len(), 1);
    }

    #[test]
    fn adjacent_interval_is_not_a_conflict() {
        let busy = vec![(dt(2025, 11, 27, 10, 0), dt(2025, 11, 27, 11, 0))];
        assert!(!has_conflict(dt(2025, 11, 27, 11, 0), dt(2025, 11, 27, 12, 0), &busy).unwrap());
    }

    #[test]
    fn no_busy_intervals_means_no_conflict() {
        assert!(!has_conflict(dt(2025, 11, 27, 10, 0), dt(2025, 11, 27, 11, 0), &[]).unwrap());
    }
}
