//! Slot Suggestion Engine (C7): case-specific window selection, candidate
//! enumeration, universal filtering, BN scoring, and pagination.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Timelike};

use crate::error::AppResult;
use crate::models::intent::{TaskType, TimeOfDay};
use crate::models::preferences::UserPreferences;
use crate::models::slot::Slot;
use crate::services::busy_interval_source::BusyInterval;
use crate::services::conflict_detector::has_conflict;
use crate::services::schedule_utils::{same_day, weekend_index};
use crate::services::user_bn_service::UserBnService;

const DURATION_CANDIDATES_MIN: [i64; 5] = [30, 45, 60, 90, 120];
const MIN_LEAD_MINUTES: i64 = 30;
const DEFAULT_STEP_MINUTES: i64 = 15;
const FALLBACK_STEP_MINUTES: i64 = 30;
const DEFAULT_HORIZON_DAYS: i64 = 30;
const MAX_SLOTS_PER_DAY_UNCONSTRAINED: usize = 8;
const MIN_CANDIDATE_POOL: usize = 50;
const POOL_MULTIPLIER: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct SuggestionRequest {
    pub task_type: TaskType,
    pub duration_minutes: Option<i64>,
    pub page: usize,
    pub page_size: usize,
    pub horizon_days: Option<i64>,
    pub step_minutes: Option<i64>,
    pub preferred_start: Option<DateTime<FixedOffset>>,
    pub window_start: Option<DateTime<FixedOffset>>,
    pub window_end: Option<DateTime<FixedOffset>>,
    pub day_start: Option<NaiveTime>,
    pub day_end: Option<NaiveTime>,
    pub explicit_date_requested: bool,
    pub preferred_time_of_day: Option<TimeOfDay>,
    pub explicit_datetime_given: bool,
    pub fixed_time_search: bool,
}

fn is_rest_day(prefs: &UserPreferences, dt: DateTime<FixedOffset>) -> bool {
    prefs.is_rest_day(weekend_index(dt.weekday()))
}

fn work_hour_bounds(
    prefs: &UserPreferences,
    req: &SuggestionRequest,
) -> Option<(NaiveTime, NaiveTime)> {
    if req.explicit_date_requested {
        return None;
    }
    if let (Some(s), Some(e)) = (req.day_start, req.day_end) {
        return Some((s, e));
    }
    if let (Some(s), Some(e)) = (prefs.workday_pref_start, prefs.workday_pref_end) {
        return Some((s, e));
    }
    None
}

fn passes_work_hours(bounds: Option<(NaiveTime, NaiveTime)>, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> bool {
    match bounds {
        Some((lo, hi)) => start.time() >= lo && end.time() <= hi,
        None => true,
    }
}

fn at_time(day: DateTime<FixedOffset>, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    let naive = day.date_naive().and_hms_opt(hour, minute, 0).expect("validated time components");
    DateTime::from_naive_utc_and_offset(naive, *day.offset())
}

/// Generic stepped scan across `[scan_start, scan_end]`, optionally capping
/// how many candidates are kept per calendar day. Stops once `pool_target`
/// candidates have been collected or the window is exhausted.
fn generic_scan(
    scan_start: DateTime<FixedOffset>,
    scan_end: DateTime<FixedOffset>,
    duration_minutes: i64,
    step_minutes: i64,
    cap_per_day: Option<usize>,
    pool_target: usize,
) -> Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let mut candidates = Vec::new();
    if scan_end <= scan_start || step_minutes <= 0 {
        return candidates;
    }

    let mut cursor = scan_start;
    let mut current_day = cursor.date_naive();
    let mut count_today = 0usize;

    while cursor + Duration::minutes(duration_minutes) <= scan_end {
        if cursor.date_naive() != current_day {
            current_day = cursor.date_naive();
            count_today = 0;
        }

        let within_cap = cap_per_day.map(|cap| count_today < cap).unwrap_or(true);
        if within_cap {
            candidates.push((cursor, cursor + Duration::minutes(duration_minutes)));
            count_today += 1;
        }

        if candidates.len() >= pool_target {
            break;
        }
        cursor += Duration::minutes(step_minutes);
    }

    candidates
}

/// Selects the window-path candidates exactly once, per §4.7.
fn generate_candidates(
    req: &SuggestionRequest,
    now: DateTime<FixedOffset>,
    prefs: &UserPreferences,
    horizon_days: i64,
    step_minutes: i64,
    pool_target: usize,
) -> Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let default_duration = req.duration_minutes.unwrap_or(prefs.default_duration_minutes);

    // Path 1: explicit datetime, no duration (Case 2.D).
    if req.explicit_datetime_given {
        if let Some(start) = req.preferred_start {
            return DURATION_CANDIDATES_MIN
                .iter()
                .map(|d| (start, start + Duration::minutes(*d)))
                .collect();
        }
    }

    // Path 2: time-only, no date, no window (Case 2.G).
    if req.preferred_start.is_none()
        && req.window_start.is_none()
        && req.window_end.is_none()
        && req.preferred_time_of_day.is_some()
    {
        let tod = req.preferred_time_of_day.unwrap();
        let mut candidates = Vec::new();
        for day_offset in 0..horizon_days {
            let day = now + Duration::days(day_offset);
            if is_rest_day(prefs, day) && !req.explicit_date_requested {
                continue;
            }
            let start = at_time(day, tod.hour, tod.minute);
            for d in DURATION_CANDIDATES_MIN {
                candidates.push((start, start + Duration::minutes(d)));
            }
            if candidates.len() >= pool_target {
                break;
            }
        }
        return candidates;
    }

    // Path 3: window provided (Case 2.B date-only, Case 2.C vague range).
    if let (Some(window_start), Some(window_end)) = (req.window_start, req.window_end) {
        let start_scan = if same_day(window_start, now) {
            window_start.max(now + Duration::minutes(MIN_LEAD_MINUTES))
        } else {
            window_start
        };
        let end_scan = window_end;

        if let Some(tod) = req.preferred_time_of_day {
            let mut candidates = Vec::new();
            let mut day = start_scan;
            while day <= end_scan {
                let start = at_time(day, tod.hour, tod.minute);
                if start >= start_scan && start + Duration::minutes(default_duration) <= end_scan {
                    candidates.push((start, start + Duration::minutes(default_duration)));
                }
                day += Duration::days(1);
                if candidates.len() >= pool_target {
                    break;
                }
            }
            return candidates;
        }

        return generic_scan(start_scan, end_scan, default_duration, step_minutes, None, pool_target);
    }

    // Path 4: preferred start anchor with a known duration.
    if let Some(anchor) = req.preferred_start {
        let scan_start = anchor - Duration::hours(2);
        let scan_end = anchor + Duration::days(7);
        return generic_scan(scan_start, scan_end, default_duration, step_minutes, None, pool_target);
    }

    // Path 5: nothing constrained ("Duration Only").
    if req.window_start.is_none() && req.window_end.is_none() && req.preferred_start.is_none() {
        let scan_start = now + Duration::minutes(MIN_LEAD_MINUTES);
        let scan_end = now + Duration::days(horizon_days);
        return generic_scan(
            scan_start,
            scan_end,
            default_duration,
            DEFAULT_STEP_MINUTES,
            Some(MAX_SLOTS_PER_DAY_UNCONSTRAINED),
            pool_target,
        );
    }

    // Path 6: default filled-anchor scan.
    let start_scan = now.max(req.window_start.unwrap_or(now));
    let start_scan = if same_day(start_scan, now) {
        prefs
            .workday_pref_start
            .map(|t| at_time(start_scan, t.hour(), t.minute()).max(start_scan))
            .unwrap_or(start_scan)
    } else {
        start_scan
    };
    let end_scan = req.window_end.unwrap_or(now + Duration::days(horizon_days));
    generic_scan(start_scan, end_scan, default_duration, step_minutes, None, pool_target)
}

fn filter_candidates(
    req: &SuggestionRequest,
    now: DateTime<FixedOffset>,
    prefs: &UserPreferences,
    busy: &[BusyInterval],
    raw: Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)>,
) -> AppResult<Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>, bool)>> {
    let bounds = work_hour_bounds(prefs, req);
    let locked_day = match (req.window_start, req.window_end) {
        (Some(s), Some(e)) if same_day(s, e) => Some(s.date_naive()),
        _ => None,
    };

    let mut kept = Vec::new();
    for (start, end) in raw {
        if start < now + Duration::minutes(MIN_LEAD_MINUTES) {
            continue;
        }
        if let Some(day) = locked_day {
            if start.date_naive() != day {
                continue;
            }
        }
        if is_rest_day(prefs, start) && !req.explicit_date_requested {
            continue;
        }
        if !passes_work_hours(bounds, start, end) {
            continue;
        }
        if has_conflict(start, end, busy)? {
            continue;
        }
        if req.fixed_time_search {
            if let Some(tod) = req.preferred_time_of_day {
                if start.hour() != tod.hour || start.minute() != tod.minute {
                    continue;
                }
            }
        }
        kept.push((start, end, bounds.is_none()));
    }
    Ok(kept)
}

pub fn suggest_slots(
    req: &SuggestionRequest,
    now: DateTime<FixedOffset>,
    prefs: &UserPreferences,
    busy: &[BusyInterval],
    bn: &UserBnService,
) -> AppResult<Vec<Slot>> {
    let horizon_days = req.horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS);
    let page = req.page.max(1);
    let page_size = req.page_size.max(1);
    let pool_target = (page * page_size * POOL_MULTIPLIER).max(MIN_CANDIDATE_POOL);

    let primary_step = req.step_minutes.unwrap_or(DEFAULT_STEP_MINUTES);
    let raw = generate_candidates(req, now, prefs, horizon_days, primary_step, pool_target);
    let mut filtered = filter_candidates(req, now, prefs, busy, raw)?;

    if filtered.is_empty() && primary_step != FALLBACK_STEP_MINUTES {
        let retry_raw = generate_candidates(req, now, prefs, horizon_days, FALLBACK_STEP_MINUTES, pool_target);
        filtered = filter_candidates(req, now, prefs, busy, retry_raw)?;
    }

    let mut scored = Vec::with_capacity(filtered.len());
    for (start, end, exceeds) in filtered {
        let raw_score = bn.predict_slot_score(req.task_type, start, end)?;
        let score = raw_score.round().clamp(0.0, 10.0) as u8;
        scored.push(Slot {
            scheduled_start: start,
            scheduled_end: end,
            score,
            exceeds_work_hours: exceeds,
        });
    }

    scored.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.scheduled_start.cmp(&b.scheduled_start))
    });

    let start_idx = (page - 1) * page_size;
    if start_idx >= scored.len() {
        return Ok(Vec::new());
    }
    let end_idx = (start_idx + page_size).min(scored.len());
    Ok(scored[start_idx..end_idx].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::bn_persistence::BnPersistence;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(0).unwrap();
        offset.with_ymd_and_hms(y, m, d, h, mi, 0).unwrap()
    }

    fn prefs() -> UserPreferences {
        UserPreferences {
            workday_pref_start: Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            workday_pref_end: Some(NaiveTime::from_hms_opt(17, 0, 0).unwrap()),
            focus_peak_start: None,
            focus_peak_end: None,
            days_off: HashSet::from([0, 6]),
            default_duration_minutes: 60,
            flexibility: crate::models::preferences::Flexibility::Medium,
            deadline_behavior: crate::models::preferences::DeadlineBehavior::OnTime,
        }
    }

    fn trained_bn() -> UserBnService {
        let dir = tempfile::tempdir().unwrap();
        let mut bn = UserBnService::new(1, BnPersistence::new(dir.path())).unwrap();
        bn.initialize_from_preferences(&prefs()).unwrap();
        bn
    }

    #[test]
    fn duration_only_path_returns_candidates_within_work_hours() {
        let now = dt(2025, 11, 27, 8, 0); // Thursday
        let bn = trained_bn();
        let req = SuggestionRequest {
            task_type: TaskType::Studies,
            duration_minutes: Some(60),
            page: 1,
            page_size: 5,
            ..Default::default()
        };
        let slots = suggest_slots(&req, now, &prefs(), &[], &bn).unwrap();
        assert!(!slots.is_empty());
        for slot in &slots {
            assert!(!slot.exceeds_work_hours);
            assert_eq!(
                (slot.scheduled_end - slot.scheduled_start).num_minutes(),
                60
            );
        }
    }

    #[test]
    fn locked_window_never_emits_outside_the_day() {
        let now = dt(2025, 11, 27, 8, 0);
        let bn = trained_bn();
        let window_start = dt(2025, 11, 28, 0, 0);
        let window_end = dt(2025, 11, 28, 23, 59);
        let req = SuggestionRequest {
            task_type: TaskType::Meeting,
            duration_minutes: Some(30),
            page: 1,
            page_size: 10,
            window_start: Some(window_start),
            window_end: Some(window_end),
            ..Default::default()
        };
        let slots = suggest_slots(&req, now, &prefs(), &[], &bn).unwrap();
        for slot in &slots {
            assert_eq!(slot.scheduled_start.date_naive(), window_start.date_naive());
        }
    }

    #[test]
    fn busy_interval_excludes_overlapping_candidate() {
        let now = dt(2025, 11, 27, 8, 0);
        let bn = trained_bn();
        let window_start = dt(2025, 11, 28, 9, 0);
        let window_end = dt(2025, 11, 28, 10, 0);
        let busy = vec![(dt(2025, 11, 28, 9, 0), dt(2025, 11, 28, 10, 0))];
        let req = SuggestionRequest {
            task_type: TaskType::Meeting,
            duration_minutes: Some(60),
            page: 1,
            page_size: 5,
            window_start: Some(window_start),
            window_end: Some(window_end),
            ..Default::default()
        };
        let slots = suggest_slots(&req, now, &prefs(), &busy, &bn).unwrap();
        assert!(slots.is_empty());
    }
}
