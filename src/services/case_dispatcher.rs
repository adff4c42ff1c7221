//! Case Dispatcher (C9): decides, from a parsed intent, whether to create a
//! task directly or hand off to the suggestion engine, and carries the
//! conflict/preferences-missing business outcomes back to the caller.
//!
//! Case 4 (date + time, no duration) and Case 2.A (all three present) both
//! short-circuit to direct creation; everything else falls through to C7.
//! The suggestion engine also knows how to enumerate duration candidates for
//! an explicit datetime with no duration (Case 2.D) — that path only matters
//! when C7 is called standalone, since the dispatcher always resolves a
//! missing duration itself before C7 would ever see it.

use chrono::{DateTime, FixedOffset, NaiveTime};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::intent::Intent;
use crate::models::preferences::UserPreferences;
use crate::models::slot::Slot;
use crate::models::task::Task;
use crate::services::busy_interval_source::BusyInterval;
use crate::services::conflict_detector::find_conflicts;
use crate::services::schedule_utils::add_minutes;
use crate::services::slot_suggestion_engine::{suggest_slots, SuggestionRequest};
use crate::services::user_bn_service::UserBnService;

/// Result of dispatching a parsed intent.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    PreferencesRequired,
    Created {
        task: Task,
    },
    Conflict {
        intent: Intent,
        conflicts: Vec<BusyInterval>,
    },
    Suggestions {
        suggestions: Vec<Slot>,
    },
}

/// Coarse part-of-day hint independent of the parser's numeric time patterns.
/// Grounded in the original route handler's own day-window helper.
pub fn infer_day_window(text: &str) -> Option<(NaiveTime, NaiveTime)> {
    let lower = text.to_lowercase();
    let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();

    if lower.contains("morning") {
        Some((hm(6, 0), hm(12, 0)))
    } else if lower.contains("afternoon") {
        Some((hm(12, 0), hm(17, 0)))
    } else if lower.contains("evening") {
        Some((hm(17, 0), hm(21, 0)))
    } else if lower.contains("night") {
        Some((hm(21, 0), hm(23, 59)))
    } else {
        None
    }
}

fn new_task(user_id: i64, intent: &Intent, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Task {
    Task {
        id: Uuid::new_v4(),
        user_id,
        title: intent.title.clone(),
        task_type: intent.task_type,
        priority: intent.priority,
        scheduled_start: start,
        scheduled_end: end,
    }
}

/// Direct-create path shared by Case 4 and Case 2.A: derive `[start, end]`
/// from the intent and a resolved duration, check for conflicts, and either
/// create the task or report the conflict.
fn create_or_conflict(
    user_id: i64,
    intent: &Intent,
    start: DateTime<FixedOffset>,
    duration_minutes: i64,
    busy: &[BusyInterval],
) -> AppResult<DispatchOutcome> {
    let end = add_minutes(start, duration_minutes)?;
    let conflicts = find_conflicts(start, end, busy)?;
    if !conflicts.is_empty() {
        return Ok(DispatchOutcome::Conflict {
            intent: intent.clone(),
            conflicts,
        });
    }
    Ok(DispatchOutcome::Created {
        task: new_task(user_id, intent, start, end),
    })
}

/// Entry point: given a parsed intent, the user's BN, preferences, and the
/// user's current busy intervals, decide the outcome per §4.9's four steps.
pub fn dispatch(
    user_id: i64,
    intent: &Intent,
    source_text: &str,
    bn: &UserBnService,
    prefs: &UserPreferences,
    now: DateTime<FixedOffset>,
    busy: &[BusyInterval],
) -> AppResult<DispatchOutcome> {
    if !bn.is_trained() {
        return Ok(DispatchOutcome::PreferencesRequired);
    }

    let cf = intent.critical_fields;

    // Case 4: date + time, no duration -> use the user's default duration.
    if cf.has_date && cf.has_time && !cf.has_duration {
        if let Some(start) = intent.due_date_time {
            return create_or_conflict(user_id, intent, start, prefs.default_duration_minutes, busy);
        }
    }

    // Case 2.A: all three critical fields present.
    if cf.all_present {
        if let Some(start) = intent.due_date_time {
            let duration = intent.duration_minutes.unwrap_or(prefs.default_duration_minutes);
            return create_or_conflict(user_id, intent, start, duration, busy);
        }
    }

    // Otherwise: hand off to the suggestion engine with whatever constraints
    // the intent carries.
    let duration_minutes = intent.duration_minutes.or(Some(prefs.default_duration_minutes));
    let (day_start, day_end) = infer_day_window(source_text)
        .map(|(s, e)| (Some(s), Some(e)))
        .unwrap_or((None, None));
    let fixed_time_search =
        !cf.has_date && cf.has_duration && intent.preferred_time_of_day.is_some();

    let req = SuggestionRequest {
        task_type: intent.task_type,
        duration_minutes,
        page: 1,
        page_size: 3,
        horizon_days: Some(if fixed_time_search { 30 } else { 21 }),
        step_minutes: None,
        preferred_start: intent.due_date_time,
        window_start: intent.window_start,
        window_end: intent.window_end,
        day_start,
        day_end,
        explicit_date_requested: intent.explicit_date_requested,
        preferred_time_of_day: intent.preferred_time_of_day,
        explicit_datetime_given: intent.explicit_date_time_given,
        fixed_time_search,
    };

    let suggestions = suggest_slots(&req, now, prefs, busy, bn)?;
    Ok(DispatchOutcome::Suggestions { suggestions })
}

/// Re-runs C8 on a user-chosen suggestion and creates the task if it is
/// still free, per §4.9's "on explicit user selection" clause.
pub fn create_from_suggestion(
    user_id: i64,
    intent: &Intent,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    busy: &[BusyInterval],
) -> AppResult<DispatchOutcome> {
    let conflicts = find_conflicts(start, end, busy)?;
    if !conflicts.is_empty() {
        return Ok(DispatchOutcome::Conflict {
            intent: intent.clone(),
            conflicts,
        });
    }
    Ok(DispatchOutcome::Created {
        task: new_task(user_id, intent, start, end),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::intent::{Priority, TaskType};
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
            default_duration_minutes: 45,
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

    fn base_intent() -> Intent {
        let mut intent = Intent::new("team sync");
        intent.task_type = TaskType::Meeting;
        intent.priority = Priority::Medium;
        intent
    }

    #[test]
    fn untrained_bn_requires_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let bn = UserBnService::new(1, BnPersistence::new(dir.path())).unwrap();
        let intent = base_intent();
        let outcome = dispatch(1, &intent, "meeting tomorrow", &bn, &prefs(), dt(2025, 11, 27, 8, 0), &[]).unwrap();
        assert!(matches!(outcome, DispatchOutcome::PreferencesRequired));
    }

    #[test]
    fn case_4_date_time_no_duration_creates_with_default_duration() {
        let bn = trained_bn();
        let mut intent = base_intent();
        intent.due_date_time = Some(dt(2025, 11, 28, 14, 0));
        intent.finalize();
        assert!(!intent.critical_fields.has_duration);

        let outcome = dispatch(1, &intent, "meeting nov 28 at 2pm", &bn, &prefs(), dt(2025, 11, 27, 8, 0), &[]).unwrap();
        match outcome {
            DispatchOutcome::Created { task } => {
                assert_eq!(task.scheduled_start, dt(2025, 11, 28, 14, 0));
                assert_eq!(task.scheduled_end, dt(2025, 11, 28, 14, 45));
            }
            other => panic!("expected Created, got {other:?}"),
        }
    }

    #[test]
    fn case_2a_all_present_conflicts_when_overlapping_busy_interval() {
        let bn = trained_bn();
        let mut intent = base_intent();
        intent.due_date_time = Some(dt(2025, 11, 28, 14, 0));
        intent.duration_minutes = Some(60);
        intent.finalize();
        assert!(intent.critical_fields.all_present);

        let busy = vec![(dt(2025, 11, 28, 14, 30), dt(2025, 11, 28, 15, 0))];
        let outcome = dispatch(1, &intent, "meeting nov 28 at 2pm for an hour", &bn, &prefs(), dt(2025, 11, 27, 8, 0), &busy).unwrap();
        assert!(matches!(outcome, DispatchOutcome::Conflict { .. }));
    }

    #[test]
    fn missing_duration_and_date_falls_through_to_suggestions() {
        let bn = trained_bn();
        let intent = base_intent();
        let outcome = dispatch(1, &intent, "schedule a meeting", &bn, &prefs(), dt(2025, 11, 27, 8, 0), &[]).unwrap();
        assert!(matches!(outcome, DispatchOutcome::Suggestions { .. }));
    }

    #[test]
    fn morning_in_text_is_detected_as_a_day_window_hint() {
        assert_eq!(
            infer_day_window("let's meet in the morning"),
            Some((NaiveTime::from_hms_opt(6, 0, 0).unwrap(), NaiveTime::from_hms_opt(12, 0, 0).unwrap()))
        );
        assert_eq!(infer_day_window("no hint here"), None);
    }
}
