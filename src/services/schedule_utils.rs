use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Timelike};
use serde_json::json;

use crate::error::{AppError, AppResult};

pub fn parse_datetime(value: &str) -> AppResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|err| {
        AppError::validation_with_details(
            "invalid datetime format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn parse_optional_datetime(value: Option<&String>) -> AppResult<Option<DateTime<FixedOffset>>> {
    match value {
        Some(raw) => Ok(Some(parse_datetime(raw)?)),
        None => Ok(None),
    }
}

pub fn format_datetime(dt: DateTime<FixedOffset>) -> String {
    dt.to_rfc3339()
}

pub fn add_minutes(dt: DateTime<FixedOffset>, minutes: i64) -> AppResult<DateTime<FixedOffset>> {
    dt.checked_add_signed(Duration::minutes(minutes))
        .ok_or_else(|| AppError::validation("datetime arithmetic overflowed"))
}

pub fn duration_minutes(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> AppResult<i64> {
    let total = end.signed_duration_since(start).num_minutes();
    if total < 0 {
        Err(AppError::validation("end must be after start"))
    } else {
        Ok(total)
    }
}

/// Non-strict overlap: sharing only an endpoint is not a conflict.
pub fn overlaps(
    a_start: DateTime<FixedOffset>,
    a_end: DateTime<FixedOffset>,
    b_start: DateTime<FixedOffset>,
    b_end: DateTime<FixedOffset>,
) -> AppResult<bool> {
    if a_end <= a_start {
        return Err(AppError::validation("invalid interval"));
    }
    if b_end <= b_start {
        return Err(AppError::validation("invalid interval"));
    }
    Ok(a_start < b_end && b_start < a_end)
}

pub fn ensure_window(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> AppResult<()> {
    if end <= start {
        Err(AppError::validation("window end must be after start"))
    } else {
        Ok(())
    }
}

pub fn minutes_from_midnight(time: NaiveTime) -> i64 {
    (time.hour() as i64) * 60 + (time.minute() as i64)
}

pub fn clamp_time_to_window(
    current: DateTime<FixedOffset>,
    window_start: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    if current < window_start {
        window_start
    } else {
        current
    }
}

pub fn midnight_minutes_of(dt: DateTime<FixedOffset>) -> i64 {
    let time = dt.time();
    (time.hour() as i64) * 60 + (time.minute() as i64)
}

pub fn same_day(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>) -> bool {
    a.date_naive() == b.date_naive()
}

pub fn to_naive_time(total_minutes: u32) -> NaiveTime {
    let hours = (total_minutes / 60) as u32;
    let minutes = total_minutes % 60;
    NaiveTime::from_hms_opt(hours, minutes, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).expect("00:00 must be valid"))
}

/// Next occurrence of `weekday` strictly after `from` (never the same day).
pub fn next_weekday_after(
    from: DateTime<FixedOffset>,
    weekday: chrono::Weekday,
) -> DateTime<FixedOffset> {
    let mut candidate = from.date_naive() + Duration::days(1);
    while candidate.weekday() != weekday {
        candidate += Duration::days(1);
    }
    let time = from.time();
    DateTime::from_naive_utc_and_offset(candidate.and_time(time), *from.offset())
}

/// 0 = Sunday .. 6 = Saturday, the convention this crate standardizes on.
pub fn weekend_index(weekday: chrono::Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
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
    fn overlap_detects_shared_interior() {
        let a_start = dt(2025, 11, 27, 10, 0);
        let a_end = dt(2025, 11, 27, 11, 0);
        let b_start = dt(2025, 11, 27, 10, 30);
        let b_end = dt(2025, 11, 27, 11, 30);
        assert!(overlaps(a_start, a_end, b_start, b_end).unwrap());
    }

    #[test]
    fn adjacency_is_not_overlap() {
        let a_start = dt(2025, 11, 27, 10, 0);
        let a_end = dt(2025, 11, 27, 11, 0);
        let b_start = dt(2025, 11, 27, 11, 0);
        let b_end = dt(2025, 11, 27, 12, 0);
        assert!(!overlaps(a_start, a_end, b_start, b_end).unwrap());
    }

    #[test]
    fn weekend_index_matches_sunday_zero_convention() {
        assert_eq!(weekend_index(chrono::Weekday::Sun), 0);
        assert_eq!(weekend_index(chrono::Weekday::Sat), 6);
        assert_eq!(weekend_index(chrono::Weekday::Mon), 1);
    }

    #[test]
    fn next_weekday_after_never_returns_same_day() {
        let thursday = dt(2025, 11, 27, 10, 0);
        let next_thursday = next_weekday_after(thursday, chrono::Weekday::Thu);
        assert_eq!(next_thursday.date_naive(), dt(2025, 12, 4, 10, 0).date_naive());
    }
}
