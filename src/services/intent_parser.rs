//! Natural-language intent parser (C1): a pure function of `(text, now)` with
//! no I/O. Each extractor runs independently over the lowercased input and
//! the results are composed into one `Intent`. A malformed time/date token
//! (e.g. hour 25) is simply treated as "not extracted" — this parser never
//! returns an error, matching the "no field ever raises" contract.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::intent::{Intent, Priority, TaskType, TimeOfDay};

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    match name {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" | "sept" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

fn word_number(word: &str) -> Option<i64> {
    match word {
        "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        "nine" => Some(9),
        "ten" => Some(10),
        _ => None,
    }
}

fn ordinal_index(word: &str) -> Option<u32> {
    match word {
        "first" => Some(0),
        "second" => Some(1),
        "third" => Some(2),
        "fourth" => Some(3),
        _ => None,
    }
}

fn valid_time(hour: i64, minute: i64) -> Option<(u32, u32)> {
    if (0..=23).contains(&hour) && (0..=59).contains(&minute) {
        Some((hour as u32, minute as u32))
    } else {
        None
    }
}

// ---------------------------------------------------------------------
// Time extraction — strict priority order, higher wins.
// ---------------------------------------------------------------------

static RE_AT_HMM_AMPM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bat\s+(\d{1,2}):(\d{2})\s*(am|pm)\b").unwrap());
static RE_HMM_AMPM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\s*(am|pm)\b").unwrap());
static RE_AT_H_AMPM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bat\s+(\d{1,2})\s*(am|pm)\b").unwrap());
static RE_H_AMPM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2})\s*(am|pm)\b").unwrap());
static RE_AT_HMM_24H: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bat\s+(\d{1,2}):(\d{2})\b").unwrap());
static RE_BARE_HMM_24H: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").unwrap());
static RE_H_IN_THE_PERIOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\s+in\s+the\s+(morning|afternoon|evening)\b").unwrap());

fn to_24h(hour: i64, meridiem: &str) -> i64 {
    match meridiem {
        "am" => {
            if hour == 12 {
                0
            } else {
                hour
            }
        }
        "pm" => {
            if hour == 12 {
                12
            } else {
                hour + 12
            }
        }
        _ => hour,
    }
}

fn extract_time(text: &str) -> Option<(u32, u32)> {
    if let Some(caps) = RE_AT_HMM_AMPM.captures(text) {
        let hour: i64 = caps[1].parse().ok()?;
        let minute: i64 = caps[2].parse().ok()?;
        return valid_time(to_24h(hour, &caps[3]), minute);
    }
    if let Some(caps) = RE_HMM_AMPM.captures(text) {
        let hour: i64 = caps[1].parse().ok()?;
        let minute: i64 = caps[2].parse().ok()?;
        return valid_time(to_24h(hour, &caps[3]), minute);
    }
    if let Some(caps) = RE_AT_H_AMPM.captures(text) {
        let hour: i64 = caps[1].parse().ok()?;
        return valid_time(to_24h(hour, &caps[2]), 0);
    }
    if let Some(caps) = RE_H_AMPM.captures(text) {
        let hour: i64 = caps[1].parse().ok()?;
        return valid_time(to_24h(hour, &caps[2]), 0);
    }
    if let Some(caps) = RE_AT_HMM_24H.captures(text) {
        let hour: i64 = caps[1].parse().ok()?;
        let minute: i64 = caps[2].parse().ok()?;
        return valid_time(hour, minute);
    }
    if let Some(caps) = RE_BARE_HMM_24H.captures(text) {
        let hour: i64 = caps[1].parse().ok()?;
        let minute: i64 = caps[2].parse().ok()?;
        return valid_time(hour, minute);
    }
    if let Some(caps) = RE_H_IN_THE_PERIOD.captures(text) {
        let hour: i64 = caps[1].parse().ok()?;
        let period = &caps[2];
        let hour24 = match period {
            "morning" => {
                if hour == 12 {
                    0
                } else {
                    hour
                }
            }
            _ => {
                if hour < 12 {
                    hour + 12
                } else {
                    hour
                }
            }
        };
        return valid_time(hour24, 0);
    }
    None
}

// ---------------------------------------------------------------------
// Time-range extraction.
// ---------------------------------------------------------------------

static RE_TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*(?:-|to|until)\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b",
    )
    .unwrap()
});

fn extract_time_range(text: &str) -> Option<((u32, u32), i64)> {
    let caps = RE_TIME_RANGE.captures(text)?;
    let start_hour: i64 = caps.get(1)?.as_str().parse().ok()?;
    let start_minute: i64 = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    let end_hour: i64 = caps.get(4)?.as_str().parse().ok()?;
    let end_minute: i64 = caps
        .get(5)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    let start_meridiem = caps.get(3).map(|m| m.as_str());
    let end_meridiem = caps.get(6).map(|m| m.as_str());

    let start_hour_24 = match start_meridiem.or(end_meridiem) {
        Some(period) => to_24h(start_hour, period),
        None => start_hour,
    };
    let end_hour_24 = match end_meridiem.or(start_meridiem) {
        Some(period) => to_24h(end_hour, period),
        None => end_hour,
    };

    let (start_h, start_m) = valid_time(start_hour_24, start_minute)?;
    let (end_h, end_m) = valid_time(end_hour_24, end_minute)?;

    let start_total = start_h as i64 * 60 + start_m as i64;
    let mut end_total = end_h as i64 * 60 + end_m as i64;
    if end_total <= start_total {
        end_total += 24 * 60;
    }
    let duration = end_total - start_total;
    if !(1..=1440).contains(&duration) {
        return None;
    }
    Some(((start_h, start_m), duration))
}

// ---------------------------------------------------------------------
// Duration extraction.
// ---------------------------------------------------------------------

static RE_AND_A_HALF_HOURS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+)\s+and\s+a\s+half\s+hours?\b").unwrap());
static RE_ONE_AND_A_HALF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:an|one)\s+and\s+a\s+half\s+hours?\b").unwrap());
static RE_HOUR_AND_MINUTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:one|an)\s+hour\s+and\s+(\d+|fifteen|thirty|forty-five)\s+minutes?\b").unwrap()
});
static RE_FRACTIONAL_HOURS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+\.\d+)\s+hours?\b").unwrap());
static RE_FOR_N_MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:for|lasting|about)\s+(\d+)\s+minutes?\b").unwrap());
static RE_FOR_N_HOURS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:for|lasting|about)\s+(\d+)\s+hours?\b").unwrap());
static RE_FOR_WORD_HOURS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bfor\s+(one|two|three|four|five|six|seven|eight|nine|ten)\s+hours?\b").unwrap()
});
static RE_LASTING_AN_HOUR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\blasting\s+an\s+hour\b").unwrap());
static RE_BARE_MINUTES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\s+minutes?\b").unwrap());
static RE_BARE_HOURS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\s+hours?\b").unwrap());

fn minute_word(word: &str) -> Option<i64> {
    match word {
        "fifteen" => Some(15),
        "thirty" => Some(30),
        "forty-five" => Some(45),
        _ => word.parse().ok(),
    }
}

fn extract_duration_minutes(text: &str) -> Option<i64> {
    if let Some(caps) = RE_AND_A_HALF_HOURS.captures(text) {
        let hours: i64 = caps[1].parse().ok()?;
        return Some(hours * 60 + 30);
    }
    if RE_ONE_AND_A_HALF.is_match(text) {
        return Some(90);
    }
    if let Some(caps) = RE_HOUR_AND_MINUTES.captures(text) {
        let minutes = minute_word(&caps[1])?;
        return Some(60 + minutes);
    }
    if let Some(caps) = RE_FRACTIONAL_HOURS.captures(text) {
        let hours: f64 = caps[1].parse().ok()?;
        return Some((hours * 60.0).round() as i64);
    }
    if let Some(caps) = RE_FOR_N_MINUTES.captures(text) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = RE_FOR_N_HOURS.captures(text) {
        let hours: i64 = caps[1].parse().ok()?;
        return Some(hours * 60);
    }
    if let Some(caps) = RE_FOR_WORD_HOURS.captures(text) {
        let hours = word_number(&caps[1])?;
        return Some(hours * 60);
    }
    if RE_LASTING_AN_HOUR.is_match(text) {
        return Some(60);
    }
    if let Some(caps) = RE_BARE_MINUTES.captures(text) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = RE_BARE_HOURS.captures(text) {
        let hours: i64 = caps[1].parse().ok()?;
        return Some(hours * 60);
    }
    None
}

// ---------------------------------------------------------------------
// Priority and task type.
// ---------------------------------------------------------------------

static RE_HIGH_PRIORITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(high|urgent|critical)\b(?:\s+priority)?").unwrap());
static RE_LOW_PRIORITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\blow\b(?:\s+priority)?").unwrap());
static RE_MEDIUM_PRIORITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bmedium\b(?:\s+priority)?").unwrap());

fn extract_priority(text: &str) -> Priority {
    if RE_HIGH_PRIORITY.is_match(text) {
        Priority::High
    } else if RE_LOW_PRIORITY.is_match(text) {
        Priority::Low
    } else if RE_MEDIUM_PRIORITY.is_match(text) {
        Priority::Medium
    } else {
        Priority::Medium
    }
}

const STUDIES_KEYWORDS: [&str; 13] = [
    "study", "studies", "homework", "reading", "research", "exam", "test", "lecture", "class",
    "course", "presentation", "project", "brainstorming",
];
const STUDIES_KEYWORD_REVIEW: &str = "review";
const TRAINING_KEYWORDS: [&str; 6] = ["workout", "exercise", "gym", "run", "running", "jogging"];
const TRAINING_KEYWORD_TRAINING: &str = "training";
const MEETING_KEYWORDS: [&str; 4] = ["meeting", "meet", "call", "appointment"];

fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric()).any(|token| token == word)
}

fn extract_task_type(text: &str) -> TaskType {
    if STUDIES_KEYWORDS.iter().any(|kw| contains_word(text, kw)) || contains_word(text, STUDIES_KEYWORD_REVIEW) {
        return TaskType::Studies;
    }
    if TRAINING_KEYWORDS.iter().any(|kw| contains_word(text, kw)) || contains_word(text, TRAINING_KEYWORD_TRAINING) {
        return TaskType::Training;
    }
    if MEETING_KEYWORDS.iter().any(|kw| contains_word(text, kw)) {
        return TaskType::Meeting;
    }
    TaskType::Meeting
}

// ---------------------------------------------------------------------
// Absolute date extraction.
// ---------------------------------------------------------------------

static RE_ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());
static RE_EURO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})\b").unwrap());
static RE_WRITTEN_MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([a-z]+)\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b").unwrap()
});
static RE_D_MON_YYYY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2})\s+([a-z]+)\s+(\d{4})\b").unwrap());
static RE_DMY_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());
static RE_WRITTEN_MONTH_DAY_NO_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bon\s+([a-z]+)\s+(\d{1,2})(?:st|nd|rd|th)?\b").unwrap());
static RE_MONTH_DAY_BARE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([a-z]+)\s+(\d{1,2})(?:st|nd|rd|th)?\b").unwrap()
});

fn year_inferred_from_month_day(now: DateTime<FixedOffset>, month: u32, day: u32) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(now.year(), month, day)?;
    if this_year > now.date_naive() {
        Some(this_year)
    } else {
        NaiveDate::from_ymd_opt(now.year() + 1, month, day)
    }
}

fn extract_absolute_date(text: &str, now: DateTime<FixedOffset>) -> Option<NaiveDate> {
    if let Some(caps) = RE_ISO_DATE.captures(text) {
        let y: i32 = caps[1].parse().ok()?;
        let m: u32 = caps[2].parse().ok()?;
        let d: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }
    if let Some(caps) = RE_EURO_DATE.captures(text) {
        let d: u32 = caps[1].parse().ok()?;
        let m: u32 = caps[2].parse().ok()?;
        let y: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }
    if let Some(caps) = RE_WRITTEN_MONTH_DAY_YEAR.captures(text) {
        if let Some(month) = month_from_name(&caps[1]) {
            let d: u32 = caps[2].parse().ok()?;
            let y: i32 = caps[3].parse().ok()?;
            return NaiveDate::from_ymd_opt(y, month, d);
        }
    }
    if let Some(caps) = RE_D_MON_YYYY.captures(text) {
        if let Some(month) = month_from_name(&caps[2]) {
            let d: u32 = caps[1].parse().ok()?;
            let y: i32 = caps[3].parse().ok()?;
            return NaiveDate::from_ymd_opt(y, month, d);
        }
    }
    if let Some(caps) = RE_DMY_NUMERIC.captures(text) {
        let d: u32 = caps[1].parse().ok()?;
        let m: u32 = caps[2].parse().ok()?;
        let y: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }
    if let Some(caps) = RE_WRITTEN_MONTH_DAY_NO_YEAR.captures(text) {
        if let Some(month) = month_from_name(&caps[1]) {
            let d: u32 = caps[2].parse().ok()?;
            return year_inferred_from_month_day(now, month, d);
        }
    }
    if let Some(caps) = RE_MONTH_DAY_BARE.captures(text) {
        if let Some(month) = month_from_name(&caps[1]) {
            let d: u32 = caps[2].parse().ok()?;
            return year_inferred_from_month_day(now, month, d);
        }
    }
    None
}

// ---------------------------------------------------------------------
// Relative date extraction.
// ---------------------------------------------------------------------

static RE_TOMORROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btomorrow\b").unwrap());
static RE_IN_N_DAYS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bin\s+(\d+)\s+days?\b").unwrap());
static RE_IN_WORD_DAYS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bin\s+(one|two|three|four|five|six|seven|eight|nine|ten)\s+days?\b").unwrap()
});
static RE_UPCOMING_WEEKDAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:upcoming|next)\s+([a-z]+)\b").unwrap());
static RE_NEXT_WEEK_WEEKDAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bnext\s+week\s+([a-z]+)\b").unwrap());
static RE_ON_WEEKDAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bon\s+([a-z]+)\b").unwrap());
static RE_ORDINAL_WEEKDAY_NEXT_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(first|second|third|fourth|last)\s+([a-z]+)\s+of\s+next\s+month\b").unwrap()
});
static RE_NEXT_MONTH_ORDINAL_WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bnext\s+month\s+(?:on\s+the\s+)?(first|second|third|fourth|last)\s+([a-z]+)\b").unwrap()
});

fn sunday_of_week(date: NaiveDate) -> NaiveDate {
    let days_from_sunday = date.weekday().num_days_from_sunday();
    date - Duration::days(days_from_sunday as i64)
}

fn next_occurrence_strictly_after(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let mut candidate = from + Duration::days(1);
    while candidate.weekday() != weekday {
        candidate += Duration::days(1);
    }
    candidate
}

fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, ordinal: u32) -> Option<NaiveDate> {
    let first_of_month = NaiveDate::from_ymd_opt(year, month, 1)?;
    let first_match = next_occurrence_strictly_after(first_of_month - Duration::days(1), weekday);
    Some(first_match + Duration::weeks(ordinal as i64))
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let last_day = last_day_of_month(year, month)?;
    let mut candidate = last_day;
    while candidate.weekday() != weekday {
        candidate -= Duration::days(1);
    }
    Some(candidate)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).map(|d| d - Duration::days(1))
}

fn next_month_first_day(now: NaiveDate) -> NaiveDate {
    let (year, month) = if now.month() == 12 { (now.year() + 1, 1) } else { (now.year(), now.month() + 1) };
    NaiveDate::from_ymd_opt(year, month, 1).expect("valid first-of-month date")
}

fn extract_relative_date(text: &str, now: DateTime<FixedOffset>) -> Option<NaiveDate> {
    let today = now.date_naive();

    if RE_TOMORROW.is_match(text) {
        return Some(today + Duration::days(1));
    }
    if let Some(caps) = RE_IN_N_DAYS.captures(text) {
        let n: i64 = caps[1].parse().ok()?;
        return Some(today + Duration::days(n));
    }
    if let Some(caps) = RE_IN_WORD_DAYS.captures(text) {
        let n = word_number(&caps[1])?;
        return Some(today + Duration::days(n));
    }

    if let Some(caps) = RE_ORDINAL_WEEKDAY_NEXT_MONTH.captures(text) {
        let ord = &caps[1];
        if let Some(weekday) = weekday_from_name(&caps[2]) {
            let next_month = next_month_first_day(today);
            return if ord == "last" {
                last_weekday_of_month(next_month.year(), next_month.month(), weekday)
            } else {
                nth_weekday_of_month(next_month.year(), next_month.month(), weekday, ordinal_index(ord)?)
            };
        }
    }
    if let Some(caps) = RE_NEXT_MONTH_ORDINAL_WEEKDAY.captures(text) {
        let ord = &caps[1];
        if let Some(weekday) = weekday_from_name(&caps[2]) {
            let next_month = next_month_first_day(today);
            return if ord == "last" {
                last_weekday_of_month(next_month.year(), next_month.month(), weekday)
            } else {
                nth_weekday_of_month(next_month.year(), next_month.month(), weekday, ordinal_index(ord)?)
            };
        }
    }

    if let Some(caps) = RE_NEXT_WEEK_WEEKDAY.captures(text) {
        if let Some(weekday) = weekday_from_name(&caps[1]) {
            let this_sunday = sunday_of_week(today);
            let next_sunday = this_sunday + Duration::days(7);
            let offset = weekday.num_days_from_sunday() as i64;
            return Some(next_sunday + Duration::days(offset));
        }
    }
    if let Some(caps) = RE_UPCOMING_WEEKDAY.captures(text) {
        if let Some(weekday) = weekday_from_name(&caps[1]) {
            return Some(next_occurrence_strictly_after(today, weekday));
        }
    }
    if let Some(caps) = RE_ON_WEEKDAY.captures(text) {
        if let Some(weekday) = weekday_from_name(&caps[1]) {
            return Some(next_occurrence_strictly_after(today, weekday));
        }
    }
    None
}

// ---------------------------------------------------------------------
// Window extraction — applies only when no exact date+time was found.
// ---------------------------------------------------------------------

static RE_THIS_WEEK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bthis\s+week\b|\bsometime\s+this\s+week\b").unwrap());
static RE_NEXT_WEEK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bnext\s+week\b|\bsometime\s+next\s+week\b|\bin\s+\d+\s+weeks?\b").unwrap());
static RE_THIS_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bthis\s+month\b|\bsometime\s+this\s+month\b").unwrap());
static RE_LATER_THIS_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\blater\s+this\s+month\b").unwrap());
static RE_NEXT_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bnext\s+month\b|\bin\s+(\d+)\s+months?\b").unwrap());
static RE_SOMETIME_IN_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bsometime\s+in\s+([a-z]+)\b").unwrap());

fn day_bounds(date: NaiveDate, now: DateTime<FixedOffset>) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let start = DateTime::from_naive_utc_and_offset(date.and_hms_opt(0, 0, 0).unwrap(), *now.offset());
    let end = DateTime::from_naive_utc_and_offset(date.and_hms_opt(23, 59, 59).unwrap(), *now.offset());
    (start, end)
}

/// Returns `(window, explicit_date_requested)`; vague ranges yield `false`.
fn extract_window(text: &str, now: DateTime<FixedOffset>) -> Option<((DateTime<FixedOffset>, DateTime<FixedOffset>), bool)> {
    let today = now.date_naive();

    if RE_TOMORROW.is_match(text) {
        return Some((day_bounds(today + Duration::days(1), now), true));
    }
    if let Some(caps) = RE_IN_N_DAYS.captures(text) {
        let n: i64 = caps[1].parse().ok()?;
        return Some((day_bounds(today + Duration::days(n), now), true));
    }

    if RE_THIS_WEEK.is_match(text) {
        let saturday = sunday_of_week(today) + Duration::days(6);
        let (start, _) = day_bounds(today, now);
        let (_, end) = day_bounds(saturday, now);
        return Some(((start, end), false));
    }
    if RE_NEXT_WEEK.is_match(text) {
        let next_sunday = sunday_of_week(today) + Duration::days(7);
        let next_saturday = next_sunday + Duration::days(6);
        let (start, _) = day_bounds(next_sunday, now);
        let (_, end) = day_bounds(next_saturday, now);
        return Some(((start, end), false));
    }
    if RE_LATER_THIS_MONTH.is_match(text) {
        let last_day = last_day_of_month(today.year(), today.month())?;
        let floor = last_day - Duration::days(9);
        let start_day = today.max(floor);
        let (start, _) = day_bounds(start_day, now);
        let (_, end) = day_bounds(last_day, now);
        return Some(((start, end), false));
    }
    if RE_THIS_MONTH.is_match(text) {
        let last_day = last_day_of_month(today.year(), today.month())?;
        let (start, _) = day_bounds(today, now);
        let (_, end) = day_bounds(last_day, now);
        return Some(((start, end), false));
    }
    if let Some(caps) = RE_NEXT_MONTH.captures(text) {
        let months_ahead: i64 = caps.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(1);
        let mut target = today;
        for _ in 0..months_ahead {
            target = next_month_first_day(target);
        }
        let last_day = last_day_of_month(target.year(), target.month())?;
        let (start, _) = day_bounds(target, now);
        let (_, end) = day_bounds(last_day, now);
        return Some(((start, end), false));
    }
    if let Some(caps) = RE_SOMETIME_IN_MONTH.captures(text) {
        if let Some(month) = month_from_name(&caps[1]) {
            let first_this_year = NaiveDate::from_ymd_opt(today.year(), month, 1)?;
            let year = if first_this_year >= today || first_this_year.month() >= today.month() {
                today.year()
            } else {
                today.year() + 1
            };
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            let last_day = last_day_of_month(year, month)?;
            let (start, _) = day_bounds(first, now);
            let (_, end) = day_bounds(last_day, now);
            return Some(((start, end), false));
        }
    }
    None
}

// ---------------------------------------------------------------------
// Title extraction.
// ---------------------------------------------------------------------

static RE_CONNECTOR_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(on|at|for|next|this|sometime|in|of|the|a|an|upcoming|until|to|am|pm)\b").unwrap()
});
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_DIGITS_AND_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d:/.,-]+").unwrap());

fn derive_title(text: &str, task_type: TaskType) -> String {
    let stripped = RE_DIGITS_AND_PUNCT.replace_all(text, " ");
    let stripped = RE_CONNECTOR_WORDS.replace_all(&stripped, " ");
    let collapsed = RE_WHITESPACE.replace_all(stripped.trim(), " ").trim().to_string();
    if collapsed.is_empty() {
        task_type.as_str().to_lowercase()
    } else {
        collapsed
    }
}

// ---------------------------------------------------------------------
// Top-level parse.
// ---------------------------------------------------------------------

pub fn parse(text: &str, now: DateTime<FixedOffset>) -> Intent {
    let lowered = text.to_lowercase();

    let task_type = extract_task_type(&lowered);
    let priority = extract_priority(&lowered);

    let time_range = extract_time_range(&lowered);
    let explicit_duration = extract_duration_minutes(&lowered);
    let duration_minutes = explicit_duration.or_else(|| time_range.map(|(_, d)| d));

    let time = extract_time(&lowered).or_else(|| time_range.map(|(start, _)| start));

    let absolute_date = extract_absolute_date(&lowered, now);
    let relative_date = extract_relative_date(&lowered, now);
    let date = absolute_date.or(relative_date);

    let mut intent = Intent::new(derive_title(&lowered, task_type));
    intent.task_type = task_type;
    intent.priority = priority;
    intent.duration_minutes = duration_minutes;

    if let (Some(date), Some((hour, minute))) = (date, time) {
        let naive = date.and_hms_opt(hour, minute, 0).expect("validated time components");
        intent.due_date_time = Some(DateTime::from_naive_utc_and_offset(naive, *now.offset()));
        intent.explicit_date_requested = true;
    } else if let Some(date) = date {
        let (start, end) = day_bounds(date, now);
        intent.window_start = Some(start);
        intent.window_end = Some(end);
        intent.explicit_date_requested = true;
        if let Some((hour, minute)) = time {
            intent.preferred_time_of_day = Some(TimeOfDay { hour, minute });
        }
    } else if let Some((hour, minute)) = time {
        intent.preferred_time_of_day = Some(TimeOfDay { hour, minute });
        if let Some(((window_start, window_end), explicit)) = extract_window(&lowered, now) {
            intent.window_start = Some(window_start);
            intent.window_end = Some(window_end);
            intent.explicit_date_requested = explicit;
        }
    } else if let Some(((window_start, window_end), explicit)) = extract_window(&lowered, now) {
        intent.window_start = Some(window_start);
        intent.window_end = Some(window_end);
        intent.explicit_date_requested = explicit;
    }

    if intent.due_date_time.is_some() {
        intent.preferred_time_of_day = None;
    }

    intent.finalize();
    intent
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(0).unwrap();
        offset.with_ymd_and_hms(2025, 11, 20, 9, 0, 0).unwrap()
    }

    #[test]
    fn explicit_24h_time_beats_bare_hour_prefix() {
        let intent = parse("schedule a study session december 5, 2025 at 13:00", now());
        let due = intent.due_date_time.expect("due date should be parsed");
        assert_eq!(due.hour(), 13);
        assert_eq!(due.minute(), 0);
    }

    #[test]
    fn task_type_defaults_to_meeting() {
        let intent = parse("grab coffee with sam", now());
        assert_eq!(intent.task_type, TaskType::Meeting);
    }

    #[test]
    fn studies_keywords_take_priority_over_meeting_keywords() {
        let intent = parse("study session meeting notes review", now());
        assert_eq!(intent.task_type, TaskType::Studies);
    }

    #[test]
    fn high_priority_phrase_is_detected() {
        let intent = parse("urgent call with the team", now());
        assert_eq!(intent.priority, Priority::High);
    }

    #[test]
    fn duration_phrase_an_hour_and_a_half() {
        let intent = parse("training for one and a half hours", now());
        assert_eq!(intent.duration_minutes, Some(90));
    }

    #[test]
    fn tomorrow_without_time_produces_a_day_window() {
        let intent = parse("schedule a workout tomorrow", now());
        assert!(intent.window_start.is_some());
        assert!(intent.due_date_time.is_none());
        assert!(intent.explicit_date_requested);
    }

    #[test]
    fn sometime_this_week_is_not_explicit() {
        let intent = parse("sometime this week i want to do a review", now());
        assert!(intent.window_start.is_some());
        assert!(!intent.explicit_date_requested);
    }

    #[test]
    fn all_present_requires_date_time_and_duration() {
        let intent = parse("study session tomorrow at 10:00 for 60 minutes", now());
        assert!(intent.critical_fields.all_present);
    }

    #[test]
    fn empty_title_falls_back_to_task_type_keyword() {
        let intent = parse("at 10:00 on 2025-12-05", now());
        assert_eq!(intent.title, "meeting");
    }
}
