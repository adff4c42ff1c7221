use std::collections::HashSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flexibility {
    Low,
    Medium,
    High,
    Unknown,
}

impl Default for Flexibility {
    fn default() -> Self {
        Flexibility::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadlineBehavior {
    Early,
    OnTime,
    LastMinute,
    Unknown,
}

impl Default for DeadlineBehavior {
    fn default() -> Self {
        DeadlineBehavior::Unknown
    }
}

/// `days_off` uses the 0=Sunday..6=Saturday convention end to end (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub workday_pref_start: Option<NaiveTime>,
    pub workday_pref_end: Option<NaiveTime>,
    pub focus_peak_start: Option<NaiveTime>,
    pub focus_peak_end: Option<NaiveTime>,
    #[serde(default)]
    pub days_off: HashSet<u8>,
    pub default_duration_minutes: i64,
    #[serde(default)]
    pub flexibility: Flexibility,
    #[serde(default)]
    pub deadline_behavior: DeadlineBehavior,
}

impl UserPreferences {
    pub fn is_rest_day(&self, weekday_index: u8) -> bool {
        self.days_off.contains(&weekday_index)
    }
}
