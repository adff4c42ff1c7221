use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Meeting,
    Training,
    Studies,
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Meeting
    }
}

impl TaskType {
    pub const ALL: [TaskType; 3] = [TaskType::Meeting, TaskType::Training, TaskType::Studies];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Meeting => "Meeting",
            TaskType::Training => "Training",
            TaskType::Studies => "Studies",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalFields {
    pub has_date: bool,
    pub has_time: bool,
    pub has_duration: bool,
    pub all_present: bool,
}

/// Hour/minute pair decoupled from any date, e.g. from "at 15:00" with no date named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub title: String,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub priority: Priority,
    pub due_date_time: Option<DateTime<FixedOffset>>,
    pub window_start: Option<DateTime<FixedOffset>>,
    pub window_end: Option<DateTime<FixedOffset>>,
    pub preferred_time_of_day: Option<TimeOfDay>,
    pub duration_minutes: Option<i64>,
    pub explicit_date_requested: bool,
    pub explicit_date_time_given: bool,
    pub critical_fields: CriticalFields,
}

impl Intent {
    pub fn new(title: impl Into<String>) -> Self {
        Intent {
            title: title.into(),
            task_type: TaskType::default(),
            priority: Priority::default(),
            due_date_time: None,
            window_start: None,
            window_end: None,
            preferred_time_of_day: None,
            duration_minutes: None,
            explicit_date_requested: false,
            explicit_date_time_given: false,
            critical_fields: CriticalFields::default(),
        }
    }

    /// Recomputes `critical_fields` and `explicit_date_time_given` from the rest of
    /// the record. Called once by the parser after every field has been filled in.
    pub fn finalize(&mut self) {
        let has_date = self.due_date_time.is_some();
        let has_time = self.due_date_time.is_some();
        let has_duration = self.duration_minutes.is_some();
        self.critical_fields = CriticalFields {
            has_date,
            has_time,
            has_duration,
            all_present: has_date && has_time && has_duration,
        };
        self.explicit_date_time_given = self.due_date_time.is_some() && self.duration_minutes.is_none();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_task_type_is_meeting() {
        let intent = Intent::new("stand up");
        assert_eq!(intent.task_type, TaskType::Meeting);
    }

    #[test]
    fn finalize_sets_all_present_only_when_due_date_time_and_duration_exist() {
        let mut intent = Intent::new("study session");
        intent.window_start = Some(
            chrono::DateTime::parse_from_rfc3339("2025-11-27T00:00:00+00:00").unwrap(),
        );
        intent.preferred_time_of_day = Some(TimeOfDay { hour: 10, minute: 0 });
        intent.duration_minutes = Some(60);
        intent.finalize();
        // windowStart/preferredTimeOfDay alone never satisfy all_present, even
        // with a duration: only dueDateTime + durationMinutes do.
        assert!(!intent.critical_fields.all_present);

        intent.due_date_time = Some(
            chrono::DateTime::parse_from_rfc3339("2025-11-27T10:00:00+00:00").unwrap(),
        );
        intent.finalize();
        assert!(intent.critical_fields.all_present);
    }
}
