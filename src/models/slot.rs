use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub scheduled_start: DateTime<FixedOffset>,
    pub scheduled_end: DateTime<FixedOffset>,
    pub score: u8,
    pub exceeds_work_hours: bool,
}
