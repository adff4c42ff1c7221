use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::intent::{Priority, TaskType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub user_id: i64,
    pub title: String,
    pub task_type: TaskType,
    pub priority: Priority,
    pub scheduled_start: DateTime<FixedOffset>,
    pub scheduled_end: DateTime<FixedOffset>,
}
