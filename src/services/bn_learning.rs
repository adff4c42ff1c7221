//! Incremental CPT learning from task observations. Layer 1 (evidence) is
//! fixed from preferences and never relearned here; Layer 2 (latent traits)
//! keeps its fixed functional CPTs; only Layer 3 (predictions) consumes the
//! statistics this module maintains.

use std::collections::HashMap;

use chrono::{Datelike, Timelike, Weekday};

use crate::models::intent::TaskType;
use crate::models::observation::Observation;
use crate::services::bn_graph::BayesianNetwork;

pub fn map_hour_to_time_of_day(hour: u32) -> &'static str {
    match hour {
        6..=11 => "MORNING",
        12..=13 => "MIDDAY",
        14..=16 => "AFTERNOON",
        17..=20 => "EVENING",
        _ => "NIGHT",
    }
}

pub fn map_weekday_to_day_type(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sat | Weekday::Sun => "WEEKEND",
        _ => "WEEKDAY",
    }
}

#[derive(Debug, Default, Clone)]
pub struct HistoricalStatistics {
    pub task_type_counts: HashMap<TaskType, i64>,
    pub hour_counts_by_type: HashMap<TaskType, HashMap<u32, i64>>,
    pub weekday_counts_by_type: HashMap<TaskType, HashMap<u8, i64>>,
    pub duration_counts_by_type: HashMap<TaskType, HashMap<i64, i64>>,
    pub priority_counts_by_type: HashMap<TaskType, HashMap<String, i64>>,
}

impl HistoricalStatistics {
    pub fn new() -> Self {
        HistoricalStatistics::default()
    }

    pub fn add_observation(&mut self, obs: &Observation) {
        *self.task_type_counts.entry(obs.task_type).or_insert(0) += 1;
        *self
            .hour_counts_by_type
            .entry(obs.task_type)
            .or_default()
            .entry(obs.scheduled_start.hour())
            .or_insert(0) += 1;
        *self
            .weekday_counts_by_type
            .entry(obs.task_type)
            .or_default()
            .entry(crate::services::schedule_utils::weekend_index(
                obs.scheduled_start.weekday(),
            ))
            .or_insert(0) += 1;
        *self
            .duration_counts_by_type
            .entry(obs.task_type)
            .or_default()
            .entry(obs.duration_minutes)
            .or_insert(0) += 1;
        *self
            .priority_counts_by_type
            .entry(obs.task_type)
            .or_default()
            .entry(obs.priority.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub fn remove_observation(&mut self, obs: &Observation) {
        decrement(&mut self.task_type_counts, &obs.task_type);
        decrement(
            self.hour_counts_by_type.entry(obs.task_type).or_default(),
            &obs.scheduled_start.hour(),
        );
        decrement(
            self.weekday_counts_by_type.entry(obs.task_type).or_default(),
            &crate::services::schedule_utils::weekend_index(obs.scheduled_start.weekday()),
        );
        decrement(
            self.duration_counts_by_type.entry(obs.task_type).or_default(),
            &obs.duration_minutes,
        );
        decrement(
            self.priority_counts_by_type.entry(obs.task_type).or_default(),
            &obs.priority.as_str().to_string(),
        );
    }

    pub fn time_of_day_distribution(&self, task_type: TaskType) -> HashMap<String, f64> {
        let hour_counts = match self.hour_counts_by_type.get(&task_type) {
            Some(h) => h,
            None => return HashMap::new(),
        };
        let mut time_counts: HashMap<&str, i64> = HashMap::new();
        for (hour, count) in hour_counts {
            *time_counts.entry(map_hour_to_time_of_day(*hour)).or_insert(0) += count;
        }
        normalize(time_counts)
    }

    pub fn day_type_distribution(&self, task_type: TaskType) -> HashMap<String, f64> {
        let weekday_counts = match self.weekday_counts_by_type.get(&task_type) {
            Some(w) => w,
            None => return HashMap::new(),
        };
        let mut day_counts: HashMap<&str, i64> = HashMap::new();
        for (sunday_index, count) in weekday_counts {
            // sunday_index: 0=Sunday..6=Saturday; weekend is {0,6}.
            let day_type = if *sunday_index == 0 || *sunday_index == 6 {
                "WEEKEND"
            } else {
                "WEEKDAY"
            };
            *day_counts.entry(day_type).or_insert(0) += count;
        }
        normalize(day_counts)
    }

    pub fn average_duration(&self, task_type: TaskType) -> Option<i64> {
        let duration_counts = self.duration_counts_by_type.get(&task_type)?;
        if duration_counts.is_empty() {
            return None;
        }
        let total_minutes: i64 = duration_counts.iter().map(|(d, c)| d * c).sum();
        let total_tasks: i64 = duration_counts.values().sum();
        if total_tasks > 0 {
            Some(total_minutes / total_tasks)
        } else {
            None
        }
    }

    pub fn most_common_priority(&self, task_type: TaskType) -> Option<String> {
        let priority_counts = self.priority_counts_by_type.get(&task_type)?;
        priority_counts
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(priority, _)| priority.clone())
    }
}

fn decrement<K: std::hash::Hash + Eq>(map: &mut HashMap<K, i64>, key: &K)
where
    K: Clone,
{
    if let Some(value) = map.get_mut(key) {
        *value = (*value - 1).max(0);
    }
}

fn normalize(counts: HashMap<&str, i64>) -> HashMap<String, f64> {
    let total: i64 = counts.values().sum();
    if total == 0 {
        return HashMap::new();
    }
    counts
        .into_iter()
        .map(|(state, count)| (state.to_string(), count as f64 / total as f64))
        .collect()
}

/// Attaches learned distributions to the Layer-3 nodes for `task_type` as
/// out-of-band metadata; the functional CPTs read it at inference time.
pub fn update_network_from_statistics(
    network: &mut BayesianNetwork,
    stats: &HistoricalStatistics,
    task_type: TaskType,
) {
    let time_dist = stats.time_of_day_distribution(task_type);
    if !time_dist.is_empty() {
        let node_name = format!("PreferredTimeOfDay_{}", task_type.as_str());
        if let Some(node) = network.get_node_mut(&node_name) {
            if node.cpt.is_some() {
                let mut data = node
                    .historical_data
                    .take()
                    .and_then(|v| v.as_object().cloned())
                    .unwrap_or_default();
                data.insert(
                    "time_dist".to_string(),
                    serde_json::to_value(&time_dist).unwrap(),
                );
                node.historical_data = Some(serde_json::Value::Object(data));
            }
        }
    }

    let day_dist = stats.day_type_distribution(task_type);
    if !day_dist.is_empty() {
        let node_name = format!("PreferredDayType_{}", task_type.as_str());
        if let Some(node) = network.get_node_mut(&node_name) {
            if node.cpt.is_some() {
                let mut data = node
                    .historical_data
                    .take()
                    .and_then(|v| v.as_object().cloned())
                    .unwrap_or_default();
                data.insert(
                    "day_dist".to_string(),
                    serde_json::to_value(&day_dist).unwrap(),
                );
                node.historical_data = Some(serde_json::Value::Object(data));
            }
        }
    }
}

/// Full statistics rebuild by replaying every remaining observation. The only
/// recovery path from a corrupted accumulator, and what `remove_task` uses.
pub fn recompute_all_cpts_from_observations(
    network: &mut BayesianNetwork,
    observations: &[Observation],
) -> HistoricalStatistics {
    let mut stats = HistoricalStatistics::new();
    for obs in observations {
        stats.add_observation(obs);
    }
    for task_type in TaskType::ALL {
        update_network_from_statistics(network, &stats, task_type);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::intent::Priority;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn obs(y: i32, m: u32, d: u32, h: u32, duration: i64, task_type: TaskType) -> Observation {
        let offset = FixedOffset::east_opt(0).unwrap();
        let start: DateTime<FixedOffset> = offset.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap();
        Observation {
            user_id: 1,
            task_type,
            priority: Priority::Medium,
            scheduled_start: start,
            scheduled_end: start + chrono::Duration::minutes(duration),
            duration_minutes: duration,
        }
    }

    #[test]
    fn add_then_remove_returns_to_zero() {
        let mut stats = HistoricalStatistics::new();
        let o = obs(2025, 11, 27, 10, 60, TaskType::Studies);
        stats.add_observation(&o);
        assert_eq!(stats.task_type_counts[&TaskType::Studies], 1);
        stats.remove_observation(&o);
        assert_eq!(stats.task_type_counts[&TaskType::Studies], 0);
    }

    #[test]
    fn remove_floors_at_zero() {
        let mut stats = HistoricalStatistics::new();
        let o = obs(2025, 11, 27, 10, 60, TaskType::Studies);
        stats.remove_observation(&o);
        assert_eq!(stats.task_type_counts.get(&TaskType::Studies), None);
    }

    #[test]
    fn time_of_day_distribution_normalizes() {
        let mut stats = HistoricalStatistics::new();
        stats.add_observation(&obs(2025, 11, 27, 10, 60, TaskType::Meeting));
        stats.add_observation(&obs(2025, 11, 28, 18, 60, TaskType::Meeting));
        let dist = stats.time_of_day_distribution(TaskType::Meeting);
        let total: f64 = dist.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(dist.len(), 2);
    }

    #[test]
    fn average_duration_is_weighted_mean() {
        let mut stats = HistoricalStatistics::new();
        stats.add_observation(&obs(2025, 11, 27, 10, 30, TaskType::Training));
        stats.add_observation(&obs(2025, 11, 28, 10, 90, TaskType::Training));
        assert_eq!(stats.average_duration(TaskType::Training), Some(60));
    }
}
