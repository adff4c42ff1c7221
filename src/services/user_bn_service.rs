//! Per-user Bayesian Network facade (C5): builds the three-layer graph from
//! preferences, trains it from task observations, and answers
//! `predict_slot_score` for the suggestion engine. One instance owns exactly
//! one user's graph, observation list, and statistics.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Timelike};

use crate::error::AppResult;
use crate::models::intent::TaskType;
use crate::models::observation::Observation;
use crate::models::preferences::UserPreferences;
use crate::services::bn_graph::{BayesianNetwork, BnNode, Cpt};
use crate::services::bn_learning::{
    map_hour_to_time_of_day, map_weekday_to_day_type, recompute_all_cpts_from_observations,
    update_network_from_statistics, HistoricalStatistics,
};
use crate::services::bn_persistence::{BnMetadata, BnPersistence, BnStateDto, NetworkStructureDto};
use crate::services::schedule_utils::weekend_index;

const WORKDAY_WINDOW_STATES: [&str; 5] = ["NONE", "EARLY_BIRD", "STANDARD", "NIGHT_OWL", "FLEXIBLE"];
const FOCUS_PEAK_STATES: [&str; 4] = ["MORNING", "AFTERNOON", "EVENING", "NONE"];
const DAYS_OFF_STATES: [&str; 4] = ["NO_DAYS_OFF", "WEEKEND_ONLY", "MIXED", "HEAVY"];
const FLEXIBILITY_STATES: [&str; 4] = ["LOW", "MEDIUM", "HIGH", "UNKNOWN"];
const DEADLINE_STATES: [&str; 4] = ["EARLY", "ON_TIME", "LAST_MINUTE", "UNKNOWN"];
const DURATION_PREF_STATES: [&str; 3] = ["SHORT", "MEDIUM", "LONG"];

const PERSONA_STATES: [&str; 4] = ["STRUCTURED", "ADAPTIVE", "SPONTANEOUS", "WORKAHOLIC"];
const ENERGY_STATES: [&str; 3] = ["FRONT_LOADED", "BALANCED", "BACK_LOADED"];
const BATCHING_STATES: [&str; 2] = ["PREFERS_SINGLE", "PREFERS_BATCHING"];
const HORIZON_STATES: [&str; 3] = ["SHORT_TERM", "MEDIUM_TERM", "LONG_TERM"];

const TIME_OF_DAY_STATES: [&str; 5] = ["MORNING", "MIDDAY", "AFTERNOON", "EVENING", "NIGHT"];
const DAY_TYPE_STATES: [&str; 3] = ["WEEKDAY", "WEEKEND", "ANY"];

fn to_owned_vec(states: &[&str]) -> Vec<String> {
    states.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------
// Layer 1: mapping UserPreferences fields onto evidence states.
// ---------------------------------------------------------------------

fn extract_workday_window_state(start: Option<NaiveTime>, end: Option<NaiveTime>) -> &'static str {
    match (start, end) {
        (Some(start), Some(end)) => {
            let span_minutes = (end.num_seconds_from_midnight() as i64
                - start.num_seconds_from_midnight() as i64)
                / 60;
            if span_minutes > 12 * 60 {
                "FLEXIBLE"
            } else if start < NaiveTime::from_hms_opt(8, 0, 0).unwrap() {
                "EARLY_BIRD"
            } else if start > NaiveTime::from_hms_opt(10, 0, 0).unwrap()
                || end > NaiveTime::from_hms_opt(20, 0, 0).unwrap()
            {
                "NIGHT_OWL"
            } else {
                "STANDARD"
            }
        }
        _ => "NONE",
    }
}

fn extract_focus_peak_state(start: Option<NaiveTime>, _end: Option<NaiveTime>) -> &'static str {
    match start {
        None => "NONE",
        Some(start) if start.hour() < 12 => "MORNING",
        Some(start) if start.hour() < 17 => "AFTERNOON",
        Some(_) => "EVENING",
    }
}

fn extract_days_off_pattern(days_off: &std::collections::HashSet<u8>) -> &'static str {
    if days_off.is_empty() {
        "NO_DAYS_OFF"
    } else if days_off.len() >= 3 {
        "HEAVY"
    } else if days_off.iter().all(|d| *d == 0 || *d == 6) {
        "WEEKEND_ONLY"
    } else {
        "MIXED"
    }
}

fn extract_duration_preference(default_duration_minutes: i64) -> &'static str {
    if default_duration_minutes <= 45 {
        "SHORT"
    } else if default_duration_minutes <= 90 {
        "MEDIUM"
    } else {
        "LONG"
    }
}

// ---------------------------------------------------------------------
// Layer 2: functional CPTs over the latent trait nodes.
// ---------------------------------------------------------------------

fn biased_distribution(states: &[&str], target: &str, target_weight: f64) -> HashMap<String, f64> {
    let remainder = (1.0 - target_weight) / (states.len() - 1) as f64;
    states
        .iter()
        .map(|s| {
            let weight = if *s == target { target_weight } else { remainder };
            (s.to_string(), weight)
        })
        .collect()
}

fn uniform_distribution(states: &[&str]) -> HashMap<String, f64> {
    let weight = 1.0 / states.len() as f64;
    states.iter().map(|s| (s.to_string(), weight)).collect()
}

fn cpt_user_persona(state: &str, parents: &HashMap<String, String>, _hist: Option<&serde_json::Value>) -> f64 {
    let flexibility = parents.get("FlexibilityLevel").map(String::as_str).unwrap_or("UNKNOWN");
    let workday = parents.get("WorkdayWindow").map(String::as_str).unwrap_or("NONE");
    let days_off = parents.get("DaysOffPattern").map(String::as_str).unwrap_or("NO_DAYS_OFF");

    let dist = if flexibility == "LOW" && workday == "STANDARD" && days_off == "WEEKEND_ONLY" {
        biased_distribution(&PERSONA_STATES, "STRUCTURED", 0.7)
    } else if workday == "FLEXIBLE" && days_off == "NO_DAYS_OFF" {
        biased_distribution(&PERSONA_STATES, "WORKAHOLIC", 0.7)
    } else if flexibility == "HIGH" && (workday == "FLEXIBLE" || workday == "NONE") {
        biased_distribution(&PERSONA_STATES, "SPONTANEOUS", 0.7)
    } else if flexibility == "MEDIUM" {
        biased_distribution(&PERSONA_STATES, "ADAPTIVE", 0.7)
    } else {
        uniform_distribution(&PERSONA_STATES)
    };
    *dist.get(state).unwrap_or(&0.0)
}

fn cpt_energy_pattern(state: &str, parents: &HashMap<String, String>, _hist: Option<&serde_json::Value>) -> f64 {
    let focus = parents.get("FocusPeakState").map(String::as_str).unwrap_or("NONE");
    let workday = parents.get("WorkdayWindow").map(String::as_str).unwrap_or("NONE");

    let dist = if focus == "MORNING" && workday == "EARLY_BIRD" {
        biased_distribution(&ENERGY_STATES, "FRONT_LOADED", 0.7)
    } else if focus == "EVENING" || workday == "NIGHT_OWL" {
        biased_distribution(&ENERGY_STATES, "BACK_LOADED", 0.7)
    } else {
        biased_distribution(&ENERGY_STATES, "BALANCED", 0.6)
    };
    *dist.get(state).unwrap_or(&0.0)
}

fn cpt_task_batching_pref(state: &str, parents: &HashMap<String, String>, _hist: Option<&serde_json::Value>) -> f64 {
    let duration_pref = parents.get("DurationPreference").map(String::as_str).unwrap_or("MEDIUM");
    let flexibility = parents.get("FlexibilityLevel").map(String::as_str).unwrap_or("UNKNOWN");

    let dist = if duration_pref == "LONG" && flexibility == "LOW" {
        biased_distribution(&BATCHING_STATES, "PREFERS_BATCHING", 0.75)
    } else if duration_pref == "SHORT" && flexibility == "HIGH" {
        biased_distribution(&BATCHING_STATES, "PREFERS_SINGLE", 0.75)
    } else {
        uniform_distribution(&BATCHING_STATES)
    };
    *dist.get(state).unwrap_or(&0.0)
}

fn cpt_planning_horizon(state: &str, parents: &HashMap<String, String>, _hist: Option<&serde_json::Value>) -> f64 {
    let deadline = parents.get("DeadlineBehavior").map(String::as_str).unwrap_or("UNKNOWN");
    let flexibility = parents.get("FlexibilityLevel").map(String::as_str).unwrap_or("UNKNOWN");

    let dist = if deadline == "LAST_MINUTE" || flexibility == "HIGH" {
        biased_distribution(&HORIZON_STATES, "SHORT_TERM", 0.7)
    } else if deadline == "EARLY" || flexibility == "LOW" {
        biased_distribution(&HORIZON_STATES, "LONG_TERM", 0.7)
    } else {
        biased_distribution(&HORIZON_STATES, "MEDIUM_TERM", 0.6)
    };
    *dist.get(state).unwrap_or(&0.0)
}

// ---------------------------------------------------------------------
// Layer 3: functional CPTs that blend parent-derived priors with the
// historical distributions bn_learning attaches as node metadata.
// ---------------------------------------------------------------------

fn energy_time_prior(energy: &str) -> HashMap<&'static str, f64> {
    match energy {
        "FRONT_LOADED" => [
            ("MORNING", 0.5),
            ("MIDDAY", 0.2),
            ("AFTERNOON", 0.2),
            ("EVENING", 0.05),
            ("NIGHT", 0.05),
        ]
        .into_iter()
        .collect(),
        "BACK_LOADED" => [
            ("MORNING", 0.1),
            ("MIDDAY", 0.15),
            ("AFTERNOON", 0.25),
            ("EVENING", 0.4),
            ("NIGHT", 0.1),
        ]
        .into_iter()
        .collect(),
        _ => TIME_OF_DAY_STATES.iter().map(|s| (*s, 0.2)).collect(),
    }
}

fn persona_time_prior(persona: &str) -> HashMap<&'static str, f64> {
    match persona {
        "STRUCTURED" => [
            ("MORNING", 0.4),
            ("MIDDAY", 0.3),
            ("AFTERNOON", 0.2),
            ("EVENING", 0.05),
            ("NIGHT", 0.05),
        ]
        .into_iter()
        .collect(),
        "WORKAHOLIC" => [
            ("MORNING", 0.15),
            ("MIDDAY", 0.15),
            ("AFTERNOON", 0.2),
            ("EVENING", 0.3),
            ("NIGHT", 0.2),
        ]
        .into_iter()
        .collect(),
        "SPONTANEOUS" => [
            ("MORNING", 0.1),
            ("MIDDAY", 0.15),
            ("AFTERNOON", 0.2),
            ("EVENING", 0.25),
            ("NIGHT", 0.3),
        ]
        .into_iter()
        .collect(),
        _ => TIME_OF_DAY_STATES.iter().map(|s| (*s, 0.2)).collect(),
    }
}

fn cpt_preferred_time_of_day(
    state: &str,
    parents: &HashMap<String, String>,
    hist: Option<&serde_json::Value>,
) -> f64 {
    let energy = parents.get("EnergyPattern").map(String::as_str).unwrap_or("BALANCED");
    let persona = parents.get("UserPersona").map(String::as_str).unwrap_or("ADAPTIVE");

    let energy_prior = energy_time_prior(energy);
    let persona_prior = persona_time_prior(persona);
    let hist_dist = hist.and_then(|v| v.get("time_dist"));

    let (hist_weight, energy_weight, persona_weight) = if hist_dist.is_some() {
        (0.5, 0.4, 0.1)
    } else {
        (0.0, 0.9, 0.1)
    };

    let mut total = 0.0;
    let mut value_for_state = 0.0;
    for s in TIME_OF_DAY_STATES {
        let hist_p = hist_dist
            .and_then(|d| d.get(s))
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let p = hist_weight * hist_p + energy_weight * energy_prior[s] + persona_weight * persona_prior[s];
        total += p;
        if s == state {
            value_for_state = p;
        }
    }
    if total > 0.0 {
        value_for_state / total
    } else {
        1.0 / TIME_OF_DAY_STATES.len() as f64
    }
}

fn day_type_pattern_prior(days_off_pattern: &str) -> HashMap<&'static str, f64> {
    match days_off_pattern {
        "NO_DAYS_OFF" => [("WEEKDAY", 0.6), ("WEEKEND", 0.2), ("ANY", 0.2)].into_iter().collect(),
        "WEEKEND_ONLY" => [("WEEKDAY", 0.5), ("WEEKEND", 0.3), ("ANY", 0.2)].into_iter().collect(),
        "HEAVY" => [("WEEKDAY", 0.3), ("WEEKEND", 0.4), ("ANY", 0.3)].into_iter().collect(),
        _ => [("WEEKDAY", 0.4), ("WEEKEND", 0.3), ("ANY", 0.3)].into_iter().collect(),
    }
}

fn cpt_preferred_day_type(
    state: &str,
    parents: &HashMap<String, String>,
    hist: Option<&serde_json::Value>,
) -> f64 {
    let days_off_pattern = parents.get("DaysOffPattern").map(String::as_str).unwrap_or("NO_DAYS_OFF");
    let prior = day_type_pattern_prior(days_off_pattern);
    let hist_dist = hist.and_then(|v| v.get("day_dist"));

    let (hist_weight, prior_weight) = if hist_dist.is_some() { (0.6, 0.4) } else { (0.0, 1.0) };

    let mut total = 0.0;
    let mut value_for_state = 0.0;
    for s in DAY_TYPE_STATES {
        let hist_p = hist_dist
            .and_then(|d| d.get(s))
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let p = hist_weight * hist_p + prior_weight * prior[s];
        total += p;
        if s == state {
            value_for_state = p;
        }
    }
    if total > 0.0 {
        value_for_state / total
    } else {
        1.0 / DAY_TYPE_STATES.len() as f64
    }
}

#[derive(Debug, Clone)]
pub struct BnStatus {
    pub user_id: i64,
    pub is_trained: bool,
    pub num_observations: usize,
    pub has_preferences: bool,
    pub latent_traits: Option<HashMap<String, String>>,
}

/// Owns one user's BN graph, observation history, and learning statistics.
/// Constructing one attempts to load prior state from disk, matching the
/// load-on-init behavior of the facade this is grounded on.
pub struct UserBnService {
    pub user_id: i64,
    network: Option<BayesianNetwork>,
    observations: Vec<Observation>,
    statistics: HistoricalStatistics,
    is_initialized: bool,
    persistence: BnPersistence,
}

impl UserBnService {
    pub fn new(user_id: i64, persistence: BnPersistence) -> AppResult<Self> {
        let mut service = UserBnService {
            user_id,
            network: None,
            observations: Vec::new(),
            statistics: HistoricalStatistics::new(),
            is_initialized: false,
            persistence,
        };
        service.load_from_disk()?;
        Ok(service)
    }

    fn load_from_disk(&mut self) -> AppResult<bool> {
        let state = match self.persistence.load(self.user_id)? {
            Some(state) => state,
            None => return Ok(false),
        };

        self.observations = state.observations;
        self.statistics = HistoricalStatistics::new();
        for obs in &self.observations {
            self.statistics.add_observation(obs);
        }

        let mut network = Self::build_network_structure();
        for (node_name, value) in &state.network_structure.evidence {
            let _ = network.set_evidence(node_name, value.clone());
        }
        if !self.observations.is_empty() {
            self.statistics = recompute_all_cpts_from_observations(&mut network, &self.observations);
        }
        self.network = Some(network);
        self.is_initialized = true;
        Ok(true)
    }

    fn build_network_structure() -> BayesianNetwork {
        let mut network = BayesianNetwork::new();

        network
            .add_node(BnNode::new("WorkdayWindow", to_owned_vec(&WORKDAY_WINDOW_STATES), vec![]))
            .expect("fresh network never has duplicate node names");
        network
            .add_node(BnNode::new("FocusPeakState", to_owned_vec(&FOCUS_PEAK_STATES), vec![]))
            .unwrap();
        network
            .add_node(BnNode::new("DaysOffPattern", to_owned_vec(&DAYS_OFF_STATES), vec![]))
            .unwrap();
        network
            .add_node(BnNode::new("FlexibilityLevel", to_owned_vec(&FLEXIBILITY_STATES), vec![]))
            .unwrap();
        network
            .add_node(BnNode::new("DeadlineBehavior", to_owned_vec(&DEADLINE_STATES), vec![]))
            .unwrap();
        network
            .add_node(BnNode::new("DurationPreference", to_owned_vec(&DURATION_PREF_STATES), vec![]))
            .unwrap();

        let mut persona = BnNode::new(
            "UserPersona",
            to_owned_vec(&PERSONA_STATES),
            vec!["FlexibilityLevel".into(), "WorkdayWindow".into(), "DaysOffPattern".into()],
        );
        persona.set_cpt(Cpt::Function(Box::new(cpt_user_persona)));
        network.add_node(persona).unwrap();

        let mut energy = BnNode::new(
            "EnergyPattern",
            to_owned_vec(&ENERGY_STATES),
            vec!["FocusPeakState".into(), "WorkdayWindow".into()],
        );
        energy.set_cpt(Cpt::Function(Box::new(cpt_energy_pattern)));
        network.add_node(energy).unwrap();

        let mut batching = BnNode::new(
            "TaskBatchingPreference",
            to_owned_vec(&BATCHING_STATES),
            vec!["DurationPreference".into(), "FlexibilityLevel".into()],
        );
        batching.set_cpt(Cpt::Function(Box::new(cpt_task_batching_pref)));
        network.add_node(batching).unwrap();

        let mut horizon = BnNode::new(
            "PlanningHorizon",
            to_owned_vec(&HORIZON_STATES),
            vec!["DeadlineBehavior".into(), "FlexibilityLevel".into()],
        );
        horizon.set_cpt(Cpt::Function(Box::new(cpt_planning_horizon)));
        network.add_node(horizon).unwrap();

        for task_type in TaskType::ALL {
            let time_node_name = format!("PreferredTimeOfDay_{}", task_type.as_str());
            let mut time_node = BnNode::new(
                time_node_name,
                to_owned_vec(&TIME_OF_DAY_STATES),
                vec!["EnergyPattern".into(), "UserPersona".into()],
            );
            time_node.set_cpt(Cpt::Function(Box::new(cpt_preferred_time_of_day)));
            network.add_node(time_node).unwrap();

            let day_node_name = format!("PreferredDayType_{}", task_type.as_str());
            let mut day_node = BnNode::new(
                day_node_name,
                to_owned_vec(&DAY_TYPE_STATES),
                vec!["DaysOffPattern".into()],
            );
            day_node.set_cpt(Cpt::Function(Box::new(cpt_preferred_day_type)));
            network.add_node(day_node).unwrap();
        }

        network
    }

    fn set_evidence_from_preferences(network: &mut BayesianNetwork, prefs: &UserPreferences) {
        let workday_state = extract_workday_window_state(prefs.workday_pref_start, prefs.workday_pref_end);
        network.set_evidence("WorkdayWindow", workday_state).unwrap();

        let focus_state = extract_focus_peak_state(prefs.focus_peak_start, prefs.focus_peak_end);
        network.set_evidence("FocusPeakState", focus_state).unwrap();

        let days_off_pattern = extract_days_off_pattern(&prefs.days_off);
        network.set_evidence("DaysOffPattern", days_off_pattern).unwrap();

        let flexibility = format!("{:?}", prefs.flexibility).to_uppercase();
        network.set_evidence("FlexibilityLevel", flexibility).unwrap();

        let deadline = match prefs.deadline_behavior {
            crate::models::preferences::DeadlineBehavior::Early => "EARLY",
            crate::models::preferences::DeadlineBehavior::OnTime => "ON_TIME",
            crate::models::preferences::DeadlineBehavior::LastMinute => "LAST_MINUTE",
            crate::models::preferences::DeadlineBehavior::Unknown => "UNKNOWN",
        };
        network.set_evidence("DeadlineBehavior", deadline).unwrap();

        let duration_pref = extract_duration_preference(prefs.default_duration_minutes);
        network.set_evidence("DurationPreference", duration_pref).unwrap();
    }

    pub fn initialize_from_preferences(&mut self, prefs: &UserPreferences) -> AppResult<()> {
        let mut network = Self::build_network_structure();
        Self::set_evidence_from_preferences(&mut network, prefs);
        self.network = Some(network);
        self.is_initialized = true;
        self.save_to_disk()
    }

    pub fn is_trained(&self) -> bool {
        self.is_initialized && self.network.is_some()
    }

    pub fn update_from_task(&mut self, obs: Observation) -> AppResult<()> {
        if !self.is_trained() {
            return Ok(());
        }
        self.observations.push(obs.clone());
        self.statistics.add_observation(&obs);
        let task_type = obs.task_type;
        if let Some(network) = self.network.as_mut() {
            update_network_from_statistics(network, &self.statistics, task_type);
        }
        self.save_to_disk()
    }

    pub fn remove_task(&mut self, obs: &Observation) -> AppResult<()> {
        if !self.is_trained() {
            return Ok(());
        }
        self.statistics.remove_observation(obs);
        self.observations.retain(|o| o != obs);
        if let Some(network) = self.network.as_mut() {
            self.statistics = recompute_all_cpts_from_observations(network, &self.observations);
        }
        self.save_to_disk()
    }

    pub fn predict_slot_score(
        &self,
        task_type: TaskType,
        slot_start: DateTime<FixedOffset>,
        _slot_end: DateTime<FixedOffset>,
    ) -> AppResult<f64> {
        let network = match &self.network {
            Some(network) if self.is_trained() => network,
            _ => return Ok(5.0),
        };

        let evidence = network.full_evidence();
        let evidence_with_latent = {
            let mut e = evidence.clone();
            for (name, (state, _)) in network.infer_all_latent_nodes(&evidence)? {
                e.insert(name, state);
            }
            e
        };

        let time_node_name = format!("PreferredTimeOfDay_{}", task_type.as_str());
        let time_dist = network.compute_node_distribution(&time_node_name, &evidence_with_latent)?;
        let slot_time_state = map_hour_to_time_of_day(slot_start.hour());
        let time_prob = *time_dist.get(slot_time_state).unwrap_or(&0.2);

        let day_node_name = format!("PreferredDayType_{}", task_type.as_str());
        let day_dist = network.compute_node_distribution(&day_node_name, &evidence_with_latent)?;
        let slot_day_state = map_weekday_to_day_type(slot_start.weekday());
        let day_prob = *day_dist.get(slot_day_state).unwrap_or(&0.33);

        let combined = 0.6 * time_prob + 0.4 * day_prob;
        Ok((combined * 10.0).clamp(0.0, 10.0))
    }

    pub fn get_status(&self) -> AppResult<BnStatus> {
        let has_preferences = self
            .network
            .as_ref()
            .map(|n| !n.evidence.is_empty())
            .unwrap_or(false);

        let latent_traits = if self.is_trained() {
            let network = self.network.as_ref().unwrap();
            let evidence = network.full_evidence();
            let inferred = network.infer_all_latent_nodes(&evidence)?;
            let keep = ["UserPersona", "EnergyPattern", "TaskBatchingPreference", "PlanningHorizon"];
            Some(
                inferred
                    .into_iter()
                    .filter(|(name, _)| keep.contains(&name.as_str()))
                    .map(|(name, (state, _))| (name, state))
                    .collect(),
            )
        } else {
            None
        };

        Ok(BnStatus {
            user_id: self.user_id,
            is_trained: self.is_trained(),
            num_observations: self.observations.len(),
            has_preferences,
            latent_traits,
        })
    }

    fn save_to_disk(&self) -> AppResult<()> {
        let network = match &self.network {
            Some(network) => network,
            None => return Ok(()),
        };

        let nodes = network
            .insertion_order
            .iter()
            .map(|name| (name.clone(), network.nodes[name].to_dto()))
            .collect();

        let state = BnStateDto {
            user_id: self.user_id,
            network_structure: NetworkStructureDto {
                nodes,
                evidence: network.evidence.clone(),
            },
            observations: self.observations.clone(),
            metadata: BnMetadata {
                num_observations: self.observations.len(),
                is_initialized: self.is_initialized,
            },
        };

        self.persistence.save(&state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::intent::Priority;
    use crate::models::preferences::Flexibility;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn offset_dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(0).unwrap();
        offset.with_ymd_and_hms(y, m, d, h, mi, 0).unwrap()
    }

    fn sample_preferences() -> UserPreferences {
        UserPreferences {
            workday_pref_start: Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            workday_pref_end: Some(NaiveTime::from_hms_opt(17, 0, 0).unwrap()),
            focus_peak_start: Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            focus_peak_end: Some(NaiveTime::from_hms_opt(11, 0, 0).unwrap()),
            days_off: HashSet::from([0, 6]),
            default_duration_minutes: 60,
            flexibility: Flexibility::Medium,
            deadline_behavior: crate::models::preferences::DeadlineBehavior::OnTime,
        }
    }

    #[test]
    fn untrained_bn_returns_neutral_score() {
        let dir = tempfile::tempdir().unwrap();
        let service = UserBnService::new(1, BnPersistence::new(dir.path())).unwrap();
        let score = service
            .predict_slot_score(TaskType::Meeting, offset_dt(2025, 11, 27, 10, 0), offset_dt(2025, 11, 27, 11, 0))
            .unwrap();
        assert_eq!(score, 5.0);
    }

    #[test]
    fn initialize_then_predict_is_trained_and_in_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = UserBnService::new(1, BnPersistence::new(dir.path())).unwrap();
        service.initialize_from_preferences(&sample_preferences()).unwrap();
        assert!(service.is_trained());

        let score = service
            .predict_slot_score(TaskType::Studies, offset_dt(2025, 11, 27, 10, 0), offset_dt(2025, 11, 27, 11, 0))
            .unwrap();
        assert!((0.0..=10.0).contains(&score));
    }

    #[test]
    fn reload_from_disk_preserves_trained_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut service = UserBnService::new(1, BnPersistence::new(dir.path())).unwrap();
            service.initialize_from_preferences(&sample_preferences()).unwrap();
        }
        let reloaded = UserBnService::new(1, BnPersistence::new(dir.path())).unwrap();
        assert!(reloaded.is_trained());
    }

    #[test]
    fn remove_after_add_returns_statistics_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = UserBnService::new(1, BnPersistence::new(dir.path())).unwrap();
        service.initialize_from_preferences(&sample_preferences()).unwrap();

        let start = offset_dt(2025, 11, 27, 10, 0);
        let obs = Observation {
            user_id: 1,
            task_type: TaskType::Studies,
            priority: Priority::Medium,
            scheduled_start: start,
            scheduled_end: start + chrono::Duration::minutes(60),
            duration_minutes: 60,
        };
        service.update_from_task(obs.clone()).unwrap();
        assert_eq!(service.get_status().unwrap().num_observations, 1);

        service.remove_task(&obs).unwrap();
        assert_eq!(service.get_status().unwrap().num_observations, 0);
    }
}
