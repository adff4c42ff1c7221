//! Core Bayesian Network primitives: nodes, conditional probability tables, and
//! the network structure itself. Mirrors the evidence/inference split used
//! throughout the rest of the `services` module.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub type ParentValues = HashMap<String, String>;

/// A function-backed CPT. Boxed because node construction needs to store
/// heterogeneous closures behind one type. The third argument is the node's
/// own `historical_data` metadata (see bn_learning) so Layer-3 CPTs can blend
/// learned distributions without the closure needing to borrow the network
/// that owns it.
pub type CptFn =
    Box<dyn Fn(&str, &ParentValues, Option<&serde_json::Value>) -> f64 + Send + Sync>;

/// Conditional probability table for one node: either a table keyed by the
/// ordered tuple of parent states, or a function computed on the fly.
pub enum Cpt {
    Table(HashMap<Vec<String>, HashMap<String, f64>>),
    Function(CptFn),
}

impl Cpt {
    pub fn uniform_table(node_states: &[String], parent_state_lists: &[Vec<String>]) -> Self {
        let uniform = if node_states.is_empty() {
            0.0
        } else {
            1.0 / node_states.len() as f64
        };
        let mut table = HashMap::new();
        for combo in cartesian_product(parent_state_lists) {
            let dist = node_states
                .iter()
                .map(|s| (s.clone(), uniform))
                .collect();
            table.insert(combo, dist);
        }
        Cpt::Table(table)
    }

    pub fn get_probability(
        &self,
        node_state: &str,
        parent_values: &ParentValues,
        parents: &[String],
        historical_data: Option<&serde_json::Value>,
    ) -> f64 {
        match self {
            Cpt::Function(f) => f(node_state, parent_values, historical_data),
            Cpt::Table(table) => {
                let key: Vec<String> = parents
                    .iter()
                    .map(|p| parent_values.get(p).cloned().unwrap_or_default())
                    .collect();
                match table.get(&key) {
                    Some(dist) => *dist.get(node_state).unwrap_or(&0.0),
                    None => 0.0,
                }
            }
        }
    }

    pub fn is_functional(&self) -> bool {
        matches!(self, Cpt::Function(_))
    }
}

fn cartesian_product(lists: &[Vec<String>]) -> Vec<Vec<String>> {
    if lists.is_empty() {
        return vec![vec![]];
    }
    let mut result = vec![vec![]];
    for list in lists {
        let mut next = Vec::with_capacity(result.len() * list.len());
        for prefix in &result {
            for value in list {
                let mut combo = prefix.clone();
                combo.push(value.clone());
                next.push(combo);
            }
        }
        result = next;
    }
    result
}

/// A node (random variable) in the network: a name, its ordered discrete
/// states, ordered parent names, and an attached CPT.
pub struct BnNode {
    pub name: String,
    pub states: Vec<String>,
    pub parents: Vec<String>,
    pub cpt: Option<Cpt>,
    /// Out-of-band learned data a functional CPT may consult (see bn_learning).
    pub historical_data: Option<serde_json::Value>,
}

impl BnNode {
    pub fn new(name: impl Into<String>, states: Vec<String>, parents: Vec<String>) -> Self {
        BnNode {
            name: name.into(),
            states,
            parents,
            cpt: None,
            historical_data: None,
        }
    }

    pub fn set_cpt(&mut self, cpt: Cpt) {
        self.cpt = Some(cpt);
    }

    pub fn to_dto(&self) -> NodeStructureDto {
        NodeStructureDto {
            states: self.states.clone(),
            parents: self.parents.clone(),
            table: HashMap::new(),
            is_functional: self.cpt.as_ref().map(Cpt::is_functional).unwrap_or(false),
        }
    }
}

/// On-disk node shape, used by bn_persistence. Functional CPTs serialize with
/// an empty table and `is_functional: true`; they are rebuilt in-process
/// rather than deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStructureDto {
    pub states: Vec<String>,
    pub parents: Vec<String>,
    pub table: HashMap<String, HashMap<String, f64>>,
    pub is_functional: bool,
}

/// A directed acyclic graph of nodes plus the currently observed evidence.
#[derive(Default)]
pub struct BayesianNetwork {
    pub nodes: HashMap<String, BnNode>,
    /// Insertion order, needed so the uniform topological sort below is
    /// deterministic when in-degrees tie.
    pub insertion_order: Vec<String>,
    pub evidence: HashMap<String, String>,
}

impl BayesianNetwork {
    pub fn new() -> Self {
        BayesianNetwork::default()
    }

    pub fn add_node(&mut self, node: BnNode) -> AppResult<()> {
        if self.nodes.contains_key(&node.name) {
            return Err(AppError::inference(format!(
                "node {} already exists in network",
                node.name
            )));
        }
        self.insertion_order.push(node.name.clone());
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    pub fn get_node(&self, name: &str) -> Option<&BnNode> {
        self.nodes.get(name)
    }

    pub fn get_node_mut(&mut self, name: &str) -> Option<&mut BnNode> {
        self.nodes.get_mut(name)
    }

    pub fn set_evidence(&mut self, node_name: &str, value: impl Into<String>) -> AppResult<()> {
        let value = value.into();
        let node = self
            .nodes
            .get(node_name)
            .ok_or_else(|| AppError::inference(format!("node {node_name} not found")))?;
        if !node.states.contains(&value) {
            return Err(AppError::inference(format!(
                "value {value} not in states for {node_name}"
            )));
        }
        self.evidence.insert(node_name.to_string(), value);
        Ok(())
    }

    pub fn clear_evidence(&mut self) {
        self.evidence.clear();
    }

    fn children_of(&self, node_name: &str) -> Vec<&str> {
        self.insertion_order
            .iter()
            .filter(|name| {
                self.nodes[*name]
                    .parents
                    .iter()
                    .any(|p| p == node_name)
            })
            .map(|name| name.as_str())
            .collect()
    }

    /// Kahn's algorithm. Cycle => error, matching the Python raise ValueError.
    pub fn topological_sort(&self) -> AppResult<Vec<String>> {
        let mut in_degree: HashMap<&str, usize> = self
            .insertion_order
            .iter()
            .map(|name| (name.as_str(), self.nodes[name].parents.len()))
            .collect();

        let mut queue: Vec<&str> = self
            .insertion_order
            .iter()
            .map(|s| s.as_str())
            .filter(|name| in_degree[name] == 0)
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());
        let mut i = 0;
        while i < queue.len() {
            let current = queue[i];
            i += 1;
            result.push(current.to_string());
            for child in self.children_of(current) {
                let degree = in_degree.get_mut(child).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    queue.push(child);
                }
            }
        }

        if result.len() != self.nodes.len() {
            return Err(AppError::inference("network contains cycles"));
        }
        Ok(result)
    }

    /// P(node=state | evidence), querying the CPT with parent values taken
    /// from evidence or inferred recursively.
    pub fn compute_posterior_probability(
        &self,
        node_name: &str,
        node_state: &str,
        evidence: &HashMap<String, String>,
    ) -> AppResult<f64> {
        let node = self
            .get_node(node_name)
            .ok_or_else(|| AppError::inference(format!("node {node_name} not found")))?;

        let cpt = match &node.cpt {
            Some(cpt) => cpt,
            None => {
                return Ok(if node.states.is_empty() {
                    0.0
                } else {
                    1.0 / node.states.len() as f64
                })
            }
        };

        let mut parent_values = HashMap::new();
        for parent in &node.parents {
            if let Some(value) = evidence.get(parent) {
                parent_values.insert(parent.clone(), value.clone());
            } else {
                let (state, _) = self.infer_most_likely_state(parent, evidence)?;
                parent_values.insert(parent.clone(), state);
            }
        }

        Ok(cpt.get_probability(
            node_state,
            &parent_values,
            &node.parents,
            node.historical_data.as_ref(),
        ))
    }

    /// Exact enumeration over the query node's own states: argmax of
    /// `compute_posterior_probability`.
    pub fn infer_most_likely_state(
        &self,
        node_name: &str,
        evidence: &HashMap<String, String>,
    ) -> AppResult<(String, f64)> {
        let node = self
            .get_node(node_name)
            .ok_or_else(|| AppError::inference(format!("node {node_name} not found")))?;

        if let Some(value) = evidence.get(node_name) {
            return Ok((value.clone(), 1.0));
        }

        let mut best: Option<(String, f64)> = None;
        for state in &node.states {
            let prob = self.compute_posterior_probability(node_name, state, evidence)?;
            if best.as_ref().map(|(_, p)| prob > *p).unwrap_or(true) {
                best = Some((state.clone(), prob));
            }
        }
        Ok(best.unwrap_or_else(|| (node.states[0].clone(), 0.0)))
    }

    /// Greedy forward-propagation approximate MAP: walk the topological order,
    /// committing each non-evidenced node's argmax into the running evidence
    /// before its descendants are processed.
    pub fn infer_all_latent_nodes(
        &self,
        evidence: &HashMap<String, String>,
    ) -> AppResult<HashMap<String, (String, f64)>> {
        let mut full_evidence = evidence.clone();
        let mut results = HashMap::new();

        let ordered = self.topological_sort()?;

        for node_name in ordered {
            if !full_evidence.contains_key(&node_name) {
                let (state, prob) = self.infer_most_likely_state(&node_name, &full_evidence)?;
                full_evidence.insert(node_name.clone(), state.clone());
                results.insert(node_name, (state, prob));
            }
        }

        Ok(results)
    }

    /// If the node is evidenced, a point mass; otherwise the normalized
    /// distribution over all of the node's states.
    pub fn compute_node_distribution(
        &self,
        node_name: &str,
        evidence: &HashMap<String, String>,
    ) -> AppResult<HashMap<String, f64>> {
        let node = self
            .get_node(node_name)
            .ok_or_else(|| AppError::inference(format!("node {node_name} not found")))?;

        if let Some(value) = evidence.get(node_name) {
            return Ok(node
                .states
                .iter()
                .map(|s| (s.clone(), if s == value { 1.0 } else { 0.0 }))
                .collect());
        }

        let mut distribution = HashMap::new();
        for state in &node.states {
            let prob = self.compute_posterior_probability(node_name, state, evidence)?;
            distribution.insert(state.clone(), prob);
        }

        let total: f64 = distribution.values().sum();
        if total > 0.0 {
            for value in distribution.values_mut() {
                *value /= total;
            }
        }
        Ok(distribution)
    }

    /// Full evidence used for inference: the network's own stored evidence.
    pub fn full_evidence(&self) -> HashMap<String, String> {
        self.evidence.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_node(name: &str, parents: Vec<String>) -> BnNode {
        BnNode::new(name, vec!["A".into(), "B".into()], parents)
    }

    #[test]
    fn uniform_cpt_distributes_evenly() {
        let mut net = BayesianNetwork::new();
        let mut root = binary_node("Root", vec![]);
        root.set_cpt(Cpt::uniform_table(&root.states, &[]));
        net.add_node(root).unwrap();

        let dist = net.compute_node_distribution("Root", &HashMap::new()).unwrap();
        assert!((dist["A"] - 0.5).abs() < 1e-9);
        assert!((dist["B"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn evidence_forces_point_mass() {
        let mut net = BayesianNetwork::new();
        let mut root = binary_node("Root", vec![]);
        root.set_cpt(Cpt::uniform_table(&root.states, &[]));
        net.add_node(root).unwrap();
        net.set_evidence("Root", "A").unwrap();

        let dist = net
            .compute_node_distribution("Root", &net.full_evidence())
            .unwrap();
        assert_eq!(dist["A"], 1.0);
        assert_eq!(dist["B"], 0.0);
    }

    #[test]
    fn duplicate_node_name_is_rejected() {
        let mut net = BayesianNetwork::new();
        net.add_node(binary_node("Root", vec![])).unwrap();
        let err = net.add_node(binary_node("Root", vec![])).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn cyclic_graph_fails_topological_sort() {
        let mut net = BayesianNetwork::new();
        net.add_node(binary_node("A", vec!["B".to_string()])).unwrap();
        net.add_node(binary_node("B", vec!["A".to_string()])).unwrap();
        assert!(net.topological_sort().is_err());
    }

    #[test]
    fn distribution_sums_to_one() {
        let mut net = BayesianNetwork::new();
        let child_states = vec!["X".into(), "Y".into(), "Z".into()];
        let mut parent = binary_node("Parent", vec![]);
        parent.set_cpt(Cpt::uniform_table(&parent.states, &[]));
        net.add_node(parent).unwrap();

        let mut child = BnNode::new("Child", child_states.clone(), vec!["Parent".into()]);
        let parent_states = vec!["A".to_string(), "B".to_string()];
        child.set_cpt(Cpt::uniform_table(&child_states, &[parent_states]));
        net.add_node(child).unwrap();

        let dist = net.compute_node_distribution("Child", &HashMap::new()).unwrap();
        let total: f64 = dist.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
