//! # Prognosis Manager
//!
//! Projects the current active front forward to the criticality front.
//!
//! Edges are weighted by their **minimum** propagation time, so the
//! projection is the earliest possible arrival (worst-case urgency). The
//! manager also classifies each symptom downstream of a hypothesis by
//! chain status, which feeds the tiered report.

use crate::{Node, NodeState, PrognosisResult, RtfpgModel, SymptomStatus};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Shortest-path reasoner over the time_min-weighted propagation graph.
///
/// Construction indexes the model; the manager must be rebuilt if the
/// model is mutated (refinement runs do not use prognosis).
pub struct PrognosisManager {
    /// Node id -> node, for criticality lookups.
    node_map: BTreeMap<String, Node>,
    /// Forward adjacency: from -> [(to, time_min_ms)].
    adjacency: BTreeMap<String, Vec<(String, u64)>>,
}

impl PrognosisManager {
    #[must_use]
    pub fn new(model: &RtfpgModel) -> Self {
        let node_map = model
            .nodes()
            .iter()
            .map(|node| (node.id().to_string(), node.clone()))
            .collect();

        let mut adjacency: BTreeMap<String, Vec<(String, u64)>> = BTreeMap::new();
        for edge in model.edges() {
            adjacency
                .entry(edge.from.clone())
                .or_default()
                .push((edge.to.clone(), edge.time_min_ms));
        }

        Self { node_map, adjacency }
    }

    /// Time-to-criticality from the current state front.
    ///
    /// Dijkstra seeded with every active node at its observed activation
    /// time. The first popped node on the criticality front that is not
    /// already active ends the search: active critical nodes are skipped so
    /// prognosis reports the *next* predicted critical event. Predictions
    /// never relax into already-active nodes (observed time wins) and never
    /// land before `current_time_ms` (no retro-prediction).
    #[must_use]
    pub fn time_to_criticality(
        &self,
        node_states: &BTreeMap<String, NodeState>,
        criticality_threshold: i32,
        current_time_ms: u64,
    ) -> PrognosisResult {
        // (absolute arrival ms, node id): BTreeSet pops the smallest pair,
        // so equal arrivals resolve by node id.
        let mut queue: BTreeSet<(u64, String)> = BTreeSet::new();
        let mut min_dist: BTreeMap<String, u64> = BTreeMap::new();

        for (id, state) in node_states {
            if state.is_active {
                queue.insert((state.activation_time_ms, id.clone()));
                min_dist.insert(id.clone(), state.activation_time_ms);
            }
        }

        while let Some((d, u)) = queue.pop_first() {
            let is_active = node_states.get(&u).is_some_and(|s| s.is_active);
            if let Some(node) = self.node_map.get(&u) {
                if node.criticality_level() >= criticality_threshold && !is_active {
                    return PrognosisResult {
                        ttc: d as f64 - current_time_ms as f64,
                        critical_node_id: u,
                    };
                }
            }

            // Stale queue entry for a node already reached faster.
            if min_dist.get(&u).is_some_and(|&best| d > best) {
                continue;
            }

            let Some(neighbors) = self.adjacency.get(&u) else {
                continue;
            };
            for (v, weight) in neighbors {
                if node_states.get(v).is_some_and(|s| s.is_active) {
                    continue;
                }
                let arrival = d.saturating_add(*weight);
                if arrival < current_time_ms {
                    continue;
                }
                if min_dist.get(v).is_none_or(|&best| arrival < best) {
                    min_dist.insert(v.clone(), arrival);
                    queue.insert((arrival, v.clone()));
                }
            }
        }

        PrognosisResult::unreachable()
    }

    /// Classify every discrepancy downstream of a hypothesis.
    ///
    /// BFS forward from the hypothesis, carrying whether the chain so far
    /// is unbroken. An active node is `Confirmed`. An inactive node behind
    /// an unbroken chain is `Pending`; the chain breaks below it when its
    /// latest robustness is negative (the current observation contradicts
    /// the predicate), making further inactive descendants `Unreachable`.
    /// A node without recorded state is `Missing`.
    #[must_use]
    pub fn classify_symptoms(
        &self,
        hypothesis_id: &str,
        node_states: &BTreeMap<String, NodeState>,
    ) -> BTreeMap<String, SymptomStatus> {
        let mut statuses = BTreeMap::new();
        let mut visited = BTreeSet::from([hypothesis_id.to_string()]);
        let mut queue = VecDeque::from([(hypothesis_id.to_string(), true)]);

        while let Some((current, chain_valid)) = queue.pop_front() {
            let state = node_states.get(&current);
            // The hypothesis root is presumed active for chain purposes.
            let is_active = current == hypothesis_id || state.is_some_and(|s| s.is_active);
            let is_discrepancy = self
                .node_map
                .get(&current)
                .is_some_and(Node::is_discrepancy);

            let next_chain_valid = if is_active {
                true
            } else {
                chain_valid && state.is_none_or(|s| s.robustness >= 0.0)
            };

            if is_discrepancy && current != hypothesis_id {
                let status = match (state, is_active, chain_valid) {
                    (None, _, _) => SymptomStatus::Missing,
                    (Some(_), true, _) => SymptomStatus::Confirmed,
                    (Some(_), false, true) => SymptomStatus::Pending,
                    (Some(_), false, false) => SymptomStatus::Unreachable,
                };
                statuses.insert(current.clone(), status);
            }

            if let Some(neighbors) = self.adjacency.get(&current) {
                for (child, _) in neighbors {
                    if visited.insert(child.clone()) {
                        queue.push_back((child.clone(), next_chain_valid));
                    }
                }
            }
        }

        statuses
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComparisonOp, Edge, GateType, Predicate};

    fn failure_mode(id: &str, criticality: i32) -> Node {
        Node::FailureMode {
            id: id.to_string(),
            name: format!("{id} name"),
            criticality_level: criticality,
        }
    }

    fn discrepancy(id: &str, criticality: i32) -> Node {
        Node::Discrepancy {
            id: id.to_string(),
            name: format!("{id} name"),
            criticality_level: criticality,
            gate_type: GateType::Or,
            predicate: Predicate {
                signal_ref: "S1".to_string(),
                op: ComparisonOp::Gt,
                threshold: 0.5,
            },
        }
    }

    fn edge(from: &str, to: &str, min: u64, max: u64) -> Edge {
        Edge {
            from: from.to_string(),
            to: to.to_string(),
            time_min_ms: min,
            time_max_ms: max,
        }
    }

    fn active_at(time_ms: u64) -> NodeState {
        NodeState {
            is_active: true,
            robustness: 0.5,
            activation_time_ms: time_ms,
            trigger_value: 1.0,
        }
    }

    fn model(nodes: Vec<Node>, edges: Vec<Edge>) -> RtfpgModel {
        RtfpgModel::from_parts(vec![], nodes, edges).expect("valid model")
    }

    #[test]
    fn ttc_reaches_critical_node_through_min_time() {
        let model = model(
            vec![discrepancy("A", 0), discrepancy("C", 9)],
            vec![edge("A", "C", 50, 200)],
        );
        let manager = PrognosisManager::new(&model);

        let mut states = BTreeMap::new();
        states.insert("A".to_string(), active_at(100));
        states.insert("C".to_string(), NodeState::default());

        let result = manager.time_to_criticality(&states, 5, 100);
        assert_eq!(result.ttc, 50.0);
        assert_eq!(result.critical_node_id, "C");
    }

    #[test]
    fn ttc_skips_already_active_critical_node() {
        let model = model(
            vec![discrepancy("A", 0), discrepancy("C", 9)],
            vec![edge("A", "C", 50, 200)],
        );
        let manager = PrognosisManager::new(&model);

        let mut states = BTreeMap::new();
        states.insert("A".to_string(), active_at(100));
        states.insert("C".to_string(), active_at(80));

        // C is observed active: prognosis looks past it, finds nothing.
        let result = manager.time_to_criticality(&states, 5, 100);
        assert!(!result.is_reachable());
        assert!(result.critical_node_id.is_empty());
    }

    #[test]
    fn ttc_continues_past_active_critical_to_next_one() {
        let model = model(
            vec![discrepancy("A", 0), discrepancy("C1", 9), discrepancy("C2", 9)],
            vec![edge("A", "C1", 10, 10), edge("C1", "C2", 30, 60)],
        );
        let manager = PrognosisManager::new(&model);

        let mut states = BTreeMap::new();
        states.insert("A".to_string(), active_at(100));
        states.insert("C1".to_string(), active_at(105));
        states.insert("C2".to_string(), NodeState::default());

        let result = manager.time_to_criticality(&states, 5, 110);
        // C2 predicted from C1's observed time: 105 + 30 = 135.
        assert_eq!(result.ttc, 25.0);
        assert_eq!(result.critical_node_id, "C2");
    }

    #[test]
    fn ttc_rejects_arrivals_in_the_past() {
        // A activated long ago; A -> C would arrive before current_time, so
        // the stalled path yields no overdue prediction.
        let model = model(
            vec![discrepancy("A", 0), discrepancy("C", 9)],
            vec![edge("A", "C", 10, 20)],
        );
        let manager = PrognosisManager::new(&model);

        let mut states = BTreeMap::new();
        states.insert("A".to_string(), active_at(100));
        states.insert("C".to_string(), NodeState::default());

        let result = manager.time_to_criticality(&states, 5, 500);
        assert!(!result.is_reachable());
    }

    #[test]
    fn ttc_unreachable_when_no_critical_node() {
        let model = model(
            vec![discrepancy("A", 0), discrepancy("B", 2)],
            vec![edge("A", "B", 10, 20)],
        );
        let manager = PrognosisManager::new(&model);

        let mut states = BTreeMap::new();
        states.insert("A".to_string(), active_at(0));
        states.insert("B".to_string(), NodeState::default());

        let result = manager.time_to_criticality(&states, 5, 0);
        assert_eq!(result, PrognosisResult::unreachable());
    }

    #[test]
    fn ttc_with_no_active_nodes_is_unreachable() {
        let model = model(vec![discrepancy("C", 9)], vec![]);
        let manager = PrognosisManager::new(&model);
        let states = BTreeMap::from([("C".to_string(), NodeState::default())]);

        let result = manager.time_to_criticality(&states, 5, 0);
        assert!(!result.is_reachable());
    }

    #[test]
    fn classify_marks_confirmed_and_pending() {
        let model = model(
            vec![failure_mode("F", 0), discrepancy("Da", 0), discrepancy("Db", 0)],
            vec![edge("F", "Da", 0, 100), edge("Da", "Db", 0, 100)],
        );
        let manager = PrognosisManager::new(&model);

        let mut states = BTreeMap::new();
        states.insert("Da".to_string(), active_at(10));
        states.insert("Db".to_string(), NodeState::default());

        let statuses = manager.classify_symptoms("F", &states);
        assert_eq!(statuses["Da"], SymptomStatus::Confirmed);
        assert_eq!(statuses["Db"], SymptomStatus::Pending);
    }

    #[test]
    fn classify_marks_unreachable_behind_violated_predicate() {
        let model = model(
            vec![failure_mode("F", 0), discrepancy("Da", 0), discrepancy("Db", 0)],
            vec![edge("F", "Da", 0, 100), edge("Da", "Db", 0, 100)],
        );
        let manager = PrognosisManager::new(&model);

        let mut states = BTreeMap::new();
        // Da's latest observation contradicts its predicate.
        states.insert(
            "Da".to_string(),
            NodeState {
                is_active: false,
                robustness: -0.2,
                activation_time_ms: 0,
                trigger_value: 0.0,
            },
        );
        states.insert("Db".to_string(), NodeState::default());

        let statuses = manager.classify_symptoms("F", &states);
        assert_eq!(statuses["Da"], SymptomStatus::Pending);
        assert_eq!(statuses["Db"], SymptomStatus::Unreachable);
    }

    #[test]
    fn classify_marks_missing_without_state() {
        let model = model(
            vec![failure_mode("F", 0), discrepancy("Da", 0)],
            vec![edge("F", "Da", 0, 100)],
        );
        let manager = PrognosisManager::new(&model);

        let statuses = manager.classify_symptoms("F", &BTreeMap::new());
        assert_eq!(statuses["Da"], SymptomStatus::Missing);
    }
}
