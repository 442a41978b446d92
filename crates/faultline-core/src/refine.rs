//! # Refinement Optimizer
//!
//! Offline training mode: mutates the graph to reduce diagnosis error on a
//! labeled dataset, using the Logic Engine as the evaluation oracle.
//!
//! The search is greedy, first-improvement: successor descent, then
//! internal edge addition, then node expansion from an external candidate
//! set. Every tentative mutation is evaluated by re-running the engine over
//! the full dataset and reverted when it does not help.

use crate::primitives::REFINEMENT_EDGE_INTERVAL_MS;
use crate::{Edge, LogicEngine, Node, RtfpgModel, SignalIngestor};
use std::collections::{BTreeSet, VecDeque};

/// One labeled training trace: a pre-populated sample buffer plus the
/// ground truth for the target node.
pub struct LabeledTrace {
    pub ingestor: SignalIngestor,
    /// Whether the target node should be active after replaying the trace.
    pub expected_activation: bool,
}

impl LabeledTrace {
    #[must_use]
    pub fn new(ingestor: SignalIngestor, expected_activation: bool) -> Self {
        Self {
            ingestor,
            expected_activation,
        }
    }
}

/// Mutating refinement search over a uniquely borrowed model.
pub struct RefinementOptimizer<'a> {
    model: &'a mut RtfpgModel,
}

impl<'a> RefinementOptimizer<'a> {
    #[must_use]
    pub fn new(model: &'a mut RtfpgModel) -> Self {
        Self { model }
    }

    /// Diagnosis Error: the fraction of traces on which the engine's
    /// activation of the target disagrees with the label.
    #[must_use]
    pub fn diagnosis_error(&self, target_id: &str, dataset: &[LabeledTrace]) -> f64 {
        if dataset.is_empty() {
            return 0.0;
        }

        let mut misclassifications = 0usize;
        for trace in dataset {
            let mut engine = LogicEngine::new(&*self.model, &trace.ingestor);
            engine.find_active_hypotheses();
            let is_active = engine
                .node_states()
                .get(target_id)
                .is_some_and(|s| s.is_active);
            if is_active != trace.expected_activation {
                misclassifications += 1;
            }
        }

        misclassifications as f64 / dataset.len() as f64
    }

    /// Minimal cut set of a node: every ancestor, via reverse BFS.
    #[must_use]
    pub fn minimal_cut_set(&self, node_id: &str) -> BTreeSet<String> {
        let mut cut_set = BTreeSet::new();
        let mut visited = BTreeSet::from([node_id.to_string()]);
        let mut queue = VecDeque::from([node_id.to_string()]);

        while let Some(current) = queue.pop_front() {
            for edge in self.model.edges_into(&current) {
                cut_set.insert(edge.from.clone());
                if visited.insert(edge.from.clone()) {
                    queue.push_back(edge.from.clone());
                }
            }
        }

        cut_set
    }

    /// Recursively mutate the graph to reduce the diagnosis error of `p_id`.
    ///
    /// First improvement wins; each attempted mutation is reverted unless
    /// it (strictly, except for successor descent) improves DE.
    pub fn refine(&mut self, p_id: &str, candidates: &[Node], dataset: &[LabeledTrace]) {
        let current_de = self.diagnosis_error(p_id, dataset);
        if current_de == 0.0 {
            return;
        }
        tracing::info!(node = %p_id, de = current_de, "refining node");

        // 1. Successor descent: prefer fixing downstream nodes first.
        let successors: Vec<String> = self.model.edges_from(p_id).map(|e| e.to.clone()).collect();
        for successor in successors {
            if self.diagnosis_error(&successor, dataset) <= current_de {
                tracing::info!(from = %p_id, to = %successor, "descending to successor");
                self.refine(&successor, candidates, dataset);
                return;
            }
        }

        // 2. Internal edge addition: a missing causal link from an existing
        // discrepancy that is not already an ancestor.
        let cut_set = self.minimal_cut_set(p_id);
        let internal_candidates: Vec<String> = self
            .model
            .nodes()
            .iter()
            .filter(|n| n.is_discrepancy() && n.id() != p_id && !cut_set.contains(n.id()))
            .map(|n| n.id().to_string())
            .collect();
        for n_id in internal_candidates {
            self.model.add_edge(refinement_edge(&n_id, p_id));
            if self.diagnosis_error(p_id, dataset) < current_de {
                tracing::info!(from = %n_id, to = %p_id, "added internal edge");
                self.refine(p_id, candidates, dataset);
                return;
            }
            self.model.remove_edge(&n_id, p_id);
        }

        // 3. Node expansion: graft a new candidate node from the external
        // set and try wiring it downstream of p (case A) or beside p under
        // one of p's predecessors (case B).
        for d_prime in candidates {
            if self.model.contains_node(d_prime.id()) {
                continue;
            }
            let d_prime_id = d_prime.id().to_string();
            self.model.add_node(d_prime.clone());

            // Case A: p -> d'.
            self.model.add_edge(refinement_edge(p_id, &d_prime_id));
            if self.diagnosis_error(&d_prime_id, dataset) < current_de {
                tracing::info!(from = %p_id, to = %d_prime_id, "expanded downstream");
                self.refine(&d_prime_id, candidates, dataset);
                return;
            }
            self.model.remove_edge(p_id, &d_prime_id);

            // Case B: v -> d' for each predecessor v of p.
            let predecessors: Vec<String> =
                self.model.edges_into(p_id).map(|e| e.from.clone()).collect();
            let mut improved = false;
            for v_id in predecessors {
                self.model.add_edge(refinement_edge(&v_id, &d_prime_id));
                if self.diagnosis_error(p_id, dataset) < current_de {
                    tracing::info!(from = %v_id, to = %d_prime_id, "expanded sideways");
                    improved = true;
                    break;
                }
                self.model.remove_edge(&v_id, &d_prime_id);
            }
            if improved {
                self.refine(p_id, candidates, dataset);
                return;
            }

            // Neither case helped: take the candidate back out entirely.
            self.model.remove_node(&d_prime_id);
        }
    }
}

/// Edge with the default interval assigned to refinement-introduced links.
fn refinement_edge(from: &str, to: &str) -> Edge {
    Edge {
        from: from.to_string(),
        to: to.to_string(),
        time_min_ms: REFINEMENT_EDGE_INTERVAL_MS.0,
        time_max_ms: REFINEMENT_EDGE_INTERVAL_MS.1,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComparisonOp, DataSample, GateType, Predicate, Signal};

    fn signal(id: &str, source: &str) -> Signal {
        Signal {
            id: id.to_string(),
            source_name: source.to_string(),
            signal_type: "level".to_string(),
            units: "1".to_string(),
            range_min: 0.0,
            range_max: 1.0,
        }
    }

    fn discrepancy(id: &str, gate: GateType, signal_ref: &str) -> Node {
        Node::Discrepancy {
            id: id.to_string(),
            name: format!("{id} name"),
            criticality_level: 0,
            gate_type: gate,
            predicate: Predicate {
                signal_ref: signal_ref.to_string(),
                op: ComparisonOp::Gt,
                threshold: 0.5,
            },
        }
    }

    fn reading(ts: u64, parameter: &str, value: f64) -> DataSample {
        DataSample {
            timestamp_ms: ts,
            parameter_id: parameter.to_string(),
            value,
            is_failure_mode: false,
        }
    }

    fn trace(model: &RtfpgModel, readings: &[(u64, &str, f64)], expected: bool) -> LabeledTrace {
        let mut ingestor = SignalIngestor::new(model.signals());
        for &(ts, parameter, value) in readings {
            ingestor.ingest(reading(ts, parameter, value));
        }
        LabeledTrace::new(ingestor, expected)
    }

    #[test]
    fn minimal_cut_set_collects_all_ancestors() {
        let mut model = RtfpgModel::from_parts(
            vec![signal("S1", "a"), signal("S2", "b"), signal("S3", "c")],
            vec![
                discrepancy("D1", GateType::Or, "S1"),
                discrepancy("D2", GateType::Or, "S2"),
                discrepancy("D3", GateType::Or, "S3"),
            ],
            vec![
                Edge {
                    from: "D1".to_string(),
                    to: "D2".to_string(),
                    time_min_ms: 0,
                    time_max_ms: 100,
                },
                Edge {
                    from: "D2".to_string(),
                    to: "D3".to_string(),
                    time_min_ms: 0,
                    time_max_ms: 100,
                },
            ],
        )
        .expect("model");

        let optimizer = RefinementOptimizer::new(&mut model);
        let cut_set = optimizer.minimal_cut_set("D3");
        assert_eq!(
            cut_set,
            BTreeSet::from(["D1".to_string(), "D2".to_string()])
        );
        assert!(optimizer.minimal_cut_set("D1").is_empty());
    }

    #[test]
    fn diagnosis_error_counts_misclassifications() {
        let mut model = RtfpgModel::from_parts(
            vec![signal("S1", "a")],
            vec![discrepancy("D1", GateType::Or, "S1")],
            vec![],
        )
        .expect("model");

        let dataset = vec![
            trace(&model, &[(0, "a", 1.0)], true),  // activates: correct
            trace(&model, &[(0, "a", 0.0)], true),  // stays inactive: wrong
            trace(&model, &[(0, "a", 0.0)], false), // stays inactive: correct
            trace(&model, &[(0, "a", 1.0)], false), // activates: wrong
        ];

        let optimizer = RefinementOptimizer::new(&mut model);
        assert_eq!(optimizer.diagnosis_error("D1", &dataset), 0.5);
        assert_eq!(optimizer.diagnosis_error("D1", &[]), 0.0);
    }

    #[test]
    fn refine_adds_internal_edge_to_gate_false_positive() {
        // P is an AND discrepancy with no parents, so it fires on its
        // predicate alone and misfires on the negative trace. Gating it
        // behind D1 fixes the false positive without losing the positive.
        let mut model = RtfpgModel::from_parts(
            vec![signal("S1", "a"), signal("S2", "b")],
            vec![
                discrepancy("D1", GateType::Or, "S1"),
                discrepancy("P", GateType::And, "S2"),
            ],
            vec![],
        )
        .expect("model");

        let dataset = vec![
            trace(&model, &[(0, "b", 1.0)], false),
            trace(&model, &[(0, "a", 1.0), (10, "b", 1.0)], true),
        ];

        let mut optimizer = RefinementOptimizer::new(&mut model);
        assert_eq!(optimizer.diagnosis_error("P", &dataset), 0.5);

        optimizer.refine("P", &[], &dataset);
        assert_eq!(optimizer.diagnosis_error("P", &dataset), 0.0);
        assert!(model
            .edges_into("P")
            .any(|e| e.from == "D1"));
    }

    #[test]
    fn refine_expands_downstream_candidate() {
        // P can never explain the positive trace (its signal is silent),
        // but the external candidate Dx watches the right signal; case A
        // grafts it below P and recurses onto it.
        let mut model = RtfpgModel::from_parts(
            vec![signal("S1", "a"), signal("S2", "b")],
            vec![discrepancy("P", GateType::Or, "S1")],
            vec![],
        )
        .expect("model");

        let dataset = vec![trace(&model, &[(0, "b", 1.0)], true)];
        let candidates = vec![discrepancy("Dx", GateType::Or, "S2")];

        let mut optimizer = RefinementOptimizer::new(&mut model);
        assert_eq!(optimizer.diagnosis_error("P", &dataset), 1.0);

        optimizer.refine("P", &candidates, &dataset);
        assert!(model.contains_node("Dx"));
        assert!(model.edges_from("P").any(|e| e.to == "Dx"));

        let optimizer = RefinementOptimizer::new(&mut model);
        assert_eq!(optimizer.diagnosis_error("Dx", &dataset), 0.0);
    }

    #[test]
    fn refine_removes_unhelpful_candidate() {
        let mut model = RtfpgModel::from_parts(
            vec![signal("S1", "a"), signal("S2", "b")],
            vec![discrepancy("P", GateType::Or, "S1")],
            vec![],
        )
        .expect("model");

        // No trace ever satisfies the candidate's predicate, so neither
        // expansion case helps and the candidate must be reverted away.
        let dataset = vec![trace(&model, &[(0, "a", 0.0)], true)];
        let candidates = vec![discrepancy("Dx", GateType::Or, "S2")];

        let mut optimizer = RefinementOptimizer::new(&mut model);
        optimizer.refine("P", &candidates, &dataset);

        assert!(!model.contains_node("Dx"));
        assert!(model.edges().iter().all(|e| e.to != "Dx" && e.from != "Dx"));
    }

    #[test]
    fn refine_is_a_no_op_at_zero_error() {
        let mut model = RtfpgModel::from_parts(
            vec![signal("S1", "a")],
            vec![discrepancy("D1", GateType::Or, "S1")],
            vec![],
        )
        .expect("model");

        let dataset = vec![trace(&model, &[(0, "a", 1.0)], true)];
        let edges_before = model.edges().len();
        let nodes_before = model.nodes().len();

        let mut optimizer = RefinementOptimizer::new(&mut model);
        optimizer.refine("D1", &[], &dataset);

        assert_eq!(model.edges().len(), edges_before);
        assert_eq!(model.nodes().len(), nodes_before);
    }
}
