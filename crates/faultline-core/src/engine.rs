//! # Logic Engine
//!
//! Replays the sample buffer against the graph and tracks failure
//! hypotheses.
//!
//! Evaluation is a full re-replay on every invocation: sample handling is
//! idempotent and node states are reconstructed deterministically from the
//! buffer plus the immutable model, so the engine never carries state
//! between ticks. Two phases:
//!
//! 1. **Predicate evaluation**: every buffered sample either updates a
//!    discrepancy's robustness/activation or injects a fault directly into
//!    a node. Samples that resolve to nothing are ignored.
//! 2. **Hypothesis tracking**: backward propagation from active symptoms
//!    collects candidate failure modes through causally consistent chains;
//!    forward expansion of each candidate scores plausibility and
//!    aggregate robustness; results are ranked.

use crate::primitives::PLAUSIBILITY_TIE_EPSILON;
use crate::{
    DataSample, DiagnosisResult, GateType, Node, NodeState, Predicate, RtfpgModel, Signal,
    SignalIngestor,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Signed normalized margin of a predicate against a sample value.
///
/// Positive when satisfied, negative when violated, scaled by the signal's
/// operating range. Degenerate ranges fall back to the raw margin.
#[must_use]
pub fn calculate_robustness(predicate: &Predicate, value: f64, signal: &Signal) -> f64 {
    let raw = predicate.op.raw_margin(value, predicate.threshold);
    if signal.is_degenerate_range() {
        raw
    } else {
        raw / signal.range_width()
    }
}

/// Diagnosis reasoner over one model and one sample buffer.
///
/// Node states are rebuilt from scratch on every
/// [`find_active_hypotheses`](LogicEngine::find_active_hypotheses) call.
pub struct LogicEngine<'a> {
    model: &'a RtfpgModel,
    ingestor: &'a SignalIngestor,
    node_states: BTreeMap<String, NodeState>,
}

impl<'a> LogicEngine<'a> {
    #[must_use]
    pub fn new(model: &'a RtfpgModel, ingestor: &'a SignalIngestor) -> Self {
        let node_states = model
            .nodes()
            .iter()
            .map(|node| (node.id().to_string(), NodeState::default()))
            .collect();
        Self {
            model,
            ingestor,
            node_states,
        }
    }

    /// Activation state of every node after the last evaluation.
    #[must_use]
    pub fn node_states(&self) -> &BTreeMap<String, NodeState> {
        &self.node_states
    }

    /// Run the full reasoning pass and return ranked failure hypotheses.
    pub fn find_active_hypotheses(&mut self) -> Vec<DiagnosisResult> {
        // Reconstruct states from scratch; replay makes this idempotent.
        for state in self.node_states.values_mut() {
            *state = NodeState::default();
        }
        evaluate_signal_trace(self.model, self.ingestor, &mut self.node_states);

        // Active discrepancies are the observed symptoms.
        let active_symptoms: Vec<String> = self
            .node_states
            .iter()
            .filter(|(id, state)| {
                state.is_active && self.model.node(id).is_some_and(Node::is_discrepancy)
            })
            .map(|(id, _)| id.clone())
            .collect();

        // Backward propagation: trace each symptom to candidate root causes.
        let mut candidate_failures = BTreeSet::new();
        for symptom in &active_symptoms {
            let mut visited = BTreeSet::from([symptom.clone()]);
            backward_propagate(
                self.model,
                &self.node_states,
                symptom,
                &mut visited,
                &mut candidate_failures,
            );
        }

        // Forward propagation and consistency scoring per candidate.
        let mut ranked: Vec<DiagnosisResult> = candidate_failures
            .iter()
            .filter_map(|fm_id| self.score_candidate(fm_id))
            .collect();

        ranked.sort_by(compare_diagnoses);
        ranked
    }

    /// Expand a candidate failure mode forward and score it. Candidates
    /// with no observed symptom (plausibility 0) are dropped.
    fn score_candidate(&self, fm_id: &str) -> Option<DiagnosisResult> {
        let node = self.model.node(fm_id)?;

        let mut expected_symptoms = BTreeSet::new();
        let mut visited = BTreeSet::from([fm_id.to_string()]);
        let mut queue = VecDeque::from([fm_id.to_string()]);
        while let Some(current) = queue.pop_front() {
            for edge in self.model.edges_from(&current) {
                if visited.insert(edge.to.clone()) {
                    queue.push_back(edge.to.clone());
                    if self.model.node(&edge.to).is_some_and(Node::is_discrepancy) {
                        expected_symptoms.insert(edge.to.clone());
                    }
                }
            }
        }

        let mut consistent_count = 0usize;
        let mut robustness_sum = 0.0;
        let mut consistent_symptoms = Vec::new();
        let mut symptom_values = BTreeMap::new();
        for symptom in &expected_symptoms {
            // Missing states contribute 0 to the robustness sum.
            if let Some(state) = self.node_states.get(symptom) {
                robustness_sum += state.robustness;
                if state.is_active {
                    consistent_count += 1;
                    consistent_symptoms.push(symptom.clone());
                    symptom_values.insert(symptom.clone(), state.trigger_value);
                }
            }
        }

        if expected_symptoms.is_empty() {
            return None;
        }
        let plausibility = consistent_count as f64 / expected_symptoms.len() as f64;
        if plausibility <= 0.0 {
            return None;
        }
        let robustness = (robustness_sum / expected_symptoms.len() as f64).clamp(-1.0, 1.0);

        Some(DiagnosisResult {
            node: node.clone(),
            plausibility,
            robustness,
            expected_symptoms,
            consistent_symptoms,
            symptom_values,
        })
    }
}

/// Ranking: plausibility descending, robustness descending within the tie
/// window, node id ascending as the final deterministic tie-break.
fn compare_diagnoses(a: &DiagnosisResult, b: &DiagnosisResult) -> Ordering {
    if (a.plausibility - b.plausibility).abs() > PLAUSIBILITY_TIE_EPSILON {
        return b
            .plausibility
            .partial_cmp(&a.plausibility)
            .unwrap_or(Ordering::Equal);
    }
    if (a.robustness - b.robustness).abs() > PLAUSIBILITY_TIE_EPSILON {
        return b
            .robustness
            .partial_cmp(&a.robustness)
            .unwrap_or(Ordering::Equal);
    }
    a.node.id().cmp(b.node.id())
}

// =============================================================================
// PHASE 1: PREDICATE EVALUATION
// =============================================================================

/// Evaluate every buffered sample in arrival order.
fn evaluate_signal_trace(
    model: &RtfpgModel,
    ingestor: &SignalIngestor,
    node_states: &mut BTreeMap<String, NodeState>,
) {
    for sample in ingestor.samples() {
        // An explicit is_failure_mode flag always wins; otherwise a sample
        // is a sensor reading iff its parameter id names a known signal.
        let is_sensor_reading =
            !sample.is_failure_mode && model.signal_by_source(&sample.parameter_id).is_some();

        if is_sensor_reading {
            apply_sensor_reading(model, node_states, sample);
        } else {
            apply_fault_injection(model, node_states, sample);
        }
    }
}

/// Update robustness of every discrepancy watching this sample's signal,
/// activating those whose predicate and gate conditions hold.
fn apply_sensor_reading(
    model: &RtfpgModel,
    node_states: &mut BTreeMap<String, NodeState>,
    sample: &DataSample,
) {
    for node in model.nodes() {
        let Node::Discrepancy {
            id,
            name,
            gate_type,
            predicate,
            ..
        } = node
        else {
            continue;
        };
        // A predicate referencing an unknown signal can never activate.
        let Some(signal) = model.signal(&predicate.signal_ref) else {
            continue;
        };
        if signal.source_name != sample.parameter_id {
            continue;
        }

        let robustness = calculate_robustness(predicate, sample.value, signal);
        let already_active = node_states.get(id).is_some_and(|s| s.is_active);

        // Robustness tracks the most recent observation (sign included)
        // until activation latches it.
        if !already_active {
            if let Some(state) = node_states.get_mut(id) {
                state.robustness = robustness;
            }
        }

        if robustness > 0.0 && !already_active {
            let condition_met = match gate_type {
                GateType::Or => true,
                GateType::And => model.edges_into(id).all(|edge| {
                    node_states.get(&edge.from).is_some_and(|parent| {
                        parent.is_active && parent.activation_time_ms <= sample.timestamp_ms
                    })
                }),
            };

            if condition_met {
                if let Some(state) = node_states.get_mut(id) {
                    state.is_active = true;
                    state.robustness = robustness;
                    state.activation_time_ms = sample.timestamp_ms;
                    state.trigger_value = sample.value;
                }
                tracing::debug!(
                    node = %id,
                    name = %name,
                    time_ms = sample.timestamp_ms,
                    signal = %signal.source_name,
                    value = sample.value,
                    "discrepancy activated"
                );
            }
        }
    }
}

/// Activate a node targeted directly by a fault injection. The target
/// resolves by node id first, then by node name; unresolvable targets and
/// non-positive values are no-ops.
fn apply_fault_injection(
    model: &RtfpgModel,
    node_states: &mut BTreeMap<String, NodeState>,
    sample: &DataSample,
) {
    let target_id = if node_states.contains_key(&sample.parameter_id) {
        Some(sample.parameter_id.clone())
    } else {
        model
            .nodes()
            .iter()
            .find(|node| node.name() == sample.parameter_id)
            .map(|node| node.id().to_string())
    };
    let Some(target_id) = target_id else {
        return;
    };
    let Some(state) = node_states.get_mut(&target_id) else {
        return;
    };

    if !state.is_active && sample.value > 0.0 {
        state.is_active = true;
        state.activation_time_ms = sample.timestamp_ms;
        state.trigger_value = sample.value;
        tracing::debug!(
            node = %target_id,
            time_ms = sample.timestamp_ms,
            "fault injected"
        );
    }
}

// =============================================================================
// PHASE 2: BACKWARD PROPAGATION
// =============================================================================

/// Trace incoming edges from an active symptom toward root causes.
///
/// Failure-mode parents are always collected. Discrepancy parents are
/// followed only when active and when the activation-time delta lies within
/// the edge's timing interval; a child that activated before its parent is
/// never consistent. The per-root visited set bounds work on shared
/// ancestries without losing any reachable failure mode.
fn backward_propagate(
    model: &RtfpgModel,
    node_states: &BTreeMap<String, NodeState>,
    current_id: &str,
    visited: &mut BTreeSet<String>,
    candidates: &mut BTreeSet<String>,
) {
    for edge in model.edges_into(current_id) {
        let Some(parent) = model.node(&edge.from) else {
            continue;
        };
        if parent.is_failure_mode() {
            candidates.insert(edge.from.clone());
            continue;
        }
        if visited.contains(&edge.from) {
            continue;
        }
        let Some(parent_state) = node_states.get(&edge.from) else {
            continue;
        };
        if !parent_state.is_active {
            continue;
        }
        let t_child = node_states
            .get(current_id)
            .map_or(0, |s| s.activation_time_ms);
        let Some(delta) = t_child.checked_sub(parent_state.activation_time_ms) else {
            continue;
        };
        if delta >= edge.time_min_ms && delta <= edge.time_max_ms {
            visited.insert(edge.from.clone());
            backward_propagate(model, node_states, &edge.from, visited, candidates);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
