//! # Report Renderer
//!
//! Change detection and the three-tier diagnostic report block.
//!
//! A block is emitted after a sample iff (a) the active-symptom set
//! changed, (b) any hypothesis's robustness moved by more than the report
//! epsilon, or (c) the time-to-criticality crossed into overdue territory.

use faultline_core::primitives::{ROBUSTNESS_CHANGE_EPSILON, VERIFIED_PLAUSIBILITY};
use faultline_core::{
    DiagnosisResult, Node, NodeState, PrognosisManager, PrognosisResult, RtfpgModel, SymptomStatus,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

const SEPARATOR: &str =
    "==============================================================================";

// =============================================================================
// CHANGE DETECTION
// =============================================================================

/// Diagnostic picture of the previous tick, for change detection.
#[derive(Debug, Default)]
pub struct ReportState {
    prev_active_symptoms: BTreeSet<String>,
    prev_robustness: BTreeMap<String, f64>,
    prev_ttc: Option<f64>,
}

/// Ids of active discrepancies.
fn active_symptoms(model: &RtfpgModel, node_states: &BTreeMap<String, NodeState>) -> BTreeSet<String> {
    node_states
        .iter()
        .filter(|(id, state)| state.is_active && model.node(id).is_some_and(Node::is_discrepancy))
        .map(|(id, _)| id.clone())
        .collect()
}

impl ReportState {
    /// Fold in this tick's results; returns whether a block must be
    /// emitted.
    pub fn observe(
        &mut self,
        model: &RtfpgModel,
        node_states: &BTreeMap<String, NodeState>,
        diagnoses: &[DiagnosisResult],
        prognosis: &PrognosisResult,
    ) -> bool {
        let symptoms = active_symptoms(model, node_states);
        let robustness: BTreeMap<String, f64> = diagnoses
            .iter()
            .map(|d| (d.node.id().to_string(), d.robustness))
            .collect();

        let symptoms_changed = symptoms != self.prev_active_symptoms;

        let hypotheses_changed = robustness.len() != self.prev_robustness.len()
            || robustness.iter().any(|(id, &score)| {
                self.prev_robustness
                    .get(id)
                    .is_none_or(|prev| (prev - score).abs() > ROBUSTNESS_CHANGE_EPSILON)
            });

        let became_overdue = self
            .prev_ttc
            .is_some_and(|prev| prev > 0.0 && prognosis.ttc <= 0.0);

        self.prev_active_symptoms = symptoms;
        self.prev_robustness = robustness;
        self.prev_ttc = Some(prognosis.ttc);

        symptoms_changed || hypotheses_changed || became_overdue
    }
}

// =============================================================================
// RENDERING
// =============================================================================

/// Render one diagnostic report block.
#[must_use]
pub fn render_block(
    timestamp_ms: u64,
    model: &RtfpgModel,
    prognosis_manager: &PrognosisManager,
    node_states: &BTreeMap<String, NodeState>,
    diagnoses: &[DiagnosisResult],
    prognosis: &PrognosisResult,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{SEPARATOR}");
    let _ = writeln!(out, "[Time: {timestamp_ms}ms] DIAGNOSTIC REPORT");
    let _ = writeln!(out, "{SEPARATOR}");
    let _ = writeln!(out, "{}", prognosis_line(prognosis));

    // Tier 1: fully confirmed hypotheses.
    let _ = writeln!(out, "-- Tier 1: VERIFIED hypotheses --");
    let mut any = false;
    for diagnosis in diagnoses {
        if diagnosis.plausibility < VERIFIED_PLAUSIBILITY {
            continue;
        }
        any = true;
        let _ = writeln!(out, "{}", hypothesis_line(diagnosis));
        for symptom in &diagnosis.consistent_symptoms {
            let _ = writeln!(out, "{}", symptom_detail(model, node_states, symptom));
        }
    }
    if !any {
        let _ = writeln!(out, "  (none)");
    }

    // Tier 2: partial hypotheses with per-symptom chain status.
    let _ = writeln!(out, "-- Tier 2: partial hypotheses --");
    let mut any = false;
    for diagnosis in diagnoses {
        if diagnosis.plausibility >= VERIFIED_PLAUSIBILITY {
            continue;
        }
        any = true;
        let _ = writeln!(out, "{}", hypothesis_line(diagnosis));
        let statuses = prognosis_manager.classify_symptoms(diagnosis.node.id(), node_states);
        for symptom in &diagnosis.expected_symptoms {
            let status = statuses
                .get(symptom)
                .copied()
                .unwrap_or(SymptomStatus::Missing);
            match status {
                SymptomStatus::Confirmed => {
                    let time = node_states.get(symptom).map_or(0, |s| s.activation_time_ms);
                    let _ = writeln!(
                        out,
                        "  - {symptom}: {} (activated at t={time}ms)",
                        status.label()
                    );
                }
                _ => {
                    let _ = writeln!(out, "  - {symptom}: {}", status.label());
                }
            }
        }
    }
    if !any {
        let _ = writeln!(out, "  (none)");
    }

    // Tier 3: active symptoms no hypothesis accounts for.
    let _ = writeln!(out, "-- Tier 3: unclaimed active symptoms --");
    let claimed: BTreeSet<&String> = diagnoses
        .iter()
        .flat_map(|d| d.consistent_symptoms.iter())
        .collect();
    let mut any = false;
    for symptom in active_symptoms(model, node_states) {
        if claimed.contains(&symptom) {
            continue;
        }
        any = true;
        let time = node_states.get(&symptom).map_or(0, |s| s.activation_time_ms);
        let _ = writeln!(out, "  - {symptom}: activated at t={time}ms");
    }
    if !any {
        let _ = writeln!(out, "  (none)");
    }

    let _ = writeln!(out, "{SEPARATOR}");
    let _ = writeln!(out);
    out
}

fn prognosis_line(prognosis: &PrognosisResult) -> String {
    if !prognosis.is_reachable() {
        return "Prognosis: system stable; no critical failure path detected.".to_string();
    }
    if prognosis.ttc > 0.0 {
        format!(
            "Prognosis: WARNING: time-to-criticality {} ms (next critical node: {}).",
            prognosis.ttc, prognosis.critical_node_id
        )
    } else if prognosis.ttc == 0.0 {
        format!(
            "Prognosis: CRITICAL: criticality reached at node {}.",
            prognosis.critical_node_id
        )
    } else {
        format!(
            "Prognosis: OVERDUE: prediction overdue by {} ms (latent risk, node {}).",
            prognosis.ttc.abs(),
            prognosis.critical_node_id
        )
    }
}

fn hypothesis_line(diagnosis: &DiagnosisResult) -> String {
    format!(
        "  {} ({}) | plausibility {:.1}% | robustness {:.3} | {}/{} symptoms",
        diagnosis.node.id(),
        diagnosis.node.name(),
        diagnosis.plausibility * 100.0,
        diagnosis.robustness,
        diagnosis.consistent_symptoms.len(),
        diagnosis.expected_symptoms.len(),
    )
}

/// One observed-symptom line with its trigger context, e.g.
/// `  - D1: activated at t=10ms (temp: 60>50)`.
fn symptom_detail(
    model: &RtfpgModel,
    node_states: &BTreeMap<String, NodeState>,
    symptom: &str,
) -> String {
    let state = node_states.get(symptom).copied().unwrap_or_default();
    let mut line = format!("  - {symptom}: activated at t={}ms", state.activation_time_ms);

    if let Some(predicate) = model.node(symptom).and_then(Node::predicate) {
        let signal_name = model
            .signal(&predicate.signal_ref)
            .map_or(predicate.signal_ref.as_str(), |s| s.source_name.as_str());
        let _ = write!(
            line,
            " ({signal_name}: {}{}{})",
            state.trigger_value,
            predicate.op.symbol(),
            predicate.threshold
        );
    }
    line
}

// =============================================================================
// TESTS
// =============================================================================
