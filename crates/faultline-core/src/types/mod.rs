//! # Core Type Definitions
//!
//! This module contains all core types for the faultline rTFPG substrate:
//! - Model entities (`Signal`, `Node`, `Edge`, `Predicate`)
//! - Stream input (`DataSample`)
//! - Reasoner output (`NodeState`, `DiagnosisResult`, `PrognosisResult`,
//!   `SymptomStatus`)
//! - Error types (`FaultlineError`)
//!
//! ## Determinism Guarantees
//!
//! All keyed collections in result types use `BTreeMap`/`BTreeSet` so that
//! iteration order (and therefore report output) is stable across runs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// =============================================================================
// SIGNALS
// =============================================================================

/// A sensor signal declared in the model document.
///
/// `source_name` is the identifier that appears in data-stream samples;
/// `id` is how discrepancy predicates reference the signal. The numeric
/// range normalizes robustness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub source_name: String,
    #[serde(rename = "type")]
    pub signal_type: String,
    pub units: String,
    #[serde(default = "Signal::default_range_min")]
    pub range_min: f64,
    #[serde(default = "Signal::default_range_max")]
    pub range_max: f64,
}

impl Signal {
    fn default_range_min() -> f64 {
        0.0
    }

    fn default_range_max() -> f64 {
        1.0
    }

    /// Width of the operating range.
    #[must_use]
    pub fn range_width(&self) -> f64 {
        self.range_max - self.range_min
    }

    /// A range narrower than `DEGENERATE_RANGE_EPSILON` cannot normalize
    /// robustness; callers fall back to the raw margin.
    #[must_use]
    pub fn is_degenerate_range(&self) -> bool {
        self.range_width() <= crate::primitives::DEGENERATE_RANGE_EPSILON
    }
}

// =============================================================================
// PREDICATES
// =============================================================================

/// Comparison operator of a discrepancy predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl ComparisonOp {
    /// Signed satisfaction margin of `value` against `threshold`.
    ///
    /// Positive when the comparison holds, negative when violated. The
    /// magnitude is the distance to the threshold, before range
    /// normalization.
    #[must_use]
    pub fn raw_margin(self, value: f64, threshold: f64) -> f64 {
        match self {
            Self::Gt | Self::Ge => value - threshold,
            Self::Lt | Self::Le => threshold - value,
        }
    }

    /// Wire name of the operator, as it appears in model documents.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }
}

/// Activation condition of a discrepancy: a comparison of one signal
/// against a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub signal_ref: String,
    #[serde(rename = "operator")]
    pub op: ComparisonOp,
    pub threshold: f64,
}

// =============================================================================
// NODES
// =============================================================================

/// Gate semantics of a discrepancy node.
///
/// An `And` node requires every parent to be active (at or before the
/// triggering sample) in addition to its predicate holding; an `Or` node
/// activates on its predicate alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateType {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// A node of the propagation graph.
///
/// The tagged sum makes illegal states unrepresentable: only discrepancies
/// carry a gate and a predicate, so no consumer can read either off a
/// failure mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    /// Root-cause node, activated only by explicit fault injection.
    FailureMode {
        id: String,
        name: String,
        #[serde(default)]
        criticality_level: i32,
    },
    /// Observable symptom node with a numeric predicate over a signal.
    Discrepancy {
        id: String,
        name: String,
        #[serde(default)]
        criticality_level: i32,
        gate_type: GateType,
        predicate: Predicate,
    },
}

impl Node {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::FailureMode { id, .. } | Self::Discrepancy { id, .. } => id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::FailureMode { name, .. } | Self::Discrepancy { name, .. } => name,
        }
    }

    #[must_use]
    pub fn criticality_level(&self) -> i32 {
        match self {
            Self::FailureMode {
                criticality_level, ..
            }
            | Self::Discrepancy {
                criticality_level, ..
            } => *criticality_level,
        }
    }

    /// Gate type, present only on discrepancies.
    #[must_use]
    pub fn gate_type(&self) -> Option<GateType> {
        match self {
            Self::Discrepancy { gate_type, .. } => Some(*gate_type),
            Self::FailureMode { .. } => None,
        }
    }

    /// Predicate, present only on discrepancies.
    #[must_use]
    pub fn predicate(&self) -> Option<&Predicate> {
        match self {
            Self::Discrepancy { predicate, .. } => Some(predicate),
            Self::FailureMode { .. } => None,
        }
    }

    #[must_use]
    pub fn is_discrepancy(&self) -> bool {
        matches!(self, Self::Discrepancy { .. })
    }

    #[must_use]
    pub fn is_failure_mode(&self) -> bool {
        matches!(self, Self::FailureMode { .. })
    }
}

// =============================================================================
// EDGES
// =============================================================================

/// Directed propagation edge with a closed timing interval.
///
/// In a causally consistent chain, the gap between parent activation and
/// child activation lies within `[time_min_ms, time_max_ms]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub time_min_ms: u64,
    pub time_max_ms: u64,
}

// =============================================================================
// DATA SAMPLES
// =============================================================================

/// One timestamped event from the input stream.
///
/// A sample whose `parameter_id` matches a signal's `source_name` is a
/// sensor reading; otherwise (or whenever `is_failure_mode` is set) it is a
/// fault injection targeting a node directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSample {
    pub timestamp_ms: u64,
    pub parameter_id: String,
    pub value: f64,
    #[serde(default)]
    pub is_failure_mode: bool,
}

// =============================================================================
// NODE STATE
// =============================================================================

/// Activation state of one node, rebuilt from scratch on every engine run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeState {
    pub is_active: bool,
    /// Most recent signed normalized margin. Latched on activation.
    pub robustness: f64,
    pub activation_time_ms: u64,
    /// Sample value that caused activation.
    pub trigger_value: f64,
}

// =============================================================================
// DIAGNOSIS & PROGNOSIS RESULTS
// =============================================================================

/// One ranked failure hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisResult {
    /// The candidate failure-mode node.
    pub node: Node,
    /// Fraction of expected symptoms observed active, in `[0, 1]`.
    pub plausibility: f64,
    /// Mean symptom robustness, clamped to `[-1, 1]`.
    pub robustness: f64,
    /// Every discrepancy reachable forward from the candidate.
    pub expected_symptoms: BTreeSet<String>,
    /// Observed (active) symptoms, in deterministic report order.
    pub consistent_symptoms: Vec<String>,
    /// Trigger value per observed symptom.
    pub symptom_values: BTreeMap<String, f64>,
}

/// Time-to-criticality projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PrognosisResult {
    /// Milliseconds until the criticality front is predicted to activate.
    /// `f64::INFINITY` when no critical node is reachable.
    pub ttc: f64,
    /// The predicted critical node, empty when unreachable.
    pub critical_node_id: String,
}

impl PrognosisResult {
    /// The "no critical node reachable" result.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            ttc: f64::INFINITY,
            critical_node_id: String::new(),
        }
    }

    /// Whether a critical node is reachable from the current state front.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.ttc.is_finite()
    }
}

/// Chain status of one expected symptom under a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SymptomStatus {
    /// Observed active.
    Confirmed,
    /// Inactive but downstream of an unbroken chain (propagation delay).
    Pending,
    /// Inactive behind a broken chain.
    Unreachable,
    /// No recorded state for the node.
    Missing,
}

impl SymptomStatus {
    /// Report label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Pending => "PENDING",
            Self::Unreachable => "UNREACHABLE",
            Self::Missing => "MISSING",
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors surfaced by the faultline core and driver.
///
/// Parsers raise; engines absorb. Reasoner entry points never return an
/// error mid-run: every sample either updates state or is ignored.
#[derive(Debug, Error)]
pub enum FaultlineError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// A document could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The model document violates a structural invariant.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// An operation referenced a node id absent from the graph.
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// An internal-id lookup was out of range (programmer error).
    #[error("Internal ID {0} out of range")]
    InternalIdOutOfRange(usize),

    /// The command line was malformed.
    #[error("Usage error: {0}")]
    Usage(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_margin_sign_matches_satisfaction() {
        assert_eq!(ComparisonOp::Gt.raw_margin(60.0, 50.0), 10.0);
        assert_eq!(ComparisonOp::Gt.raw_margin(40.0, 50.0), -10.0);
        assert_eq!(ComparisonOp::Lt.raw_margin(40.0, 50.0), 10.0);
        assert_eq!(ComparisonOp::Lt.raw_margin(60.0, 50.0), -10.0);
        assert_eq!(ComparisonOp::Ge.raw_margin(50.0, 50.0), 0.0);
        assert_eq!(ComparisonOp::Le.raw_margin(45.0, 50.0), 5.0);
    }

    #[test]
    fn failure_mode_has_no_gate_or_predicate() {
        let node = Node::FailureMode {
            id: "F1".to_string(),
            name: "Pump burnout".to_string(),
            criticality_level: 9,
        };
        assert!(node.gate_type().is_none());
        assert!(node.predicate().is_none());
        assert!(node.is_failure_mode());
        assert_eq!(node.criticality_level(), 9);
    }

    #[test]
    fn node_parses_from_tagged_document() {
        let json = r#"{
            "id": "D1",
            "name": "Overtemp",
            "type": "Discrepancy",
            "criticality_level": 3,
            "gate_type": "OR",
            "predicate": {"signal_ref": "S1", "operator": ">", "threshold": 50.0}
        }"#;
        let node: Node = serde_json::from_str(json).expect("parse");
        assert!(node.is_discrepancy());
        assert_eq!(node.gate_type(), Some(GateType::Or));
        assert_eq!(node.predicate().map(|p| p.op), Some(ComparisonOp::Gt));
    }

    #[test]
    fn degenerate_range_detected() {
        let mut signal = Signal {
            id: "S1".to_string(),
            source_name: "temp".to_string(),
            signal_type: "temperature".to_string(),
            units: "C".to_string(),
            range_min: 0.0,
            range_max: 100.0,
        };
        assert!(!signal.is_degenerate_range());
        signal.range_max = signal.range_min;
        assert!(signal.is_degenerate_range());
    }

    #[test]
    fn prognosis_unreachable_is_infinite() {
        let result = PrognosisResult::unreachable();
        assert!(!result.is_reachable());
        assert!(result.critical_node_id.is_empty());
    }

    #[test]
    fn symptom_status_labels() {
        assert_eq!(SymptomStatus::Confirmed.label(), "CONFIRMED");
        assert_eq!(SymptomStatus::Missing.label(), "MISSING");
    }
}
