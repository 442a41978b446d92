//! # faultline-core
//!
//! The deterministic rTFPG Engine for faultline - THE LOGIC.
//!
//! This crate implements the CORE of a real-time model-based fault
//! diagnosis and prognosis system built on a refined Timed Failure
//! Propagation Graph:
//!
//! - `model`: the static graph of failure modes, discrepancies, and timed
//!   propagation edges (mutable only during refinement)
//! - `ingestor`: the append-only sample buffer with a parameter-id registry
//! - `engine`: predicate evaluation and backward/forward hypothesis
//!   tracking (diagnosis)
//! - `prognosis`: shortest timed path from the active front to the
//!   criticality front (time-to-criticality)
//! - `refine`: offline graph refinement against a labeled dataset
//! - `formats`: the model document and scenario stream wire forms
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is single-threaded and synchronous; one sample per logical tick
//! - Recomputes node states from the full buffer on every engine run
//!   (sample handling is idempotent)
//! - Performs no file or network I/O; documents come in as text, reports
//!   go out as data
//! - Never aborts mid-run: every sample either updates state or is ignored

// =============================================================================
// MODULES
// =============================================================================

pub mod engine;
pub mod formats;
pub mod ingestor;
pub mod model;
pub mod primitives;
pub mod prognosis;
pub mod refine;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ComparisonOp, DataSample, DiagnosisResult, Edge, FaultlineError, GateType, Node, NodeState,
    Predicate, PrognosisResult, Signal, SymptomStatus,
};

// =============================================================================
// RE-EXPORTS: Reasoners
// =============================================================================

pub use engine::{calculate_robustness, LogicEngine};
pub use ingestor::SignalIngestor;
pub use model::RtfpgModel;
pub use prognosis::PrognosisManager;
pub use refine::{LabeledTrace, RefinementOptimizer};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{model_from_json, scenario_from_json, ModelDocument, ScenarioDocument};
