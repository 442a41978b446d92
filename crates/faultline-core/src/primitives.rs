//! # Innate Primitives
//!
//! Hardcoded runtime constants for the faultline CORE.
//!
//! These are compiled into the binary and immutable at runtime; every
//! tolerance the reasoners apply is defined here rather than scattered
//! through the call sites.

/// A signal range narrower than this cannot normalize robustness.
///
/// Predicate margins over such signals are reported raw.
pub const DEGENERATE_RANGE_EPSILON: f64 = 1e-9;

/// Two plausibility scores closer than this are considered tied and fall
/// through to the robustness comparison when ranking diagnoses.
pub const PLAUSIBILITY_TIE_EPSILON: f64 = 1e-6;

/// A diagnosis's robustness must move by more than this between ticks for
/// the driver to emit a new report block.
pub const ROBUSTNESS_CHANGE_EPSILON: f64 = 1e-6;

/// A hypothesis with plausibility at or above this is reported as VERIFIED
/// (Tier 1).
pub const VERIFIED_PLAUSIBILITY: f64 = 1.0;

/// Default criticality threshold for prognosis when the command line does
/// not supply one.
pub const DEFAULT_CRITICALITY_THRESHOLD: i32 = 5;

/// Timing interval assigned to edges introduced by the refinement
/// optimizer, in milliseconds.
pub const REFINEMENT_EDGE_INTERVAL_MS: (u64, u64) = (0, 1000);
