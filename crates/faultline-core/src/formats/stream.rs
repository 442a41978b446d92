//! # Scenario Stream
//!
//! Wire form of the sample stream: an envelope with a `scenario_id` and a
//! `data_stream` array. Entries are either inline comment blocks (skipped)
//! or samples; boolean values map to 1.0 / 0.0 so every signal is treated
//! as continuous downstream.

use crate::{DataSample, FaultlineError};
use serde::{Deserialize, Serialize};

/// One `data_stream` entry.
///
/// The `Comment` variant must come first: any object carrying a `comment`
/// key is documentation, even if it also carries sample-shaped fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEntry {
    Comment {
        comment: serde_json::Value,
    },
    Sample {
        timestamp_ms: u64,
        parameter_id: String,
        value: SampleValue,
        #[serde(default)]
        is_failure_mode: bool,
    },
}

/// Sample payload: the stream carries booleans for discrete events and
/// numbers for sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Bool(bool),
    Number(f64),
}

impl SampleValue {
    /// Continuous view of the payload (`true` -> 1.0, `false` -> 0.0).
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Bool(true) => 1.0,
            Self::Bool(false) => 0.0,
            Self::Number(n) => n,
        }
    }
}

/// Scenario envelope around the sample stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDocument {
    pub scenario_id: String,
    #[serde(default)]
    pub data_stream: Vec<StreamEntry>,
}

impl ScenarioDocument {
    /// The samples of the stream in declaration order, comments skipped.
    #[must_use]
    pub fn samples(&self) -> Vec<DataSample> {
        self.data_stream
            .iter()
            .filter_map(|entry| match entry {
                StreamEntry::Comment { .. } => None,
                StreamEntry::Sample {
                    timestamp_ms,
                    parameter_id,
                    value,
                    is_failure_mode,
                } => Some(DataSample {
                    timestamp_ms: *timestamp_ms,
                    parameter_id: parameter_id.clone(),
                    value: value.as_f64(),
                    is_failure_mode: *is_failure_mode,
                }),
            })
            .collect()
    }
}

/// Parse a scenario document from JSON text.
pub fn scenario_from_json(text: &str) -> Result<ScenarioDocument, FaultlineError> {
    serde_json::from_str(text).map_err(|e| FaultlineError::Parse(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
