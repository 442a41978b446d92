//! # Model Document
//!
//! Wire form of the static graph definition. Parsing a document and
//! re-serializing the retained fields yields the same signals, nodes, and
//! edges (modulo order), which the round-trip tests pin down.

use crate::{Edge, FaultlineError, Node, RtfpgModel, Signal};
use serde::{Deserialize, Serialize};

/// Top-level model document: `signals[]`, `nodes[]`, `edges[]`.
///
/// Every section defaults to empty so partial documents parse; structural
/// validation happens in `RtfpgModel::from_parts`, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default)]
    pub signals: Vec<Signal>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl ModelDocument {
    /// Validate and index the document into a runtime model.
    pub fn into_model(self) -> Result<RtfpgModel, FaultlineError> {
        RtfpgModel::from_parts(self.signals, self.nodes, self.edges)
    }
}

impl From<&RtfpgModel> for ModelDocument {
    fn from(model: &RtfpgModel) -> Self {
        Self {
            signals: model.signals().to_vec(),
            nodes: model.nodes().to_vec(),
            edges: model.edges().to_vec(),
        }
    }
}

/// Parse a model document from JSON text and build the runtime model.
pub fn model_from_json(text: &str) -> Result<RtfpgModel, FaultlineError> {
    let document: ModelDocument =
        serde_json::from_str(text).map_err(|e| FaultlineError::Parse(e.to_string()))?;
    document.into_model()
}

// =============================================================================
// TESTS
// =============================================================================
