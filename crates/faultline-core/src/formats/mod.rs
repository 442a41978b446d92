//! # Formats
//!
//! Document formats at the CORE boundary. Pure parse/serialize only;
//! file I/O lives in the app layer.
//!
//! - `document`: the model document (signals / nodes / edges)
//! - `stream`: the scenario envelope carrying the sample stream

pub mod document;
pub mod stream;

pub use document::{model_from_json, ModelDocument};
pub use stream::{scenario_from_json, ScenarioDocument, StreamEntry};
