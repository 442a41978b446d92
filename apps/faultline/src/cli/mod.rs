//! # faultline CLI Module
//!
//! Argument handling and the online driver loop.
//!
//! The surface is positional: `<model> <stream> [criticality_threshold]
//! [output_log_path]`. A third argument that does not parse as an integer
//! is interpreted as the output path, in which case a fourth argument is a
//! usage violation.

use clap::Parser;
use faultline_core::{
    model_from_json, scenario_from_json, FaultlineError, LogicEngine, PrognosisManager,
    SignalIngestor,
};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::report::{render_block, ReportState};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// faultline - real-time fault diagnosis and prognosis over an rTFPG.
///
/// Replays a scenario stream against a fault model and reports ranked
/// failure hypotheses plus time-to-criticality after every sample that
/// changes the diagnostic picture.
#[derive(Parser, Debug)]
#[command(name = "faultline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the fault model document (JSON)
    pub model: PathBuf,

    /// Path to the scenario stream document (JSON)
    pub stream: PathBuf,

    /// Criticality threshold (integer), or the output log path when not an
    /// integer
    pub threshold_or_output: Option<String>,

    /// Output log path (requires the third argument to be the threshold)
    pub output: Option<PathBuf>,
}

/// Fully resolved run configuration.
#[derive(Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub model_path: PathBuf,
    pub stream_path: PathBuf,
    pub criticality_threshold: i32,
    pub output_path: Option<PathBuf>,
}

impl Cli {
    /// Disambiguate the positional arguments into a run configuration.
    pub fn resolve(self) -> Result<RunConfig, FaultlineError> {
        let (criticality_threshold, output_path) = match (self.threshold_or_output, self.output) {
            (None, _) => (faultline_core::primitives::DEFAULT_CRITICALITY_THRESHOLD, None),
            (Some(third), output) => match third.parse::<i32>() {
                Ok(threshold) => (threshold, output),
                Err(_) => {
                    if output.is_some() {
                        return Err(FaultlineError::Usage(format!(
                            "'{third}' is not an integer threshold, so it names the \
                             output path and no further argument is accepted"
                        )));
                    }
                    (
                        faultline_core::primitives::DEFAULT_CRITICALITY_THRESHOLD,
                        Some(PathBuf::from(third)),
                    )
                }
            },
        };

        Ok(RunConfig {
            model_path: self.model,
            stream_path: self.stream,
            criticality_threshold,
            output_path,
        })
    }
}

// =============================================================================
// DRIVER
// =============================================================================

fn read_file(path: &Path) -> Result<String, FaultlineError> {
    std::fs::read_to_string(path)
        .map_err(|e| FaultlineError::Io(format!("cannot read '{}': {e}", path.display())))
}

/// Run the online loop: one sample per tick, diagnosis then prognosis,
/// report blocks on change.
pub fn execute(cli: Cli) -> Result<(), FaultlineError> {
    let config = cli.resolve()?;

    let model = model_from_json(&read_file(&config.model_path)?)?;
    let scenario = scenario_from_json(&read_file(&config.stream_path)?)?;

    tracing::info!(
        scenario = %scenario.scenario_id,
        nodes = model.nodes().len(),
        edges = model.edges().len(),
        threshold = config.criticality_threshold,
        "system initialized"
    );

    let mut writer: Box<dyn Write> = match &config.output_path {
        Some(path) => Box::new(std::fs::File::create(path).map_err(|e| {
            FaultlineError::Io(format!("cannot create '{}': {e}", path.display()))
        })?),
        None => Box::new(std::io::stdout()),
    };

    let mut ingestor = SignalIngestor::new(model.signals());
    let prognosis = PrognosisManager::new(&model);
    let mut report_state = ReportState::default();

    for sample in scenario.samples() {
        let timestamp_ms = sample.timestamp_ms;
        ingestor.ingest(sample);

        // Full recomputation per tick; state is rebuilt from the buffer.
        let mut engine = LogicEngine::new(&model, &ingestor);
        let diagnoses = engine.find_active_hypotheses();
        let result = prognosis.time_to_criticality(
            engine.node_states(),
            config.criticality_threshold,
            timestamp_ms,
        );

        if report_state.observe(&model, engine.node_states(), &diagnoses, &result) {
            let block = render_block(
                timestamp_ms,
                &model,
                &prognosis,
                engine.node_states(),
                &diagnoses,
                &result,
            );
            writer
                .write_all(block.as_bytes())
                .map_err(|e| FaultlineError::Io(e.to_string()))?;
        }
    }

    writer
        .flush()
        .map_err(|e| FaultlineError::Io(e.to_string()))?;
    tracing::info!("simulation complete");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse args")
    }

    #[test]
    fn defaults_apply_with_two_arguments() {
        let config = cli(&["faultline", "model.json", "stream.json"])
            .resolve()
            .expect("resolve");
        assert_eq!(config.criticality_threshold, 5);
        assert_eq!(config.output_path, None);
    }

    #[test]
    fn integer_third_argument_is_the_threshold() {
        let config = cli(&["faultline", "model.json", "stream.json", "7"])
            .resolve()
            .expect("resolve");
        assert_eq!(config.criticality_threshold, 7);
        assert_eq!(config.output_path, None);
    }

    #[test]
    fn non_integer_third_argument_is_the_output_path() {
        let config = cli(&["faultline", "model.json", "stream.json", "run.log"])
            .resolve()
            .expect("resolve");
        assert_eq!(config.criticality_threshold, 5);
        assert_eq!(config.output_path, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn threshold_and_output_both_accepted() {
        let config = cli(&["faultline", "model.json", "stream.json", "3", "run.log"])
            .resolve()
            .expect("resolve");
        assert_eq!(config.criticality_threshold, 3);
        assert_eq!(config.output_path, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn fourth_argument_after_output_path_is_rejected() {
        let result = cli(&["faultline", "model.json", "stream.json", "run.log", "extra"])
            .resolve();
        assert!(matches!(result, Err(FaultlineError::Usage(_))));
    }

    #[test]
    fn missing_arguments_fail_to_parse() {
        assert!(Cli::try_parse_from(["faultline", "model.json"]).is_err());
        assert!(Cli::try_parse_from(["faultline"]).is_err());
    }

    #[test]
    fn surplus_arguments_fail_to_parse() {
        assert!(Cli::try_parse_from([
            "faultline", "a.json", "b.json", "5", "out.log", "extra"
        ])
        .is_err());
    }
}
