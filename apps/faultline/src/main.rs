//! # faultline - rTFPG Fault Diagnosis & Prognosis
//!
//! The main binary for the faultline diagnosis engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                apps/faultline (THE BINARY)                 │
//! │                                                            │
//! │  ┌──────────────┐   ┌──────────────┐   ┌───────────────┐  │
//! │  │     CLI      │   │   Driver     │   │    Report     │  │
//! │  │   (clap)     │──▶│  tick loop   │──▶│   renderer    │  │
//! │  └──────────────┘   └──────┬───────┘   └───────────────┘  │
//! │                            ▼                               │
//! │                   ┌─────────────────┐                      │
//! │                   │ faultline-core  │                      │
//! │                   │  (THE LOGIC)    │                      │
//! │                   └─────────────────┘                      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! faultline <model.json> <stream.json> [criticality_threshold] [output.log]
//! ```

mod cli;
mod report;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing — FAULTLINE_LOG_FORMAT=json enables
    // machine-parseable output.
    let log_format = std::env::var("FAULTLINE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "faultline=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Argument-count violations and unparseable arguments exit 1.
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cli::execute(cli) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
