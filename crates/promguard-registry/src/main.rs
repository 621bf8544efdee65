//! promguard-render
//!
//! Loads a registry config, pre-registers the declared metrics and prints the
//! Prometheus text exposition to stdout.
//! Usage: promguard-render [config.yaml]   (default: promguard.yaml)

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use promguard_core::error::Result;
use promguard_registry::{config, MetricsRegistry};

fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "promguard.yaml".to_string());
    match run(&path) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(%path, code = e.kind().as_str(), error = %e, "render failed");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &str) -> Result<String> {
    let cfg = config::load_from_file(path)?;
    let (registry, _streams) = MetricsRegistry::from_config(&cfg)?;
    registry.render()
}
