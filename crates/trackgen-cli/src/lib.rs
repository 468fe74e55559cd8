//! Trackgen CLI - command line tools for plan-to-track synthesis.
//!
//! Binaries:
//! - synthesize_track: synthesize and sample a plan read from JSON
//! - demo_scenario: run one of the built-in scenarios end to end

pub mod config;
pub mod output;
pub mod sim;

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trackgen_core::{PlanInput, TrackConfig};

pub use config::RunConfig;
pub use output::{write_samples, OutputFormat, RunSummary};

/// Install the global subscriber. Logs go to stderr so sample output on
/// stdout stays machine readable.
pub fn init_tracing(default_directive: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(default_directive.parse()?);
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
    Ok(())
}

/// Read a plan from a JSON file.
pub fn load_plan(path: &Path) -> anyhow::Result<PlanInput> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading plan {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing plan {}", path.display()))
}

/// Read synthesis settings from a JSON file, or use the defaults.
pub fn load_track_config(path: Option<&Path>) -> anyhow::Result<TrackConfig> {
    let Some(path) = path else {
        return Ok(TrackConfig::default());
    };
    let raw = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    TrackConfig::from_json(&raw).with_context(|| format!("parsing config {}", path.display()))
}
