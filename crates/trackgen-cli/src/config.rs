//! Run settings from environment.

use std::env;
use std::path::PathBuf;
use std::thread;

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Sampling workers, one time window each
    pub workers: usize,
    /// Seconds between samples
    pub cycle_s: f64,
    /// Optional JSON file with synthesis settings
    pub track_config: Option<PathBuf>,
    pub log_json: bool,
}

impl RunConfig {
    pub fn from_env() -> Self {
        Self {
            workers: env::var("TRACKGEN_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or_else(default_workers),
            cycle_s: env::var("TRACKGEN_CYCLE_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|c: &f64| *c > 0.0)
                .unwrap_or(1.0),
            track_config: env::var("TRACKGEN_CONFIG").ok().map(PathBuf::from),
            log_json: env::var("TRACKGEN_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
