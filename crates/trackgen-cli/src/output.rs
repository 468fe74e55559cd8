//! Sample and summary output.

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;
use trackgen_core::{Sample, TrackSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON array
    Json,
    /// One JSON object per line
    Ndjson,
}

/// Headline numbers for a synthesized track.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub name: String,
    pub plan_length_m: f64,
    pub track_length_m: f64,
    pub turns: usize,
    pub duration_s: f64,
    pub samples: usize,
    pub turbulence_events: usize,
}

impl RunSummary {
    pub fn new(name: &str, set: &TrackSet, samples: usize) -> Self {
        Self {
            name: name.to_string(),
            plan_length_m: set.lateral_plan.length(),
            track_length_m: set.lateral_track.length(),
            turns: set.lateral_track.segments().iter().filter(|s| s.is_turn()).count(),
            duration_s: set.duration(),
            samples,
            turbulence_events: set.weather_track.turbulence_events().len(),
        }
    }
}

pub fn write_samples<W: Write>(mut out: W, samples: &[Sample], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, samples)?;
            writeln!(out)?;
        }
        OutputFormat::Ndjson => {
            for sample in samples {
                serde_json::to_writer(&mut out, sample)?;
                writeln!(out)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackgen_core::{sample_parallel, synthesize, TrackConfig};

    use crate::sim::create_departure_scenario;

    #[test]
    fn ndjson_writes_one_line_per_sample() {
        let scenario = create_departure_scenario(47.45, -122.30);
        let set = synthesize(&scenario.input, &TrackConfig::default()).unwrap();
        let samples = sample_parallel(&set, 2, 10.0).unwrap();

        let mut buffer = Vec::new();
        write_samples(&mut buffer, &samples, OutputFormat::Ndjson).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), samples.len());
        let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(first["elapsed_s"], 0.0);
    }
}
