//! Synthesize a track from a JSON plan and write time-ordered samples.
//!
//! Usage:
//!   synthesize_track --plan plan.json --workers 4 --cycle 0.5 --format ndjson

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use trackgen_cli::{init_tracing, load_plan, load_track_config, write_samples, OutputFormat, RunConfig, RunSummary};
use trackgen_core::{sample_parallel, synthesize};

/// Synthesize a flyable track from a plan and sample it
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Plan JSON file
    #[arg(long)]
    plan: PathBuf,

    /// Synthesis settings JSON file (default: TRACKGEN_CONFIG, then built-in)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling workers (default: TRACKGEN_WORKERS, then CPU count)
    #[arg(long)]
    workers: Option<usize>,

    /// Seconds between samples (default: TRACKGEN_CYCLE_S, then 1.0)
    #[arg(long)]
    cycle: Option<f64>,

    /// Output file; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "ndjson")]
    format: OutputFormat,

    /// Print only the run summary
    #[arg(long, default_value_t = false)]
    summary: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let env = RunConfig::from_env();
    init_tracing("trackgen_core=info", env.log_json)?;

    let config_path = args.config.or(env.track_config);
    let config = load_track_config(config_path.as_deref())?;
    let input = load_plan(&args.plan)?;
    let workers = args.workers.unwrap_or(env.workers);
    let cycle_s = args.cycle.unwrap_or(env.cycle_s);

    let set = synthesize(&input, &config).with_context(|| format!("synthesizing {}", args.plan.display()))?;
    let samples = sample_parallel(&set, workers, cycle_s).context("sampling track")?;

    let summary = RunSummary::new(&input.name, &set, samples.len());
    tracing::info!(
        turns = summary.turns,
        duration_s = summary.duration_s,
        samples = summary.samples,
        "synthesis complete"
    );

    if args.summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    match args.output {
        Some(path) => {
            let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            write_samples(BufWriter::new(file), &samples, args.format)?;
        }
        None => write_samples(io::stdout().lock(), &samples, args.format)?,
    }
    Ok(())
}
