//! Demo Scenario - synthesize a built-in plan and print its progress.
//!
//! Usage:
//!   cargo run -p trackgen-cli --bin demo_scenario -- --scenario departure

use clap::{Parser, ValueEnum};
use trackgen_cli::sim::{create_departure_scenario, create_holding_scenario, create_taxi_scenario};
use trackgen_cli::{init_tracing, load_track_config, RunConfig, RunSummary};
use trackgen_core::{sample_parallel, synthesize};

/// Available demo scenarios
#[derive(Debug, Clone, ValueEnum)]
enum ScenarioType {
    /// Taxi, take-off, climb and two turn-outs
    Departure,
    /// Out-and-back with a course reversal
    Holding,
    /// Ground movement around an authored corner
    Taxi,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Synthesize and sample a built-in scenario")]
struct Args {
    #[arg(long, value_enum, default_value = "departure")]
    scenario: ScenarioType,

    /// Start latitude (default: Irvine, CA)
    #[arg(long, default_value_t = 33.6846)]
    lat: f64,

    /// Start longitude (default: Irvine, CA)
    #[arg(long, default_value_t = -117.8265)]
    lon: f64,

    /// Seconds between printed samples
    #[arg(long, default_value_t = 10.0)]
    cycle: f64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let env = RunConfig::from_env();
    init_tracing("trackgen_core=debug", env.log_json)?;

    let scenario = match args.scenario {
        ScenarioType::Departure => create_departure_scenario(args.lat, args.lon),
        ScenarioType::Holding => create_holding_scenario(args.lat, args.lon),
        ScenarioType::Taxi => create_taxi_scenario(args.lat, args.lon),
    };
    let config = load_track_config(env.track_config.as_deref())?;

    println!("\nScenario: {}", scenario.name);
    let set = synthesize(&scenario.input, &config)?;
    let samples = sample_parallel(&set, env.workers, args.cycle)?;

    for sample in &samples {
        println!(
            "[{:7.1}s] ({:.6}, {:.6}) hdg {:5.1} spd {:5.1} m/s alt {:6.1} m wind {:4.1} m/s",
            sample.elapsed_s,
            sample.position.lat,
            sample.position.lon,
            sample.heading_deg,
            sample.speed_mps,
            sample.altitude_m,
            sample.wind_speed_mps,
        );
    }

    let summary = RunSummary::new(&scenario.name, &set, samples.len());
    println!(
        "\nPlan {:.0} m, track {:.0} m, {} turns, {:.1} s, {} samples, {} turbulence events",
        summary.plan_length_m,
        summary.track_length_m,
        summary.turns,
        summary.duration_s,
        summary.samples,
        summary.turbulence_events,
    );
    Ok(())
}
