//! Orrery DST Simulator CLI
//!
//! Run deterministic simulation tests with chaos engineering scenarios.

use clap::Parser;
use orrery_sim::scenarios::ScenarioId;
use orrery_sim::{ScenarioResult, ScenarioRunner, SimExport};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Orrery Deterministic Simulation Testing CLI
#[derive(Parser, Debug)]
#[command(name = "orrery-sim")]
#[command(about = "Run deterministic playback simulations for the orrery viewer", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of bodies in the simulated run
    #[arg(short, long, default_value = "4")]
    bodies: usize,

    /// Scenario to run (steady, jitter, flaky_stream, pause_churn, visibility_churn, corrupt_feed, backlog, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of random seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Maximum simulation duration in seconds
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export recorded frames of a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Record every n-th frame when exporting
    #[arg(long, default_value = "10")]
    export_every: u64,
}

fn report(result: &ScenarioResult) {
    if result.passed {
        info!("✓ {} (seed={}) PASSED", result.scenario.name(), result.seed);
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

fn run_with_export(runner: &ScenarioRunner, scenario: ScenarioId, seed: u64, path: &str) -> ScenarioResult {
    let (result, recorder) = runner.run_recorded(scenario);

    let mut export = SimExport::new(scenario.name(), seed);
    for frame in recorder.into_frames() {
        export.add_frame(frame);
    }
    let metrics = serde_json::to_value(&result.metrics).unwrap_or_default();
    export.finalize(result.passed, result.failure_reason.clone(), metrics);

    match export.write_to_file(path) {
        Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path),
        Err(e) => error!("Failed to write export: {:?}", e),
    }
    result
}

fn print_json_summary(results: &[ScenarioResult]) {
    let failed = results.iter().filter(|r| !r.passed).count();
    let summary = serde_json::json!({
        "total": results.len(),
        "passed": results.len() - failed,
        "failed": failed,
        "results": results.iter().map(|r| {
            serde_json::json!({
                "scenario": r.scenario.name(),
                "seed": r.seed,
                "passed": r.passed,
                "ticks": r.total_ticks,
                "time_secs": r.final_time_secs,
                "failure_reason": r.failure_reason,
                "metrics": r.metrics,
            })
        }).collect::<Vec<_>>(),
    });
    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{}", text),
        Err(e) => error!("Failed to encode summary: {}", e),
    }
}

fn log_summary(results: &[ScenarioResult]) {
    let failures: Vec<&ScenarioResult> = results.iter().filter(|r| !r.passed).collect();
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if failures.is_empty() {
        info!("✅ All {} scenario runs passed!", results.len());
        return;
    }
    error!("❌ {}/{} scenario runs failed!", failures.len(), results.len());
    for result in failures {
        error!(
            "  - {} seed={}: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Orrery DST Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
            eprintln!("Available scenarios: {}, all", names.join(", "));
            std::process::exit(1);
        })]
    };

    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        let runner = ScenarioRunner::new(base_seed, args.bodies)
            .with_duration(args.duration)
            .with_recording(args.export_every);
        let result = run_with_export(&runner, scenarios[0], base_seed, export_path);
        report(&result);

        if !result.passed {
            std::process::exit(1);
        }
        return;
    }

    let results: Vec<ScenarioResult> = (0..args.seeds as u64)
        .map(|offset| base_seed.wrapping_add(offset))
        .flat_map(|seed| {
            let runner = ScenarioRunner::new(seed, args.bodies).with_duration(args.duration);
            scenarios.iter().map(move |scenario| runner.run(*scenario)).collect::<Vec<_>>()
        })
        .inspect(|result| {
            if !args.json {
                report(result);
            }
        })
        .collect();

    let failed_count = results.iter().filter(|r| !r.passed).count();
    if args.json {
        print_json_summary(&results);
    } else {
        log_summary(&results);
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
