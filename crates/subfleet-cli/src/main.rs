//! # subfleet
//!
//! Runs a fleet loaded from a data directory and reports on it.
//!
//! ```text
//! subfleet --data ./data run --parallel
//! subfleet --data ./data fire --id 12345678-901
//! subfleet --data ./data proof --id 12345678-901 --date 2025-09-01
//! subfleet --data ./data activate --id 12345678-901 --proof <HEX> --date 2025-09-01
//! subfleet --data ./data generate --seed 7 --count 20 --moves 50
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod output;

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use subfleet_core::analysis::distance_extremes;
use subfleet_core::scenario::random_scripts;
use subfleet_core::{
    ActivationGate, EntityId, ReferenceDate, RunSummary, Simulation, SimulationConfig,
};
use subfleet_data::{
    write_movement_reports, DataLayout, DigestVerifier, MovementReports, SecretStore,
    SensorAnalyzer, SensorSummary,
};
use tracing::info;

use crate::output::{fire_control_line, render_decision, render_run, RunReport};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory holding MovementReports/, SensorData/ and Secrets/
    #[arg(long, value_name = "DIR", default_value = ".")]
    data: PathBuf,

    /// Simulation config (JSON); flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum valid moves read per movement report
    #[arg(long, value_name = "LINES")]
    max_lines: Option<usize>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Default, Args)]
struct RunArgs {
    /// Step submarines on the rayon pool
    #[arg(long)]
    parallel: bool,

    /// Pause between rounds
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Stop after this many rounds
    #[arg(long, value_name = "N")]
    max_rounds: Option<u64>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run to completion and print the full report
    Run(RunArgs),

    /// Run, then print the fire-control report for one submarine
    Fire {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Run, then evaluate an activation request
    Activate {
        #[arg(long)]
        id: String,
        /// Hex proof issued by `proof`
        #[arg(long)]
        proof: String,
        /// Reference date (YYYY-MM-DD)
        #[arg(long)]
        date: ReferenceDate,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the activation proof for a submarine
    Proof {
        #[arg(long)]
        id: String,
        /// Reference date (YYYY-MM-DD)
        #[arg(long)]
        date: ReferenceDate,
    },

    /// Write synthetic movement reports
    Generate {
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 10)]
        count: usize,
        #[arg(long, default_value_t = 20)]
        moves: usize,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> Result<ExitCode> {
    let mut layout = DataLayout::new(&cli.data);
    if let Some(max_lines) = cli.max_lines {
        layout = layout.with_max_lines(max_lines);
    }

    match &cli.command {
        Command::Run(args) => {
            let run = simulate(cli, &layout, args)?;
            let report = RunReport {
                distances: distance_extremes(&run.summary.final_state),
                fire_control: run
                    .summary
                    .survivors
                    .iter()
                    .map(|id| run.sim.fire_control(id.as_str()))
                    .collect::<Result<_, _>>()?,
                summary: run.summary,
                sensors: run.sensors,
            };
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_run(&report));
            }
        }
        Command::Fire { id, run } => {
            let done = simulate(cli, &layout, run)?;
            let report = done.sim.fire_control(id)?;
            if run.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", fire_control_line(&report));
            }
        }
        Command::Activate {
            id,
            proof,
            date,
            run,
        } => {
            let verifier = load_verifier(&layout)?;
            let done = simulate(cli, &layout, run)?;
            let gate = ActivationGate::new(verifier);
            let decision = done.sim.request_activation(&gate, id, proof, *date)?;
            if run.json {
                println!("{}", serde_json::to_string_pretty(&decision)?);
            } else {
                print!("{}", render_decision(&decision));
            }
            if !decision.allowed() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Proof { id, date } => {
            let verifier = load_verifier(&layout)?;
            let proof = verifier.proof_for(&EntityId::new(id.as_str()), *date)?;
            println!("{proof}");
        }
        Command::Generate { seed, count, moves } => {
            let scripts = random_scripts(*seed, *count, *moves);
            let written = write_movement_reports(&layout, &scripts)
                .with_context(|| format!("writing reports under {}", cli.data.display()))?;
            println!("wrote {written} movement reports to {}", layout.movement_dir().display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

struct CompletedRun {
    sim: Simulation,
    summary: RunSummary,
    sensors: Vec<SensorSummary>,
}

fn simulation_config(cli: &Cli, args: &RunArgs) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    if args.parallel {
        config.scheduling = subfleet_core::Scheduling::Parallel;
    }
    if let Some(ms) = args.delay_ms {
        config = config.with_round_delay(Duration::from_millis(ms));
    }
    if let Some(max) = args.max_rounds {
        config = config.with_max_rounds(max);
    }
    Ok(config)
}

fn load_verifier(layout: &DataLayout) -> Result<DigestVerifier> {
    let store = SecretStore::load(layout).context("loading secrets")?;
    Ok(DigestVerifier::new(store))
}

fn simulate(cli: &Cli, layout: &DataLayout, args: &RunArgs) -> Result<CompletedRun> {
    layout
        .validate()
        .with_context(|| format!("data directory {}", layout.root.display()))?;
    let config = simulation_config(cli, args)?;

    let reports = MovementReports::new(layout.clone());
    let ids = reports
        .try_entity_ids()
        .context("listing movement reports")?;
    if ids.is_empty() {
        bail!("no movement reports in {}", layout.movement_dir().display());
    }
    info!(submarines = ids.len(), scheduling = ?config.scheduling, "loading fleet");

    let mut sim = Simulation::from_source(&reports, config);
    let mut sensors = SensorAnalyzer::new();
    sensors.attach(layout, &ids);

    let summary = sim.run_with(|report, fleet| {
        sensors.process_round(report.round, fleet.as_slice());
        ControlFlow::Continue(())
    });

    Ok(CompletedRun {
        sim,
        summary,
        sensors: sensors.summary(),
    })
}
