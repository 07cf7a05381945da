//! duoq command-line interface
//!
//! Runs the flip experiment with the grid flavor, then with the register
//! flavor, and prints both circuits and outcomes.

use clap::{Parser, ValueEnum};
use duoq::flavors::register::QASM_SIMULATOR;
use duoq::pipeline::{run_comparison, run_grid_pipeline, run_register_pipeline};
use duoq::{ExperimentConfig, Gate, GridToolkit, RegisterToolkit};
use std::io::{self, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Pipeline {
    Grid,
    Register,
    Both,
}

/// Compare grid-style and register-style circuit building on one experiment
#[derive(Parser)]
#[command(name = "duoq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Repetitions (shots) per pipeline
    #[arg(short, long, env = "DUOQ_REPETITIONS", default_value = "10")]
    repetitions: usize,

    /// Number of qubits; every gate is applied to each of them
    #[arg(short, long, env = "DUOQ_QUBITS", default_value = "1")]
    qubits: usize,

    /// Gate to apply (i, x, y, z, h). Repeat for a sequence.
    #[arg(short, long = "gate", default_value = "x")]
    gates: Vec<Gate>,

    /// Seed for reproducible sampling
    #[arg(long, env = "DUOQ_SEED")]
    seed: Option<u64>,

    /// Backend the register pipeline executes on
    #[arg(long, default_value = QASM_SIMULATOR)]
    backend: String,

    /// Which pipeline(s) to run
    #[arg(long, value_enum, default_value_t = Pipeline::Both)]
    pipeline: Pipeline,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = ExperimentConfig::new(cli.repetitions, cli.qubits, cli.gates, cli.seed)?;
    let grid = GridToolkit::new().with_seed(config.seed());
    let register = RegisterToolkit::new().with_seed(config.seed()).with_backend(cli.backend);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.pipeline {
        Pipeline::Grid => {
            run_grid_pipeline(&grid, &config, &mut out)?;
        }
        Pipeline::Register => {
            run_register_pipeline(&register, &config, &mut out)?;
        }
        Pipeline::Both => {
            let comparison = run_comparison(&grid, &register, &config, &mut out)?;
            if comparison.agree() {
                info!("Both flavors produced {}", comparison.register);
            }
        }
    }
    out.flush()?;
    Ok(())
}
