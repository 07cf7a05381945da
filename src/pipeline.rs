// src/pipeline.rs

//! The experiment itself: build a circuit, print it, run it, print the
//! outcome. Once per flavor, against any [`QuantumToolkit`].

use crate::core::{BackendError, ConstructionError, QuantumError};
use crate::operations::Gate;
use crate::simulation::Counts;
use crate::simulation::engine::MAX_QUBITS;
use crate::toolkit::QuantumToolkit;
use std::io::{self, Write};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Printed by the grid pipeline when its flavor cannot build the circuit.
pub const FALLBACK_MESSAGE: &str = "Sorry, looks like you accidentally made black hole...";

/// Rejected experiment settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("repetitions must be at least 1")]
    ZeroRepetitions,

    #[error("the experiment needs at least one qubit")]
    ZeroQubits,

    #[error("{requested} qubits requested but at most {max} can be simulated")]
    TooManyQubits { requested: usize, max: usize },
}

/// Anything that can stop a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("circuit construction failed: {0}")]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Quantum(#[from] QuantumError),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// What to run: which gates, on how many qubits, how many times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentConfig {
    repetitions: usize,
    num_qubits: usize,
    gates: Vec<Gate>,
    seed: Option<u64>,
}

impl ExperimentConfig {
    pub fn new(repetitions: usize, num_qubits: usize, gates: Vec<Gate>, seed: Option<u64>) -> Result<Self, ConfigError> {
        if repetitions == 0 {
            return Err(ConfigError::ZeroRepetitions);
        }
        if num_qubits == 0 {
            return Err(ConfigError::ZeroQubits);
        }
        if num_qubits > MAX_QUBITS {
            return Err(ConfigError::TooManyQubits {
                requested: num_qubits,
                max: MAX_QUBITS,
            });
        }
        Ok(Self {
            repetitions,
            num_qubits,
            gates,
            seed,
        })
    }

    pub fn repetitions(&self) -> usize {
        self.repetitions
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Gates applied, in order, to every qubit before measurement.
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Every qubit is measured.
    pub fn measurement_targets(&self) -> Vec<usize> {
        (0..self.num_qubits).collect()
    }
}

impl Default for ExperimentConfig {
    /// One flip gate on one qubit, ten repetitions, unseeded.
    fn default() -> Self {
        Self {
            repetitions: 10,
            num_qubits: 1,
            gates: vec![Gate::X],
            seed: None,
        }
    }
}

/// Runs the experiment with the grid flavor's conventions.
///
/// Prints `Circuit:`, the diagram, `Results:` and the trial result. If the
/// toolkit lacks a capability the circuit needs, prints [`FALLBACK_MESSAGE`]
/// instead and returns `Ok(None)`. Every other failure is returned.
#[instrument(skip_all, fields(toolkit = toolkit.name()))]
pub fn run_grid_pipeline<T, W>(toolkit: &T, config: &ExperimentConfig, out: &mut W) -> Result<Option<Counts>, PipelineError>
where
    T: QuantumToolkit,
    W: Write,
{
    let circuit = match toolkit.build_circuit(config.gates(), &config.measurement_targets()) {
        Ok(circuit) => circuit,
        Err(err) if err.is_unsupported() => {
            warn!("{}", err);
            writeln!(out, "{}", FALLBACK_MESSAGE)?;
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    writeln!(out, "Circuit:")?;
    writeln!(out, "{}", toolkit.render(&circuit))?;

    info!("Running {} repetitions", config.repetitions());
    let outcome = toolkit.execute(&circuit, config.repetitions())?;

    writeln!(out, "Results:")?;
    writeln!(out, "{}", outcome)?;
    Ok(Some(toolkit.counts(&outcome)))
}

/// Runs the experiment with the register flavor's conventions.
///
/// Prints the diagram, then the counts. Nothing is caught here.
#[instrument(skip_all, fields(toolkit = toolkit.name()))]
pub fn run_register_pipeline<T, W>(toolkit: &T, config: &ExperimentConfig, out: &mut W) -> Result<Counts, PipelineError>
where
    T: QuantumToolkit,
    W: Write,
{
    let circuit = toolkit.build_circuit(config.gates(), &config.measurement_targets())?;
    writeln!(out, "{}", toolkit.render(&circuit))?;

    info!("Running {} shots", config.repetitions());
    let outcome = toolkit.execute(&circuit, config.repetitions())?;
    writeln!(out, "{}", outcome)?;
    Ok(toolkit.counts(&outcome))
}

/// Histograms from both pipelines of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// `None` when the grid pipeline fell back.
    pub grid: Option<Counts>,
    pub register: Counts,
}

impl Comparison {
    /// Whether both flavors saw the same histogram. Only meaningful for
    /// circuits whose outcome is deterministic.
    pub fn agree(&self) -> bool {
        self.grid.as_ref() == Some(&self.register)
    }
}

/// Runs the grid pipeline to completion, then the register pipeline.
pub fn run_comparison<G, R, W>(grid: &G, register: &R, config: &ExperimentConfig, out: &mut W) -> Result<Comparison, PipelineError>
where
    G: QuantumToolkit,
    R: QuantumToolkit,
    W: Write,
{
    let grid = run_grid_pipeline(grid, config, out)?;
    let register = run_register_pipeline(register, config, out)?;
    let comparison = Comparison { grid, register };
    info!(agree = comparison.agree(), "Both pipelines finished");
    Ok(comparison)
}
