// src/simulation/mod.rs

//! Noiseless state-vector simulation of [`Circuit`]s.
//!
//! [`Simulator`] is the entry point. Each repetition starts from `|0...0>`,
//! walks the circuit's operations in order and records every measurement
//! under its key.

mod results;
pub(crate) mod engine;

pub use results::{Counts, SimulationResult};

use crate::circuits::Circuit;
use crate::core::QuantumError;
use crate::operations::Operation;
use engine::SimulationEngine;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Instant;
use tracing::{debug, instrument};

/// Runs circuits for a number of repetitions.
///
/// Holds no state between runs. A seeded simulator replays the same
/// sequence of samples on every call to [`Simulator::run`].
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    seed: Option<u64>,
}

impl Simulator {
    /// Creates a simulator drawing fresh entropy for every run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a simulator whose sampling is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Simulates `circuit` `repetitions` times.
    ///
    /// # Returns
    /// * `Ok(SimulationResult)` holding one bitstring per repetition for every measurement key.
    /// * `Err(QuantumError)` if the circuit is malformed, `repetitions` is zero,
    ///   or the state loses normalisation.
    #[instrument(skip(self, circuit), fields(ops = circuit.len(), qubits = circuit.qubits().len()))]
    pub fn run(&self, circuit: &Circuit, repetitions: usize) -> Result<SimulationResult, QuantumError> {
        if repetitions == 0 {
            return Err(QuantumError::InvalidOperation {
                message: "Repetition count must be at least 1".to_string(),
            });
        }
        circuit.validate()?;

        let mut result = SimulationResult::new(repetitions);
        if circuit.qubits().is_empty() {
            return Ok(result);
        }

        let start = Instant::now();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        for repetition in 0..repetitions {
            let mut engine = SimulationEngine::init(circuit.qubits())?;
            for op in circuit.operations() {
                match op {
                    Operation::Gate { gate, target } => engine.apply_gate(*gate, target)?,
                    Operation::Measure { targets, key } => {
                        let bits = engine.measure(targets, &mut rng)?;
                        result.record(key, bits);
                    }
                }
            }
            if repetition > 0 && repetition % 1000 == 0 {
                debug!("Completed {} repetitions", repetition);
            }
        }

        debug!("Simulation completed in {:?}", start.elapsed());
        Ok(result)
    }
}
