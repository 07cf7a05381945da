// src/toolkit.rs

//! The capability interface every circuit-building flavor implements.
//!
//! Pipelines only talk to [`QuantumToolkit`], so a flavor can be swapped
//! for another (or for a different simulator) without touching them.

use crate::circuits::Circuit;
use crate::core::{BackendError, ConstructionError};
use crate::operations::Gate;
use crate::simulation::Counts;
use std::fmt;

pub trait QuantumToolkit {
    /// What a run produces before it is reduced to [`Counts`].
    type Outcome: fmt::Display;

    /// Human readable flavor name.
    fn name(&self) -> &str;

    /// Builds a circuit that applies `gates`, in order, to every qubit in
    /// `measurement_targets` and then measures all of them.
    fn build_circuit(&self, gates: &[Gate], measurement_targets: &[usize]) -> Result<Circuit, ConstructionError>;

    /// Text diagram of `circuit` in the flavor's own notation.
    fn render(&self, circuit: &Circuit) -> String;

    /// Runs `circuit` for `repetitions` and blocks until the outcome is ready.
    fn execute(&self, circuit: &Circuit, repetitions: usize) -> Result<Self::Outcome, BackendError>;

    /// Reduces an outcome to a bitstring histogram.
    fn counts(&self, outcome: &Self::Outcome) -> Counts;

    /// [`execute`](Self::execute) followed by [`counts`](Self::counts).
    fn simulate(&self, circuit: &Circuit, repetitions: usize) -> Result<Counts, BackendError> {
        let outcome = self.execute(circuit, repetitions)?;
        Ok(self.counts(&outcome))
    }
}
