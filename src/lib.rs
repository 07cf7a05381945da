// src/lib.rs

//! `duoq` - One small quantum experiment written in two circuit-building styles
//!
//! The grid flavor places qubits at `(row, col)` positions and builds a
//! circuit from its full list of operations in one call. The register flavor
//! allocates named quantum and classical registers, appends operations one at
//! a time and runs through a named backend that hands back a job. Both lower
//! to the same [`Circuit`] and share one state-vector [`Simulator`].

pub mod core;
pub mod operations;
pub mod circuits;
pub mod simulation;
pub mod toolkit;
pub mod flavors;
pub mod pipeline;

// Re-export the most common types for easier top-level use
pub use core::{BackendError, ConstructionError, QuantumError, QubitId};
pub use operations::{Gate, GateSet, Operation};
pub use circuits::{Circuit, CircuitBuilder};
pub use simulation::{Counts, SimulationResult, Simulator};
pub use toolkit::QuantumToolkit;
pub use flavors::{GridToolkit, RegisterToolkit};
pub use pipeline::{ConfigError, ExperimentConfig, PipelineError};

// Example 1: The flip experiment on the shared circuit type
// A NOT gate on a fresh qubit always reads back 1.
/// ```
/// use duoq::{CircuitBuilder, Gate, Operation, QubitId, Simulator};
///
/// let q0 = QubitId(0);
/// let circuit = CircuitBuilder::new()
///     .add_op(Operation::gate(Gate::X, q0))
///     .add_op(Operation::measure(vec![q0], "m"))
///     .build();
///
/// let result = Simulator::with_seed(7).run(&circuit, 10).unwrap();
/// println!("Circuit:\n{}", circuit);
/// println!("Result:\n{}", result);
/// assert_eq!(result.histogram("m").get("1"), 10);
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 2: Same experiment through both toolkits
// Either flavor can be driven through the `QuantumToolkit` trait.
/// ```
/// use duoq::{Gate, GridToolkit, QuantumToolkit, RegisterToolkit};
///
/// fn flip_counts<T: QuantumToolkit>(toolkit: &T) -> String {
///     let circuit = toolkit.build_circuit(&[Gate::X], &[0]).unwrap();
///     toolkit.simulate(&circuit, 10).unwrap().to_string()
/// }
///
/// assert_eq!(flip_counts(&GridToolkit::new()), r#"{"1": 10}"#);
/// assert_eq!(flip_counts(&RegisterToolkit::new()), r#"{"1": 10}"#);
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item
