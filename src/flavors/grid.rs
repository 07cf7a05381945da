// src/flavors/grid.rs

//! Grid flavor: qubits live at `(row, col)` positions and a circuit is
//! assembled in one call from the complete, ordered list of operations.
//!
//! ```
//! use duoq::flavors::grid::{self, GridCircuit, GridQubit, GridSimulator};
//!
//! let qubit = GridQubit::new(0, 0);
//! let circuit = GridCircuit::from_ops([grid::x(qubit), grid::measure(&[qubit], "m")]).unwrap();
//! let result = GridSimulator::new().run(&circuit, 10).unwrap();
//! assert_eq!(result.to_string(), "m=1111111111");
//! ```

use crate::circuits::{Circuit, CircuitBuilder};
use crate::core::{BackendError, ConstructionError, QubitId, QuantumError};
use crate::operations::{Gate, GateSet, Operation};
use crate::simulation::{Counts, SimulationResult, Simulator};
use crate::toolkit::QuantumToolkit;
use std::fmt;
use tracing::debug;

/// A qubit addressed by its position on a 2D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridQubit {
    pub row: u32,
    pub col: u32,
}

impl GridQubit {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Row-major id, so sorting ids sorts qubits by row then column.
    pub fn id(&self) -> QubitId {
        QubitId((u64::from(self.row) << 32) | u64::from(self.col))
    }

    pub fn from_id(id: QubitId) -> Self {
        Self {
            row: (id.0 >> 32) as u32,
            col: (id.0 & u64::from(u32::MAX)) as u32,
        }
    }
}

impl fmt::Display for GridQubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Applies `gate` to `qubit`.
pub fn on(gate: Gate, qubit: GridQubit) -> Operation {
    Operation::gate(gate, qubit.id())
}

/// The NOT gate on `qubit`.
pub fn x(qubit: GridQubit) -> Operation {
    on(Gate::X, qubit)
}

pub fn h(qubit: GridQubit) -> Operation {
    on(Gate::H, qubit)
}

/// Measures `qubits` under `key`. The recorded bits follow the order of `qubits`.
pub fn measure(qubits: &[GridQubit], key: &str) -> Operation {
    Operation::measure(qubits.iter().map(GridQubit::id).collect(), key)
}

/// The gates a grid device accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridDevice {
    name: String,
    gate_set: GateSet,
}

impl GridDevice {
    pub fn new(name: impl Into<String>, gate_set: GateSet) -> Self {
        Self {
            name: name.into(),
            gate_set,
        }
    }

    /// A device that accepts every gate.
    pub fn unconstrained() -> Self {
        Self::new("grid", GateSet::all())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gate_set(&self) -> &GateSet {
        &self.gate_set
    }
}

/// A circuit over grid qubits.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCircuit {
    circuit: Circuit,
}

impl GridCircuit {
    /// Builds a circuit from every operation at once, in execution order.
    pub fn from_ops<I>(ops: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = Operation>,
    {
        Self::from_ops_on(&GridDevice::unconstrained(), ops)
    }

    /// Like [`from_ops`](Self::from_ops), rejecting gates `device` does not accept.
    pub fn from_ops_on<I>(device: &GridDevice, ops: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = Operation>,
    {
        let ops: Vec<Operation> = ops.into_iter().collect();
        let gates: Vec<Gate> = ops
            .iter()
            .filter_map(|op| match op {
                Operation::Gate { gate, .. } => Some(*gate),
                Operation::Measure { .. } => None,
            })
            .collect();
        if let Some(missing) = device.gate_set().first_missing(&gates) {
            return Err(ConstructionError::Unsupported {
                toolkit: device.name().to_string(),
                capability: format!("gate {}", missing),
            });
        }

        let circuit = CircuitBuilder::new().add_ops(ops).try_build()?;
        Ok(Self { circuit })
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn into_circuit(self) -> Circuit {
        self.circuit
    }
}

impl fmt::Display for GridCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(render_grid(&self.circuit).trim_end())
    }
}

fn render_grid(circuit: &Circuit) -> String {
    circuit.diagram_with(|id| GridQubit::from_id(id).to_string())
}

/// Per-repetition measurement records from a [`GridSimulator`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    result: SimulationResult,
}

impl TrialResult {
    pub fn repetitions(&self) -> usize {
        self.result.repetitions()
    }

    /// Bitstrings recorded under `key`, one per repetition.
    pub fn measurements(&self, key: &str) -> Option<&[String]> {
        self.result.measurements(key)
    }

    pub fn histogram(&self, key: &str) -> Counts {
        self.result.histogram(key)
    }
}

impl fmt::Display for TrialResult {
    /// One line per key, e.g. `m=1111111111`. Keys over several qubits list
    /// each qubit's bits separately, comma separated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, key) in self.result.keys().enumerate() {
            if line > 0 {
                writeln!(f)?;
            }
            let records = self.result.measurements(key).unwrap_or_default();
            let width = records.first().map(|r| r.len()).unwrap_or(0);
            let columns: Vec<String> = (0..width)
                .map(|bit| {
                    records
                        .iter()
                        .filter_map(|r| r.as_bytes().get(bit).map(|b| *b as char))
                        .collect()
                })
                .collect();
            write!(f, "{}={}", key, columns.join(", "))?;
        }
        Ok(())
    }
}

/// Simulator front end for grid circuits.
#[derive(Debug, Clone, Default)]
pub struct GridSimulator {
    simulator: Simulator,
}

impl GridSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            simulator: Simulator::with_seed(seed),
        }
    }

    /// Runs `circuit` `repetitions` times.
    pub fn run(&self, circuit: &GridCircuit, repetitions: usize) -> Result<TrialResult, QuantumError> {
        self.run_circuit(circuit.circuit(), repetitions)
    }

    fn run_circuit(&self, circuit: &Circuit, repetitions: usize) -> Result<TrialResult, QuantumError> {
        let result = self.simulator.run(circuit, repetitions)?;
        Ok(TrialResult { result })
    }
}

/// [`QuantumToolkit`] over the grid flavor. Qubit `i` is `GridQubit(0, i)`.
#[derive(Debug, Clone)]
pub struct GridToolkit {
    device: GridDevice,
    simulator: GridSimulator,
    key: String,
}

impl GridToolkit {
    pub fn new() -> Self {
        Self {
            device: GridDevice::unconstrained(),
            simulator: GridSimulator::new(),
            key: "m".to_string(),
        }
    }

    pub fn with_device(mut self, device: GridDevice) -> Self {
        self.device = device;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.simulator = match seed {
            Some(seed) => GridSimulator::with_seed(seed),
            None => GridSimulator::new(),
        };
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Default for GridToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl QuantumToolkit for GridToolkit {
    type Outcome = TrialResult;

    fn name(&self) -> &str {
        self.device.name()
    }

    fn build_circuit(&self, gates: &[Gate], measurement_targets: &[usize]) -> Result<Circuit, ConstructionError> {
        let qubits = measurement_targets
            .iter()
            .map(|t| {
                u32::try_from(*t)
                    .map(|col| GridQubit::new(0, col))
                    .map_err(|_| QuantumError::InvalidOperation {
                        message: format!("Qubit index {} does not fit on the grid", t),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut ops = Vec::with_capacity(gates.len() * qubits.len() + 1);
        for gate in gates {
            for qubit in &qubits {
                ops.push(on(*gate, *qubit));
            }
        }
        ops.push(measure(&qubits, &self.key));

        debug!("Building grid circuit from {} operations", ops.len());
        Ok(GridCircuit::from_ops_on(&self.device, ops)?.into_circuit())
    }

    fn render(&self, circuit: &Circuit) -> String {
        render_grid(circuit).trim_end().to_string()
    }

    fn execute(&self, circuit: &Circuit, repetitions: usize) -> Result<TrialResult, BackendError> {
        Ok(self.simulator.run_circuit(circuit, repetitions)?)
    }

    fn counts(&self, outcome: &TrialResult) -> Counts {
        outcome.histogram(&self.key)
    }
}
