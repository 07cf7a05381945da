// src/flavors/register.rs

//! Register flavor: qubits and classical bits are slots of named registers,
//! operations are appended to a circuit one at a time, and execution goes
//! through a named backend that hands back a job.
//!
//! ```
//! use duoq::flavors::register::{execute, BasicProvider, ClassicalRegister, QuantumCircuit, QuantumRegister};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qreg = QuantumRegister::new(1, "qreg")?;
//! let creg = ClassicalRegister::new(1, "creg")?;
//! let mut circ = QuantumCircuit::new(&qreg, &creg);
//! circ.x(qreg.bit(0)?)?;
//! circ.measure(&qreg, &creg)?;
//!
//! let backend = BasicProvider::new().get_backend("qasm_simulator")?;
//! let job = execute(&circ, &backend, 10)?;
//! assert_eq!(job.result().get_counts().to_string(), r#"{"1": 10}"#);
//! # Ok(())
//! # }
//! ```

use crate::circuits::{Circuit, CircuitBuilder};
use crate::core::{BackendError, ConstructionError, QubitId, QuantumError};
use crate::operations::{Gate, GateSet, Operation};
use crate::simulation::engine::MAX_QUBITS;
use crate::simulation::{Counts, SimulationResult, Simulator};
use crate::toolkit::QuantumToolkit;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument};

/// Name of the default simulation backend.
pub const QASM_SIMULATOR: &str = "qasm_simulator";

fn check_register(size: usize, name: &str) -> Result<(), QuantumError> {
    if size == 0 {
        return Err(QuantumError::InvalidOperation {
            message: format!("Register '{}' must have at least one slot", name),
        });
    }
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '[' || c == ']') {
        return Err(QuantumError::InvalidOperation {
            message: format!("'{}' is not a valid register name", name),
        });
    }
    Ok(())
}

/// A named, ordered group of qubit slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantumRegister {
    name: String,
    size: usize,
}

/// One slot of a [`QuantumRegister`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Qubit {
    register: String,
    index: usize,
}

impl QuantumRegister {
    pub fn new(size: usize, name: impl Into<String>) -> Result<Self, QuantumError> {
        let name = name.into();
        check_register(size, &name)?;
        Ok(Self { name, size })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Slot `index`, or a reference violation if the register is smaller.
    pub fn bit(&self, index: usize) -> Result<Qubit, QuantumError> {
        if index >= self.size {
            return Err(QuantumError::ReferenceViolation {
                message: format!("Index {} out of range for register '{}' of size {}", index, self.name, self.size),
            });
        }
        Ok(Qubit {
            register: self.name.clone(),
            index,
        })
    }
}

/// A named, ordered group of classical bit slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassicalRegister {
    name: String,
    size: usize,
}

/// One slot of a [`ClassicalRegister`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clbit {
    register: String,
    index: usize,
}

impl ClassicalRegister {
    pub fn new(size: usize, name: impl Into<String>) -> Result<Self, QuantumError> {
        let name = name.into();
        check_register(size, &name)?;
        Ok(Self { name, size })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn bit(&self, index: usize) -> Result<Clbit, QuantumError> {
        if index >= self.size {
            return Err(QuantumError::ReferenceViolation {
                message: format!("Index {} out of range for register '{}' of size {}", index, self.name, self.size),
            });
        }
        Ok(Clbit {
            register: self.name.clone(),
            index,
        })
    }

    /// Measurement key the shared simulator records slot `index` under.
    fn slot_key(&self, index: usize) -> String {
        format!("{}[{}]", self.name, index)
    }

    /// Slot index encoded in `key`, if the key belongs to this register.
    fn slot_of(&self, key: &str) -> Option<usize> {
        let index = key.strip_prefix(self.name.as_str())?.strip_prefix('[')?.strip_suffix(']')?;
        index.parse().ok().filter(|i| *i < self.size)
    }

    /// Builds the register's bitstring for one shot. Slot 0 is the rightmost
    /// character; slots that were never measured read as `0`.
    fn bitstring(&self, result: &SimulationResult, shot: usize) -> String {
        (0..self.size)
            .rev()
            .map(|slot| {
                result
                    .measurements(&self.slot_key(slot))
                    .and_then(|records| records.get(shot))
                    .and_then(|bits| bits.chars().next())
                    .unwrap_or('0')
            })
            .collect()
    }
}

/// The register pair a lowered [`Circuit`] is read back through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterLayout {
    qreg: QuantumRegister,
    creg: ClassicalRegister,
}

impl RegisterLayout {
    pub fn new(qreg: QuantumRegister, creg: ClassicalRegister) -> Self {
        Self { qreg, creg }
    }

    /// Recovers the layout of a circuit lowered with these register names:
    /// one quantum slot per qubit id up to the largest, one classical slot
    /// per measured key up to the largest.
    pub fn infer(circuit: &Circuit, qreg_name: &str, creg_name: &str) -> Result<Self, QuantumError> {
        let qubits = circuit.qubits().iter().map(|q| q.0 as usize + 1).max().unwrap_or(0);
        let probe = ClassicalRegister {
            name: creg_name.to_string(),
            size: usize::MAX,
        };
        let clbits = circuit
            .measurement_keys()
            .into_iter()
            .filter_map(|key| probe.slot_of(key))
            .map(|slot| slot + 1)
            .max()
            .unwrap_or(0);
        Ok(Self {
            qreg: QuantumRegister::new(qubits, qreg_name)?,
            creg: ClassicalRegister::new(clbits, creg_name)?,
        })
    }

    pub fn qreg(&self) -> &QuantumRegister {
        &self.qreg
    }

    pub fn creg(&self) -> &ClassicalRegister {
        &self.creg
    }
}

/// A circuit over one quantum and one classical register, built by appending.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantumCircuit {
    layout: RegisterLayout,
    operations: Vec<Operation>,
    measured: HashSet<usize>,
}

impl QuantumCircuit {
    pub fn new(qreg: &QuantumRegister, creg: &ClassicalRegister) -> Self {
        Self {
            layout: RegisterLayout::new(qreg.clone(), creg.clone()),
            operations: Vec::new(),
            measured: HashSet::new(),
        }
    }

    pub fn layout(&self) -> &RegisterLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn check_qubit(&self, qubit: &Qubit) -> Result<QubitId, QuantumError> {
        let qreg = &self.layout.qreg;
        if qubit.register != qreg.name || qubit.index >= qreg.size {
            return Err(QuantumError::ReferenceViolation {
                message: format!("Qubit {}[{}] is not part of this circuit", qubit.register, qubit.index),
            });
        }
        Ok(QubitId(qubit.index as u64))
    }

    /// Appends `gate` on `qubit`.
    pub fn append(&mut self, gate: Gate, qubit: Qubit) -> Result<&mut Self, QuantumError> {
        let target = self.check_qubit(&qubit)?;
        self.operations.push(Operation::gate(gate, target));
        Ok(self)
    }

    /// Appends the NOT gate.
    pub fn x(&mut self, qubit: Qubit) -> Result<&mut Self, QuantumError> {
        self.append(Gate::X, qubit)
    }

    pub fn y(&mut self, qubit: Qubit) -> Result<&mut Self, QuantumError> {
        self.append(Gate::Y, qubit)
    }

    pub fn z(&mut self, qubit: Qubit) -> Result<&mut Self, QuantumError> {
        self.append(Gate::Z, qubit)
    }

    /// Appends a Hadamard.
    pub fn h(&mut self, qubit: Qubit) -> Result<&mut Self, QuantumError> {
        self.append(Gate::H, qubit)
    }

    /// Measures `qubit` into `clbit`. Each classical slot can be written once.
    pub fn measure_bit(&mut self, qubit: Qubit, clbit: Clbit) -> Result<&mut Self, QuantumError> {
        let target = self.check_qubit(&qubit)?;
        let creg = &self.layout.creg;
        if clbit.register != creg.name || clbit.index >= creg.size {
            return Err(QuantumError::ReferenceViolation {
                message: format!("Clbit {}[{}] is not part of this circuit", clbit.register, clbit.index),
            });
        }
        if !self.measured.insert(clbit.index) {
            return Err(QuantumError::InvalidOperation {
                message: format!("Clbit {}[{}] is already measured into", clbit.register, clbit.index),
            });
        }
        let key = creg.slot_key(clbit.index);
        self.operations.push(Operation::measure(vec![target], key));
        Ok(self)
    }

    /// Measures every slot of `qreg` into the matching slot of `creg`.
    pub fn measure(&mut self, qreg: &QuantumRegister, creg: &ClassicalRegister) -> Result<&mut Self, QuantumError> {
        if qreg.size != creg.size {
            return Err(QuantumError::InvalidOperation {
                message: format!(
                    "Cannot measure register '{}' of size {} into register '{}' of size {}",
                    qreg.name, qreg.size, creg.name, creg.size
                ),
            });
        }
        for index in 0..qreg.size {
            self.measure_bit(qreg.bit(index)?, creg.bit(index)?)?;
        }
        Ok(self)
    }

    /// Lowers to the shared circuit type. Idle slots are kept as qubits.
    pub fn to_circuit(&self) -> Circuit {
        CircuitBuilder::new()
            .with_qubits((0..self.layout.qreg.size).map(|i| QubitId(i as u64)))
            .add_ops(self.operations.iter().cloned())
            .build()
    }

    /// Text diagram of the circuit.
    pub fn draw(&self) -> String {
        draw(&self.to_circuit(), &self.layout)
    }
}

/// Renders `circuit` with one wire per quantum slot and one double wire for
/// the classical register. A `╩` marks the column where a slot is written,
/// with the slot index printed underneath.
pub fn draw(circuit: &Circuit, layout: &RegisterLayout) -> String {
    const CELL: usize = 5;
    let qreg = layout.qreg();
    let creg = layout.creg();

    let mut labels: Vec<String> = (0..qreg.size()).map(|i| format!("{}_{}: ", qreg.name(), i)).collect();
    labels.push(format!("{}: {}/", creg.name(), creg.size()));
    let width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    let mut rows: Vec<String> = labels.iter().map(|l| format!("{:>width$}", l, width = width)).collect();
    let mut index_row = " ".repeat(width);

    for op in circuit.operations() {
        for (slot, row) in rows.iter_mut().take(qreg.size()).enumerate() {
            let id = QubitId(slot as u64);
            let cell = match op {
                Operation::Gate { gate, target } if *target == id => format!("─[{}]─", gate.symbol()),
                Operation::Measure { targets, .. } if targets.contains(&id) => "─[M]─".to_string(),
                _ => "─".repeat(CELL),
            };
            row.push_str(&cell);
        }
        let marked = match op {
            Operation::Measure { key, .. } => creg.slot_of(key),
            Operation::Gate { .. } => None,
        };
        match marked {
            Some(slot) => {
                rows[qreg.size()].push_str("══╩══");
                let label = slot.to_string();
                index_row.push_str(&format!("{:^width$}", label, width = CELL));
            }
            None => {
                rows[qreg.size()].push_str(&"═".repeat(CELL));
                index_row.push_str(&" ".repeat(CELL));
            }
        }
    }

    let mut out = rows.join("\n");
    let index_row = index_row.trim_end();
    if !index_row.is_empty() {
        out.push('\n');
        out.push_str(index_row);
    }
    out
}

/// What a finished job hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    backend_name: String,
    job_id: String,
    shots: usize,
    counts: Counts,
    memory: Vec<String>,
}

impl JobResult {
    /// Bitstring histogram over the classical register.
    pub fn get_counts(&self) -> &Counts {
        &self.counts
    }

    /// The register's bitstring for every shot, in shot order.
    pub fn get_memory(&self) -> &[String] {
        &self.memory
    }

    pub fn shots(&self) -> usize {
        self.shots
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.counts)
    }
}

/// Handle to work submitted to a [`Backend`].
///
/// Jobs run to completion when they are submitted, so a handle always
/// carries its result.
#[derive(Debug, Clone)]
pub struct Job {
    id: String,
    result: JobResult,
}

impl Job {
    pub fn job_id(&self) -> &str {
        &self.id
    }

    pub fn result(&self) -> &JobResult {
        &self.result
    }

    pub fn into_result(self) -> JobResult {
        self.result
    }
}

/// A named executor for register circuits.
#[derive(Debug, Clone)]
pub struct Backend {
    name: String,
    simulator: Simulator,
    gate_set: GateSet,
    max_qubits: usize,
    next_job: Arc<AtomicU64>,
}

impl Backend {
    /// A simulator backend that accepts only the gates in `gate_set`.
    pub fn new(name: impl Into<String>, gate_set: GateSet, seed: Option<u64>) -> Self {
        Self {
            name: name.into(),
            simulator: seed.map(Simulator::with_seed).unwrap_or_default(),
            gate_set,
            max_qubits: MAX_QUBITS,
            next_job: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gate_set(&self) -> &GateSet {
        &self.gate_set
    }

    pub fn max_qubits(&self) -> usize {
        self.max_qubits
    }

    /// Runs `circuit` for `shots` and returns the finished job.
    #[instrument(skip(self, circuit, layout), fields(backend = %self.name))]
    pub fn run(&self, circuit: &Circuit, shots: usize, layout: &RegisterLayout) -> Result<Job, BackendError> {
        if circuit.qubits().len() > self.max_qubits {
            return Err(BackendError::Rejected {
                backend: self.name.clone(),
                reason: format!(
                    "circuit has {} qubits but the backend supports {}",
                    circuit.qubits().len(),
                    self.max_qubits
                ),
            });
        }
        let gates: Vec<Gate> = circuit
            .operations()
            .iter()
            .filter_map(|op| match op {
                Operation::Gate { gate, .. } => Some(*gate),
                Operation::Measure { .. } => None,
            })
            .collect();
        if let Some(gate) = self.gate_set.first_missing(&gates) {
            return Err(BackendError::Rejected {
                backend: self.name.clone(),
                reason: format!("gate {} is not supported", gate),
            });
        }

        let id = format!("{}-{:04}", self.name, self.next_job.fetch_add(1, Ordering::Relaxed));
        debug!("Submitted job {}", id);

        let result = self.simulator.run(circuit, shots)?;
        let creg = layout.creg();
        let memory: Vec<String> = (0..result.repetitions()).map(|shot| creg.bitstring(&result, shot)).collect();
        let counts = memory.iter().map(|bits| (bits.clone(), 1)).collect();

        info!("Job {} finished: {} shots", id, shots);
        Ok(Job {
            id: id.clone(),
            result: JobResult {
                backend_name: self.name.clone(),
                job_id: id,
                shots,
                counts,
                memory,
            },
        })
    }
}

/// Hands out backends by name.
#[derive(Debug, Clone)]
pub struct BasicProvider {
    backends: Vec<Backend>,
}

impl BasicProvider {
    /// A provider offering the `qasm_simulator` backend.
    pub fn new() -> Self {
        Self::with_seed(None)
    }

    /// Like [`new`](Self::new); a seed makes every backend's sampling reproducible.
    pub fn with_seed(seed: Option<u64>) -> Self {
        Self {
            backends: vec![Backend::new(QASM_SIMULATOR, GateSet::all(), seed)],
        }
    }

    /// Registers `backend`, replacing any backend of the same name.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backends.retain(|b| b.name != backend.name);
        self.backends.push(backend);
        self
    }

    /// Registered backend names.
    pub fn backends(&self) -> Vec<&str> {
        self.backends.iter().map(Backend::name).collect()
    }

    pub fn get_backend(&self, name: &str) -> Result<Backend, BackendError> {
        self.backends
            .iter()
            .find(|b| b.name == name)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                name: name.to_string(),
                available: self.backends().join(", "),
            })
    }
}

impl Default for BasicProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Submits `circuit` to `backend` for `shots` repetitions.
pub fn execute(circuit: &QuantumCircuit, backend: &Backend, shots: usize) -> Result<Job, BackendError> {
    backend.run(&circuit.to_circuit(), shots, circuit.layout())
}

/// [`QuantumToolkit`] over the register flavor.
#[derive(Debug, Clone)]
pub struct RegisterToolkit {
    provider: BasicProvider,
    backend_name: String,
    gate_set: GateSet,
    qreg_name: String,
    creg_name: String,
}

impl RegisterToolkit {
    pub fn new() -> Self {
        Self {
            provider: BasicProvider::new(),
            backend_name: QASM_SIMULATOR.to_string(),
            gate_set: GateSet::all(),
            qreg_name: "qreg".to_string(),
            creg_name: "creg".to_string(),
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.provider = BasicProvider::with_seed(seed);
        self
    }

    /// Looks backends up in `provider` instead of the default one.
    pub fn with_provider(mut self, provider: BasicProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_backend(mut self, name: impl Into<String>) -> Self {
        self.backend_name = name.into();
        self
    }

    pub fn with_gate_set(mut self, gate_set: GateSet) -> Self {
        self.gate_set = gate_set;
        self
    }

    fn layout_of(&self, circuit: &Circuit) -> Result<RegisterLayout, QuantumError> {
        RegisterLayout::infer(circuit, &self.qreg_name, &self.creg_name)
    }
}

impl Default for RegisterToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl QuantumToolkit for RegisterToolkit {
    type Outcome = JobResult;

    fn name(&self) -> &str {
        "register"
    }

    fn build_circuit(&self, gates: &[Gate], measurement_targets: &[usize]) -> Result<Circuit, ConstructionError> {
        if let Some(missing) = self.gate_set.first_missing(gates) {
            return Err(ConstructionError::Unsupported {
                toolkit: self.name().to_string(),
                capability: format!("gate {}", missing),
            });
        }
        let size = measurement_targets.iter().map(|t| t + 1).max().unwrap_or(0);
        let qreg = QuantumRegister::new(size, self.qreg_name.as_str())?;
        let creg = ClassicalRegister::new(size, self.creg_name.as_str())?;

        let mut circ = QuantumCircuit::new(&qreg, &creg);
        for gate in gates {
            for target in measurement_targets {
                circ.append(*gate, qreg.bit(*target)?)?;
            }
        }
        for target in measurement_targets {
            circ.measure_bit(qreg.bit(*target)?, creg.bit(*target)?)?;
        }
        Ok(circ.to_circuit())
    }

    fn render(&self, circuit: &Circuit) -> String {
        match self.layout_of(circuit) {
            Ok(layout) => draw(circuit, &layout),
            Err(_) => circuit.to_string(),
        }
    }

    fn execute(&self, circuit: &Circuit, repetitions: usize) -> Result<JobResult, BackendError> {
        let layout = self.layout_of(circuit)?;
        let backend = self.provider.get_backend(&self.backend_name)?;
        let job = backend.run(circuit, repetitions, &layout)?;
        Ok(job.into_result())
    }

    fn counts(&self, outcome: &JobResult) -> Counts {
        outcome.get_counts().clone()
    }
}
