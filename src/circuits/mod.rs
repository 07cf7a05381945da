// src/circuits/mod.rs

//! Ordered sequences of [`Operation`]s and the builder used to assemble them.
//!
//! Both circuit-building flavors lower to the [`Circuit`] defined here, and
//! the shared simulator only ever sees this type.

use crate::core::{QubitId, QuantumError};
use crate::operations::Operation;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// An ordered sequence of operations applied to a set of qubits.
#[derive(Clone, PartialEq)]
pub struct Circuit {
    /// Every qubit referenced by at least one operation.
    qubits: HashSet<QubitId>,

    /// Operations in execution order.
    operations: Vec<Operation>,
}

impl Circuit {
    /// Creates a new, empty circuit.
    pub fn new() -> Self {
        Self {
            qubits: HashSet::new(),
            operations: Vec::new(),
        }
    }

    /// Appends a single operation, registering the qubits it involves.
    pub fn add_operation(&mut self, op: Operation) {
        for qubit in op.involved_qubits() {
            self.qubits.insert(qubit);
        }
        self.operations.push(op);
    }

    /// Appends every operation yielded by `ops`, in order.
    pub fn add_operations<I>(&mut self, ops: I)
    where
        I: IntoIterator<Item = Operation>,
    {
        for op in ops {
            self.add_operation(op);
        }
    }

    /// Registers a qubit that no operation touches yet.
    ///
    /// Idle qubits still take part in the simulation and still get a wire in diagrams.
    pub fn add_qubit(&mut self, qubit: QubitId) {
        self.qubits.insert(qubit);
    }

    /// The set of qubits known to the circuit.
    pub fn qubits(&self) -> &HashSet<QubitId> {
        &self.qubits
    }

    /// Qubits in simulation order (ascending id).
    pub fn sorted_qubits(&self) -> Vec<QubitId> {
        let mut sorted: Vec<QubitId> = self.qubits.iter().copied().collect();
        sorted.sort();
        sorted
    }

    /// Operations in execution order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Total number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if the circuit contains no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Measurement keys in the order they first appear.
    pub fn measurement_keys(&self) -> Vec<&str> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::Measure { key, .. } => Some(key.as_str()),
                Operation::Gate { .. } => None,
            })
            .collect()
    }

    /// Checks the structural rules the simulator relies on.
    ///
    /// A measurement needs at least one target, may not name a qubit twice,
    /// and its key must be non-empty and unique within the circuit.
    pub fn validate(&self) -> Result<(), QuantumError> {
        let mut seen_keys = HashSet::new();
        for op in &self.operations {
            if let Operation::Measure { targets, key } = op {
                if key.is_empty() {
                    return Err(QuantumError::InvalidOperation {
                        message: "Measurement key cannot be empty".to_string(),
                    });
                }
                if targets.is_empty() {
                    return Err(QuantumError::InvalidOperation {
                        message: format!("Measurement '{}' has no targets", key),
                    });
                }
                let unique: HashSet<_> = targets.iter().collect();
                if unique.len() != targets.len() {
                    return Err(QuantumError::InvalidOperation {
                        message: format!("Measurement '{}' names a qubit more than once", key),
                    });
                }
                if !seen_keys.insert(key.as_str()) {
                    return Err(QuantumError::InvalidOperation {
                        message: format!("Measurement key '{}' is used more than once", key),
                    });
                }
            }
        }
        Ok(())
    }

    /// Renders a wire diagram, labelling each qubit's row with `label`.
    pub fn diagram_with<F>(&self, label: F) -> String
    where
        F: Fn(QubitId) -> String,
    {
        let sorted_qubits = self.sorted_qubits();
        if sorted_qubits.is_empty() {
            return String::new();
        }
        let num_qubits = sorted_qubits.len();
        let num_ops = self.operations.len();
        let row_of: HashMap<QubitId, usize> = sorted_qubits
            .iter()
            .enumerate()
            .map(|(i, q)| (*q, i))
            .collect();

        let labels: Vec<String> = sorted_qubits.iter().map(|q| format!("{}: ", label(*q))).collect();
        let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);

        const MIN_CELL: usize = 7;
        const H_WIRE: char = '─';
        const V_WIRE: char = '│';

        // symbols[row][t] is the gate drawn on that row at that time, if any
        let mut symbols: Vec<Vec<Option<String>>> = vec![vec![None; num_ops]; num_qubits];
        // v_connect[row][t] marks a vertical line between row and row + 1
        let mut v_connect: Vec<Vec<bool>> = vec![vec![false; num_ops]; num_qubits];

        for (t, op) in self.operations.iter().enumerate() {
            match op {
                Operation::Gate { gate, target } => {
                    if let Some(r) = row_of.get(target) {
                        symbols[*r][t] = Some(gate.symbol().to_string());
                    }
                }
                Operation::Measure { targets, key } => {
                    let rows: Vec<usize> = targets.iter().filter_map(|q| row_of.get(q).copied()).collect();
                    for r in &rows {
                        symbols[*r][t] = Some(format!("M('{}')", key));
                    }
                    if let (Some(r_min), Some(r_max)) = (rows.iter().min(), rows.iter().max()) {
                        for row in v_connect.iter_mut().take(*r_max).skip(*r_min) {
                            row[t] = true;
                        }
                    }
                }
            }
        }

        let widths: Vec<usize> = (0..num_ops)
            .map(|t| {
                let widest = symbols
                    .iter()
                    .filter_map(|row| row[t].as_ref().map(|s| s.chars().count()))
                    .max()
                    .unwrap_or(0);
                MIN_CELL.max(widest + 4)
            })
            .collect();

        let mut out = String::new();
        for r in 0..num_qubits {
            out.push_str(&format!("{:<width$}", labels[r], width = label_width));
            for t in 0..num_ops {
                let cell = match &symbols[r][t] {
                    Some(symbol) => symbol.clone(),
                    None => String::new(),
                };
                let len = cell.chars().count();
                let pad = widths[t] - len;
                let pre = pad / 2;
                out.extend(std::iter::repeat_n(H_WIRE, pre));
                out.push_str(&cell);
                out.extend(std::iter::repeat_n(H_WIRE, pad - pre));
            }
            out.push('\n');

            if r < num_qubits - 1 && v_connect[r].iter().any(|v| *v) {
                out.push_str(&" ".repeat(label_width));
                for t in 0..num_ops {
                    let c = if v_connect[r][t] { V_WIRE } else { ' ' };
                    let pre = widths[t] / 2;
                    out.push_str(&" ".repeat(pre));
                    out.push(c);
                    out.push_str(&" ".repeat(widths[t] - pre - 1));
                }
                out.push('\n');
            }
        }
        out
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

//-------------------------------------------------------------------------
// Circuit Builder
//-------------------------------------------------------------------------

/// Method-chaining helper for constructing a [`Circuit`].
pub struct CircuitBuilder {
    circuit: Circuit,
}

impl CircuitBuilder {
    /// Creates a new, empty CircuitBuilder.
    pub fn new() -> Self {
        Self {
            circuit: Circuit::new(),
        }
    }

    /// Adds a single operation to the circuit being built.
    pub fn add_op(mut self, op: Operation) -> Self {
        self.circuit.add_operation(op);
        self
    }

    /// Adds multiple operations to the circuit being built.
    pub fn add_ops<I>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = Operation>,
    {
        self.circuit.add_operations(ops);
        self
    }

    /// Registers qubits up front so idle ones are still simulated.
    pub fn with_qubits<I>(mut self, qubits: I) -> Self
    where
        I: IntoIterator<Item = QubitId>,
    {
        for qubit in qubits {
            self.circuit.add_qubit(qubit);
        }
        self
    }

    /// Returns the circuit without checking it.
    pub fn build(self) -> Circuit {
        self.circuit
    }

    /// Returns the circuit after [`Circuit::validate`] accepts it.
    pub fn try_build(self) -> Result<Circuit, QuantumError> {
        self.circuit.validate()?;
        Ok(self.circuit)
    }
}

impl Default for CircuitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "duoq::Circuit[{} operations on {} qubits]",
            self.operations.len(),
            self.qubits.len()
        )?;
        write!(f, "{}", self.diagram_with(|q| q.to_string()))
    }
}

impl fmt::Debug for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::Gate;

    fn qid(id: u64) -> QubitId {
        QubitId(id)
    }

    #[test]
    fn builder_tracks_qubits_and_order() {
        let circuit = CircuitBuilder::new()
            .add_op(Operation::gate(Gate::X, qid(0)))
            .add_op(Operation::measure(vec![qid(0)], "m"))
            .build();

        assert_eq!(circuit.len(), 2);
        assert_eq!(circuit.sorted_qubits(), vec![qid(0)]);
        assert_eq!(circuit.measurement_keys(), vec!["m"]);
        assert!(matches!(circuit.operations()[0], Operation::Gate { gate: Gate::X, .. }));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let result = CircuitBuilder::new()
            .add_op(Operation::measure(vec![qid(0)], "m"))
            .add_op(Operation::measure(vec![qid(1)], "m"))
            .try_build();
        assert!(matches!(result, Err(QuantumError::InvalidOperation { .. })));
    }

    #[test]
    fn measurement_without_targets_is_rejected() {
        let result = CircuitBuilder::new()
            .add_op(Operation::measure(Vec::new(), "m"))
            .try_build();
        assert!(result.is_err());
    }

    #[test]
    fn diagram_draws_gate_before_measurement() {
        let circuit = CircuitBuilder::new()
            .add_op(Operation::gate(Gate::X, qid(0)))
            .add_op(Operation::measure(vec![qid(0)], "m"))
            .build();
        let diagram = circuit.diagram_with(|_| "(0, 0)".to_string());

        assert!(diagram.starts_with("(0, 0): "));
        let x_pos = diagram.find('X').unwrap();
        let m_pos = diagram.find("M('m')").unwrap();
        assert!(x_pos < m_pos);
    }

    #[test]
    fn multi_qubit_measurement_is_connected() {
        let circuit = CircuitBuilder::new()
            .add_op(Operation::measure(vec![qid(0), qid(1)], "both"))
            .build();
        let text = circuit.to_string();
        assert!(text.contains("2 qubits"));
        assert!(text.contains('│'));
    }
}
