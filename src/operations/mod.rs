// src/operations/mod.rs

//! Gates and measurements: the operations a circuit is made of.

use crate::core::{QubitId, QuantumError};
use num_complex::Complex;
use num_traits::Zero;
use std::f64::consts::FRAC_1_SQRT_2;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A 2x2 unitary acting on one qubit.
pub type GateMatrix = [[Complex<f64>; 2]; 2];

/// Single-qubit gates understood by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gate {
    /// Identity; leaves the qubit untouched.
    I,
    /// Pauli-X, the NOT or state-flip gate: swaps `|0>` and `|1>`.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z, a phase flip of `|1>`.
    Z,
    /// Hadamard; takes `|0>` to an equal superposition.
    H,
}

impl Gate {
    /// All gates, in declaration order.
    pub const ALL: [Gate; 5] = [Gate::I, Gate::X, Gate::Y, Gate::Z, Gate::H];

    /// The gate's matrix in the `{|0>, |1>}` basis.
    pub fn matrix(&self) -> GateMatrix {
        let one = Complex::new(1.0, 0.0);
        let zero = Complex::zero();
        let i = Complex::i();
        match self {
            Gate::I => [[one, zero], [zero, one]],
            Gate::X => [[zero, one], [one, zero]],
            Gate::Y => [[zero, -i], [i, zero]],
            Gate::Z => [[one, zero], [zero, -one]],
            Gate::H => {
                let h = Complex::new(FRAC_1_SQRT_2, 0.0);
                [[h, h], [h, -h]]
            }
        }
    }

    /// Short symbol used by circuit diagrams.
    pub fn symbol(&self) -> &'static str {
        match self {
            Gate::I => "I",
            Gate::X => "X",
            Gate::Y => "Y",
            Gate::Z => "Z",
            Gate::H => "H",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Gate {
    type Err = QuantumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "i" | "id" | "identity" => Ok(Gate::I),
            "x" | "not" | "flip" => Ok(Gate::X),
            "y" => Ok(Gate::Y),
            "z" => Ok(Gate::Z),
            "h" | "hadamard" => Ok(Gate::H),
            other => Err(QuantumError::InvalidOperation {
                message: format!("Unknown gate '{}'", other),
            }),
        }
    }
}

/// The gates a device or backend accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSet {
    gates: BTreeSet<Gate>,
}

impl GateSet {
    /// Every gate in [`Gate::ALL`].
    pub fn all() -> Self {
        Self {
            gates: Gate::ALL.into_iter().collect(),
        }
    }

    /// Only the listed gates.
    pub fn only(gates: &[Gate]) -> Self {
        Self {
            gates: gates.iter().copied().collect(),
        }
    }

    pub fn contains(&self, gate: Gate) -> bool {
        self.gates.contains(&gate)
    }

    /// First gate of `gates` that is not in the set.
    pub fn first_missing<'a, I>(&self, gates: I) -> Option<Gate>
    where
        I: IntoIterator<Item = &'a Gate>,
    {
        gates.into_iter().copied().find(|g| !self.contains(*g))
    }
}

impl Default for GateSet {
    fn default() -> Self {
        Self::all()
    }
}

/// One step of a circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Applies `gate` to `target`.
    Gate {
        /// Gate to apply.
        gate: Gate,
        /// Qubit the gate acts on.
        target: QubitId,
    },

    /// Measures `targets` in the computational basis and records the bits under `key`.
    ///
    /// The recorded bitstring lists the targets in the order given here.
    Measure {
        /// Qubits to measure, in bit order.
        targets: Vec<QubitId>,
        /// Name the outcome is stored under.
        key: String,
    },
}

impl Operation {
    /// Shorthand for a gate application.
    pub fn gate(gate: Gate, target: QubitId) -> Self {
        Operation::Gate { gate, target }
    }

    /// Shorthand for a measurement.
    pub fn measure(targets: Vec<QubitId>, key: impl Into<String>) -> Self {
        Operation::Measure {
            targets,
            key: key.into(),
        }
    }

    /// Returns every qubit the operation touches.
    pub fn involved_qubits(&self) -> Vec<QubitId> {
        match self {
            Operation::Gate { target, .. } => vec![*target],
            Operation::Measure { targets, .. } => targets.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(m: &GateMatrix, v: [Complex<f64>; 2]) -> [Complex<f64>; 2] {
        [
            m[0][0] * v[0] + m[0][1] * v[1],
            m[1][0] * v[0] + m[1][1] * v[1],
        ]
    }

    #[test]
    fn flip_swaps_basis_states() {
        let zero = [Complex::new(1.0, 0.0), Complex::zero()];
        let out = apply(&Gate::X.matrix(), zero);
        assert_eq!(out[0], Complex::zero());
        assert_eq!(out[1], Complex::new(1.0, 0.0));
    }

    #[test]
    fn every_gate_is_unitary() {
        for gate in Gate::ALL {
            let m = gate.matrix();
            for r in 0..2 {
                for c in 0..2 {
                    // (M^dagger M)[r][c]
                    let entry = m[0][r].conj() * m[0][c] + m[1][r].conj() * m[1][c];
                    let expected = if r == c { 1.0 } else { 0.0 };
                    assert!((entry.re - expected).abs() < 1e-12, "{} not unitary", gate);
                    assert!(entry.im.abs() < 1e-12, "{} not unitary", gate);
                }
            }
        }
    }

    #[test]
    fn gates_parse_from_names() {
        assert_eq!("x".parse::<Gate>(), Ok(Gate::X));
        assert_eq!("NOT".parse::<Gate>(), Ok(Gate::X));
        assert_eq!("hadamard".parse::<Gate>(), Ok(Gate::H));
        assert!("cnot".parse::<Gate>().is_err());
    }

    #[test]
    fn gate_set_reports_first_missing_gate() {
        let set = GateSet::only(&[Gate::X, Gate::I]);
        assert!(set.contains(Gate::X));
        assert_eq!(set.first_missing(&[Gate::X, Gate::H, Gate::Z]), Some(Gate::H));
        assert_eq!(GateSet::all().first_missing(&Gate::ALL), None);
    }

    #[test]
    fn measurement_involves_all_targets() {
        let op = Operation::measure(vec![QubitId(0), QubitId(2)], "m");
        assert_eq!(op.involved_qubits(), vec![QubitId(0), QubitId(2)]);
    }
}
