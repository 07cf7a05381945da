// src/simulation/engine.rs
use crate::core::state::NORM_TOLERANCE;
use crate::core::{QubitId, QuantumError, StateVector};
use crate::operations::{Gate, GateMatrix};
use num_complex::Complex;
use num_traits::Zero;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Largest register the engine will allocate a state vector for.
pub(crate) const MAX_QUBITS: usize = 24;

/// State-vector engine for a single repetition of a circuit.
/// (Internal visibility)
pub(crate) struct SimulationEngine {
    /// Maps qubit ids to their position (0..N-1) in the state vector.
    qubit_indices: HashMap<QubitId, usize>,
    state: StateVector,
    num_qubits: usize,
}

impl SimulationEngine {
    /// Sets up `|0...0>` over the given qubits.
    pub(crate) fn init(qubits: &HashSet<QubitId>) -> Result<Self, QuantumError> {
        if qubits.is_empty() {
            return Err(QuantumError::InvalidOperation {
                message: "Cannot initialize simulation engine with zero qubits".to_string(),
            });
        }
        let num_qubits = qubits.len();
        if num_qubits > MAX_QUBITS {
            return Err(QuantumError::SimulationError {
                message: format!(
                    "Circuit uses {} qubits but the engine supports at most {}",
                    num_qubits, MAX_QUBITS
                ),
            });
        }

        // Sort ids so index assignment does not depend on HashSet iteration order.
        let mut sorted_ids: Vec<QubitId> = qubits.iter().copied().collect();
        sorted_ids.sort();
        let qubit_indices = sorted_ids
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();

        Ok(Self {
            qubit_indices,
            state: StateVector::zero(num_qubits),
            num_qubits,
        })
    }

    #[cfg(test)]
    pub(crate) fn set_state(&mut self, state: StateVector) -> Result<(), QuantumError> {
        if state.dim() != self.state.dim() {
            return Err(QuantumError::SimulationError {
                message: format!(
                    "Cannot set state: provided dimension {} does not match engine dimension {}",
                    state.dim(),
                    self.state.dim()
                ),
            });
        }
        self.state = state;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &StateVector {
        &self.state
    }

    /// Applies `gate` to `target` and checks the state is still normalised.
    pub(crate) fn apply_gate(&mut self, gate: Gate, target: &QubitId) -> Result<(), QuantumError> {
        if gate == Gate::I {
            return Ok(());
        }
        let target_idx = *self.qubit_index(target)?;
        self.apply_single_qubit_gate(target_idx, &gate.matrix())?;
        self.validate_state()
    }

    /// Measures `targets` one after another, collapsing the state after each.
    ///
    /// Returns one character per target, in target order.
    pub(crate) fn measure<R: Rng>(
        &mut self,
        targets: &[QubitId],
        rng: &mut R,
    ) -> Result<String, QuantumError> {
        let mut bits = String::with_capacity(targets.len());
        for target in targets {
            let target_idx = *self.qubit_index(target)?;
            let bit = self.measure_one(target_idx, rng)?;
            bits.push(if bit { '1' } else { '0' });
        }
        Ok(bits)
    }

    fn measure_one<R: Rng>(&mut self, target_idx: usize, rng: &mut R) -> Result<bool, QuantumError> {
        let mask = 1usize << (self.num_qubits - 1 - target_idx);
        let amplitudes = self.state.amplitudes();

        let p_one: f64 = amplitudes
            .iter()
            .enumerate()
            .filter(|(k, _)| k & mask != 0)
            .map(|(_, c)| c.norm_sqr())
            .sum();

        let sample: f64 = rng.random::<f64>();
        let outcome = sample < p_one;
        let p_outcome = if outcome { p_one } else { 1.0 - p_one };
        if p_outcome <= 0.0 {
            return Err(QuantumError::SimulationError {
                message: format!("Sampled an outcome with probability {}", p_outcome),
            });
        }

        // Keep the branch that matches the outcome and renormalise it.
        let scale = 1.0 / p_outcome.sqrt();
        let collapsed = amplitudes
            .iter()
            .enumerate()
            .map(|(k, c)| {
                if (k & mask != 0) == outcome {
                    *c * scale
                } else {
                    Complex::zero()
                }
            })
            .collect();
        self.state = StateVector::from_amplitudes(collapsed);
        Ok(outcome)
    }

    fn qubit_index(&self, qubit: &QubitId) -> Result<&usize, QuantumError> {
        self.qubit_indices.get(qubit).ok_or_else(|| QuantumError::ReferenceViolation {
            message: format!("Qubit {} not found in simulation context", qubit),
        })
    }

    /// Applies a 2x2 matrix to one qubit of the global state vector.
    fn apply_single_qubit_gate(&mut self, target_idx: usize, matrix: &GateMatrix) -> Result<(), QuantumError> {
        let k = self.num_qubits - 1 - target_idx; // bit position, from the right
        let k_mask = 1 << k;
        let lower_mask = k_mask - 1;
        let upper_mask = !((k_mask << 1) - 1);

        let dim = self.state.dim();
        let mut new_vec = vec![Complex::zero(); dim];

        // Walk pairs of basis states that differ only in the target bit.
        for i in 0..dim / 2 {
            let i0 = ((i & upper_mask) << 1) | (i & lower_mask);
            let i1 = i0 | k_mask;
            if i1 >= dim {
                return Err(QuantumError::SimulationError {
                    message: format!(
                        "Calculated index out of bounds during gate application. i0={}, i1={}, dim={}",
                        i0, i1, dim
                    ),
                });
            }

            let psi_0 = self.state.amplitudes()[i0];
            let psi_1 = self.state.amplitudes()[i1];
            new_vec[i0] = matrix[0][0] * psi_0 + matrix[0][1] * psi_1;
            new_vec[i1] = matrix[1][0] * psi_0 + matrix[1][1] * psi_1;
        }

        self.state = StateVector::from_amplitudes(new_vec);
        Ok(())
    }

    fn validate_state(&self) -> Result<(), QuantumError> {
        let norm_sq = self.state.norm_sqr();
        if (norm_sq - 1.0).abs() > NORM_TOLERANCE {
            return Err(QuantumError::Incoherence {
                message: format!("State vector norm deviated significantly from 1: {}", norm_sq),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::FRAC_1_SQRT_2;

    const TEST_TOLERANCE: f64 = 1e-9;

    fn qid(id: u64) -> QubitId {
        QubitId(id)
    }

    fn engine_for(ids: &[u64]) -> Result<SimulationEngine, QuantumError> {
        let set: HashSet<QubitId> = ids.iter().map(|id| qid(*id)).collect();
        SimulationEngine::init(&set)
    }

    fn assert_amplitudes(actual: &StateVector, expected: &[Complex<f64>]) {
        assert_eq!(actual.dim(), expected.len(), "Vector length mismatch");
        for (i, (a, e)) in actual.amplitudes().iter().zip(expected).enumerate() {
            assert!(
                (*a - *e).norm_sqr() < TEST_TOLERANCE * TEST_TOLERANCE,
                "Mismatch at index {}: actual {}, expected {}",
                i,
                a,
                e
            );
        }
    }

    #[test]
    fn init_rejects_empty_register() {
        assert!(matches!(
            SimulationEngine::init(&HashSet::new()),
            Err(QuantumError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn init_rejects_oversized_register() {
        let ids: Vec<u64> = (0..(MAX_QUBITS as u64 + 1)).collect();
        assert!(matches!(engine_for(&ids), Err(QuantumError::SimulationError { .. })));
    }

    #[test]
    fn flip_on_second_qubit_sets_low_bit() -> Result<(), QuantumError> {
        let mut engine = engine_for(&[0, 1])?;
        engine.apply_gate(Gate::X, &qid(1))?;
        let one = Complex::new(1.0, 0.0);
        let zero = Complex::zero();
        assert_amplitudes(engine.state(), &[zero, one, zero, zero]);
        Ok(())
    }

    #[test]
    fn hadamard_makes_equal_superposition() -> Result<(), QuantumError> {
        let mut engine = engine_for(&[0])?;
        engine.apply_gate(Gate::H, &qid(0))?;
        let h = Complex::new(FRAC_1_SQRT_2, 0.0);
        assert_amplitudes(engine.state(), &[h, h]);
        Ok(())
    }

    #[test]
    fn unknown_qubit_is_a_reference_violation() -> Result<(), QuantumError> {
        let mut engine = engine_for(&[0])?;
        let err = engine.apply_gate(Gate::X, &qid(7)).unwrap_err();
        assert!(matches!(err, QuantumError::ReferenceViolation { .. }));
        Ok(())
    }

    #[test]
    fn measuring_basis_state_is_deterministic() -> Result<(), QuantumError> {
        let mut engine = engine_for(&[0, 1])?;
        engine.set_state(StateVector::basis(4, 2))?; // |10>
        let mut rng = StdRng::seed_from_u64(7);
        let bits = engine.measure(&[qid(0), qid(1)], &mut rng)?;
        assert_eq!(bits, "10");
        Ok(())
    }

    #[test]
    fn measurement_collapses_superposition() -> Result<(), QuantumError> {
        let mut engine = engine_for(&[0])?;
        engine.apply_gate(Gate::H, &qid(0))?;
        let mut rng = StdRng::seed_from_u64(42);
        let first = engine.measure(&[qid(0)], &mut rng)?;
        // Once collapsed, every later measurement agrees.
        for _ in 0..5 {
            assert_eq!(engine.measure(&[qid(0)], &mut rng)?, first);
        }
        assert!((engine.state().norm_sqr() - 1.0).abs() < TEST_TOLERANCE);
        Ok(())
    }

    #[test]
    fn denormalised_state_is_incoherent() -> Result<(), QuantumError> {
        let mut engine = engine_for(&[0])?;
        engine.set_state(StateVector::from_amplitudes(vec![
            Complex::new(1.0, 0.0),
            Complex::new(1.0, 0.0),
        ]))?;
        let err = engine.apply_gate(Gate::Z, &qid(0)).unwrap_err();
        assert!(matches!(err, QuantumError::Incoherence { .. }));
        Ok(())
    }
}
