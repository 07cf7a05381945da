// src/core/state.rs

use num_complex::Complex;
use num_traits::Zero;
use std::fmt;

/// Tolerance used when checking that a state vector keeps unit norm.
pub const NORM_TOLERANCE: f64 = 1e-9;

/// Amplitudes of an `n`-qubit register, `2^n` complex entries.
///
/// Basis index `k` encodes qubit `i` (in simulation order) at bit position
/// `n - 1 - i`, so qubit 0 is the most significant bit.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    amplitudes: Vec<Complex<f64>>,
}

impl StateVector {
    /// Creates `|0...0>` for `num_qubits` qubits.
    pub fn zero(num_qubits: usize) -> Self {
        let dim = 1usize << num_qubits;
        let mut amplitudes = vec![Complex::zero(); dim];
        amplitudes[0] = Complex::new(1.0, 0.0);
        Self { amplitudes }
    }

    /// Wraps an existing vector. The caller is responsible for its length being a power of two.
    pub(crate) fn from_amplitudes(amplitudes: Vec<Complex<f64>>) -> Self {
        Self { amplitudes }
    }

    /// Creates the basis state `|index>` of dimension `dim`.
    pub fn basis(dim: usize, index: usize) -> Self {
        let mut amplitudes = vec![Complex::zero(); dim];
        amplitudes[index] = Complex::new(1.0, 0.0);
        Self { amplitudes }
    }

    /// Read-only access to the amplitudes.
    pub fn amplitudes(&self) -> &[Complex<f64>] {
        &self.amplitudes
    }

    /// Number of basis states.
    pub fn dim(&self) -> usize {
        self.amplitudes.len()
    }

    /// Number of qubits the vector describes.
    pub fn num_qubits(&self) -> usize {
        self.amplitudes.len().trailing_zeros() as usize
    }

    /// Sum of `|c_k|^2` over all basis states.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|c| c.norm_sqr()).sum()
    }

    /// Probability of observing basis state `k`.
    pub fn probability(&self, k: usize) -> f64 {
        self.amplitudes.get(k).map(|c| c.norm_sqr()).unwrap_or(0.0)
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.num_qubits();
        for (k, amp) in self.amplitudes.iter().enumerate() {
            writeln!(f, "|{:0width$b}>: {:.4}", k, amp, width = width)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_state_has_unit_amplitude_at_origin() {
        let state = StateVector::zero(2);
        assert_eq!(state.dim(), 4);
        assert_eq!(state.num_qubits(), 2);
        assert_eq!(state.amplitudes()[0], Complex::new(1.0, 0.0));
        assert!((state.norm_sqr() - 1.0).abs() < NORM_TOLERANCE);
    }

    #[test]
    fn display_lists_every_basis_state() {
        let state = StateVector::basis(2, 1);
        let text = state.to_string();
        assert!(text.contains("|0>: 0.0000+0.0000i"));
        assert!(text.contains("|1>: 1.0000+0.0000i"));
    }
}
