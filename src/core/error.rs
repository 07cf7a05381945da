//! Error handling logic

use std::fmt;
use thiserror::Error;

/// Identifier for a qubit within one simulation.
///
/// Ids only need to be unique inside a single circuit. The simulator orders
/// qubits by id when it lays out the state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QubitId(pub u64);

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q({})", self.0)
    }
}

/// Failures raised while building or simulating a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantumError {
    /// The state vector drifted away from unit norm.
    #[error("Incoherence: {message}")]
    Incoherence {
        /// Incoherence failure message
        message: String,
    },

    /// A qubit, key or slot was referenced that the circuit does not know about.
    #[error("Reference violation: {message}")]
    ReferenceViolation {
        /// ReferenceViolation failure message
        message: String,
    },

    /// An operation is inconsistent with the circuit it is applied to.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// InvalidOperation failure message
        message: String,
    },

    /// General error encountered during the simulation process itself.
    #[error("Simulation error: {message}")]
    SimulationError {
        /// SimulationError failure message
        message: String,
    },
}

/// Outcome of a failed circuit construction.
///
/// Callers branch on the variant: `Unsupported` means the flavor cannot
/// express what was asked of it, `Invalid` means the request itself was
/// malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// The toolkit lacks a capability the request needs.
    #[error("{toolkit} does not support {capability}")]
    Unsupported {
        /// Name of the toolkit that rejected the request
        toolkit: String,
        /// Human readable name of the missing capability
        capability: String,
    },

    /// The request was rejected for a reason other than a missing capability.
    #[error(transparent)]
    Invalid(#[from] QuantumError),
}

impl ConstructionError {
    /// Returns `true` if the failure is a missing capability.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ConstructionError::Unsupported { .. })
    }
}

/// Failures raised by named execution backends and their jobs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// No backend is registered under the requested name.
    #[error("Backend '{name}' not found (available: {available})")]
    NotFound {
        /// Requested backend name
        name: String,
        /// Comma separated list of registered names
        available: String,
    },

    /// The backend cannot run the circuit it was given.
    #[error("Backend '{backend}' rejected the circuit: {reason}")]
    Rejected {
        /// Backend that rejected the circuit
        backend: String,
        /// Why it was rejected
        reason: String,
    },

    /// The simulation itself failed.
    #[error("Execution failed: {0}")]
    Execution(#[from] QuantumError),
}
