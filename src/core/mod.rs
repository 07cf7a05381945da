// src/core/mod.rs

//! Core data structures and types

pub mod error;
pub mod state;

pub use error::{BackendError, ConstructionError, QuantumError, QubitId};
pub use state::StateVector;
