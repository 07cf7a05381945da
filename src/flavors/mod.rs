// src/flavors/mod.rs

//! The two circuit-building flavors. Both lower to [`crate::circuits::Circuit`]
//! and run on the shared [`crate::simulation::Simulator`].

pub mod grid;
pub mod register;

pub use grid::GridToolkit;
pub use register::RegisterToolkit;
