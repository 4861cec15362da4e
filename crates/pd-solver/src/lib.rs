//! pd-solver: one-dimensional root finding for the simulator.
//!
//! Used for the merged-chamber temperature, the lump energy balance and
//! any scalar closure the outer loop needs. Every solver is bounded by an
//! iteration count and reports the last residual on failure.

pub mod error;
pub mod root;

pub use error::{SolverError, SolverResult};
pub use root::{RootConfig, RootResult, bracket_and_solve, illinois};
