//! Error types for simulation operations.

use pd_solver::SolverError;
use thiserror::Error;

/// Errors encountered while setting up or running a cycle simulation.
#[derive(Error, Debug)]
pub enum SimError {
    /// Bad setup; the run never starts.
    #[error("Configuration error: {what}")]
    Config { what: String },

    /// Registry and event handling disagree; the run is aborted.
    #[error("Invariant violated: {what}")]
    Invariant { what: String },

    #[error("Not supported: {what}")]
    Unsupported { what: &'static str },

    #[error("No convergence for {what} after {iterations} iterations (residual {residual:e})")]
    NonConvergence {
        what: &'static str,
        iterations: usize,
        residual: f64,
    },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        SimError::Config { what: what.into() }
    }

    pub(crate) fn invariant(what: impl Into<String>) -> Self {
        SimError::Invariant { what: what.into() }
    }
}

impl From<SolverError> for SimError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::ConvergenceFailed {
                what,
                iterations,
                residual,
            } => SimError::NonConvergence {
                what,
                iterations,
                residual,
            },
            other => SimError::Backend {
                message: other.to_string(),
            },
        }
    }
}

impl From<pd_fluids::FluidError> for SimError {
    fn from(e: pd_fluids::FluidError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<pd_flow::FlowError> for SimError {
    fn from(e: pd_flow::FlowError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<pd_core::CoreError> for SimError {
    fn from(e: pd_core::CoreError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}
