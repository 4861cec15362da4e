//! Error types for root finding.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Convergence failed for {what} after {iterations} iterations (residual {residual:e})")]
    ConvergenceFailed {
        what: &'static str,
        iterations: usize,
        residual: f64,
    },

    #[error("Root not bracketed for {what}: f({lo})={f_lo:e}, f({hi})={f_hi:e}")]
    NotBracketed {
        what: &'static str,
        lo: f64,
        hi: f64,
        f_lo: f64,
        f_hi: f64,
    },

    #[error("Numeric error: {what}")]
    Numeric { what: &'static str },
}

pub type SolverResult<T> = Result<T, SolverError>;
