//! Fluid property errors.

use pd_core::CoreError;
use thiserror::Error;

pub type FluidResult<T> = Result<T, FluidError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    /// Non-physical values (negative density, pressure, etc.).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: &'static str },

    #[error("Value out of range for {what}")]
    OutOfRange { what: &'static str },

    /// Operation not available for this backend or species.
    #[error("Not supported: {what}")]
    NotSupported { what: &'static str },

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Convergence failed for {what}")]
    ConvergenceFailed { what: &'static str },
}

impl From<CoreError> for FluidError {
    fn from(err: CoreError) -> Self {
        FluidError::Backend {
            message: err.to_string(),
        }
    }
}
