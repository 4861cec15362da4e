//! Error types for the pd-app service layer.

use std::path::PathBuf;

/// Application error wrapping the engine crates' errors behind one
/// interface for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project validation failed: {0}")]
    Validation(String),

    #[error("Unsupported: {message}")]
    Unsupported { message: String },

    #[error("Model compilation failed: {0}")]
    Compile(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pd-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<pd_project::ProjectError> for AppError {
    fn from(err: pd_project::ProjectError) -> Self {
        match err {
            pd_project::ProjectError::Validation(v) => AppError::Validation(v.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<pd_project::ValidationError> for AppError {
    fn from(err: pd_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<pd_sim::SimError> for AppError {
    fn from(err: pd_sim::SimError) -> Self {
        match err {
            pd_sim::SimError::Config { what } => AppError::Compile(what),
            pd_sim::SimError::Unsupported { what } => AppError::Unsupported {
                message: what.to_string(),
            },
            other => AppError::Simulation(other.to_string()),
        }
    }
}

impl From<pd_results::ResultsError> for AppError {
    fn from(err: pd_results::ResultsError) -> Self {
        match err {
            pd_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}

impl From<pd_fluids::FluidError> for AppError {
    fn from(err: pd_fluids::FluidError) -> Self {
        AppError::Compile(err.to_string())
    }
}

impl From<pd_flow::FlowError> for AppError {
    fn from(err: pd_flow::FlowError) -> Self {
        AppError::Compile(err.to_string())
    }
}
