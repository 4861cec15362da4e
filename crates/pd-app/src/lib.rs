//! Shared application service layer for the compressor simulator.
//!
//! This crate sits between the CLI and the engine crates: it compiles a
//! project file into a runnable compressor model, executes or loads cached
//! runs, and answers queries against persisted run records.

pub mod compile;
pub mod error;
pub mod ideal_scroll;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;
pub mod sweep;

pub use compile::{CompiledModel, build_fluid_model, compile_model, mechanical_config};
pub use error::{AppError, AppResult};
pub use ideal_scroll::{IdealScroll, Pocket, PocketKind};
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{load_project, save_project, validate_project};
pub use query::{RunSummary, chamber_series, dataset_to_csv, get_run_summary};
pub use run_service::{
    ENGINE_VERSION, RunOptions, RunRequest, RunResponse, ensure_run, ensure_run_with_progress,
    list_runs, load_run, open_store, run_project,
};
pub use sweep::{SweepPoint, sweep_omega};
