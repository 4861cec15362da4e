//! Parallel shaft-speed sweeps.
//!
//! Each point is an independent model; nothing but the store directory is
//! shared, and every run lands under its own id.

use pd_project::schema::Project;
use pd_results::RunStore;
use rayon::prelude::*;
use tracing::warn;

use crate::error::AppResult;
use crate::run_service::{RunOptions, RunResponse, run_project};

pub struct SweepPoint {
    pub omega_rad_s: f64,
    pub result: AppResult<RunResponse>,
}

/// Run `project` once per shaft speed, in parallel. Results keep the input
/// order; a failed point does not stop the others.
pub fn sweep_omega(
    project: &Project,
    omegas: &[f64],
    store: &RunStore,
    options: &RunOptions,
) -> Vec<SweepPoint> {
    omegas
        .par_iter()
        .map(|&omega| {
            let mut point = project.clone();
            point.omega_rad_s = omega;
            let result = run_project(&point, store, options);
            if let Err(e) = &result {
                warn!(omega, error = %e, "sweep point failed");
            }
            SweepPoint {
                omega_rad_s: omega,
                result,
            }
        })
        .collect()
}
