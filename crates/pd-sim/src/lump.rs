//! Lumped solid energy balance.

use pd_solver::{RootConfig, RootResult, bracket_and_solve};

use crate::error::SimResult;

/// Initial half-width of the lump temperature bracket [K].
pub const LUMP_BRACKET_K: f64 = 50.0;

/// Heat terms that do not depend on the lump temperature, from the last
/// cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LumpLoads {
    /// Bearing friction dissipated in the solid [W]
    pub w_bearings: f64,
    /// Cycle-mean heat from the walls into the chamber gas [W]
    pub q_gas: f64,
}

/// `Q_net = −Q_tubes(T) − Q_amb(T) + W_bearings − Q̄_gas`, positive when the
/// lump gains heat.
pub fn net_heat(q_tubes: f64, q_ambient: f64, loads: &LumpLoads) -> f64 {
    -q_tubes - q_ambient + loads.w_bearings - loads.q_gas
}

/// Root-find the lump temperature starting from `[t0 − 50, t0 + 50]`,
/// widening the bracket as needed.
pub fn solve_lump_temperature<F>(residual: F, t0: f64, tol_w: f64) -> SimResult<RootResult>
where
    F: FnMut(f64) -> SimResult<f64>,
{
    bracket_and_solve(
        "lump temperature",
        residual,
        t0,
        LUMP_BRACKET_K,
        6,
        &RootConfig {
            max_iterations: 100,
            f_tol: tol_w,
            x_tol: 1e-6,
        },
    )
}
