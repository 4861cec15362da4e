//! Common utilities for flow calculations.

use crate::error::{FlowError, FlowResult};
use pd_core::numeric::ensure_finite;

/// Pressure band (Pa) treated as a tie: no flow either way.
pub const EPSILON_PRESSURE: f64 = 1e-3;

pub fn check_finite(value: f64, what: &'static str) -> FlowResult<()> {
    ensure_finite(value, what).map_err(|_| FlowError::NonPhysical { what })?;
    Ok(())
}

/// 1.0 when `p_a` is upstream, -1.0 when `p_b` is, 0.0 on a tie.
pub fn flow_direction(p_a: f64, p_b: f64) -> f64 {
    let dp = p_a - p_b;
    if dp.abs() < EPSILON_PRESSURE {
        0.0
    } else if dp > 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Darcy friction factor: laminar below Re 2300, Swamee-Jain above.
pub fn friction_factor(reynolds: f64, rel_roughness: f64) -> f64 {
    if reynolds <= 0.0 {
        return 0.0;
    }
    if reynolds < 2300.0 {
        64.0 / reynolds
    } else {
        let a = rel_roughness / 3.7;
        let b = 5.74 / reynolds.powf(0.9);
        let f = 0.25 / (a + b).log10().powi(2);
        f.max(0.0001)
    }
}
