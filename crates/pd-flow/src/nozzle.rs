//! Isentropic nozzle with choking.

use crate::common::EPSILON_PRESSURE;
use crate::error::{FlowError, FlowResult};
use crate::traits::{FlowContext, FlowFunction};
use pd_fluids::FluidState;

/// Throat area as a function of crank angle [m²].
pub trait FlowArea: Send + Sync {
    fn area(&self, theta: f64) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantArea(pub f64);

impl FlowArea for ConstantArea {
    fn area(&self, _theta: f64) -> f64 {
        self.0
    }
}

impl<F> FlowArea for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn area(&self, theta: f64) -> f64 {
        self(theta)
    }
}

/// Compressible nozzle: `mdot = Cd A sqrt(2 ρ p γ/(γ-1) (r^(2/γ) − r^((γ+1)/γ)))`
/// with `r` clipped at the critical pressure ratio.
pub struct IsentropicNozzle {
    name: String,
    pub cd: f64,
    area: Box<dyn FlowArea>,
}

impl IsentropicNozzle {
    pub fn new(name: impl Into<String>, cd: f64, area: impl FlowArea + 'static) -> FlowResult<Self> {
        if !cd.is_finite() || cd < 0.0 {
            return Err(FlowError::InvalidArg {
                what: "discharge coefficient must be non-negative",
            });
        }
        Ok(Self {
            name: name.into(),
            cd,
            area: Box::new(area),
        })
    }

    pub fn area_at(&self, theta: f64) -> f64 {
        self.area.area(theta)
    }
}

impl std::fmt::Debug for IsentropicNozzle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsentropicNozzle")
            .field("name", &self.name)
            .field("cd", &self.cd)
            .finish_non_exhaustive()
    }
}

impl FlowFunction for IsentropicNozzle {
    fn name(&self) -> &str {
        &self.name
    }

    fn mdot(&self, ctx: &FlowContext, up: &FluidState, down: &FluidState) -> FlowResult<f64> {
        let area = self.area.area(ctx.theta);
        if area <= 0.0 || up.p_pa() - down.p_pa() < EPSILON_PRESSURE {
            return Ok(0.0);
        }
        let gamma = up.gamma();
        let p_up = up.p_pa();
        let pr_crit = (2.0 / (gamma + 1.0)).powf(gamma / (gamma - 1.0));
        let pr = (down.p_pa() / p_up).max(pr_crit);
        let psi = pr.powf(2.0 / gamma) - pr.powf((gamma + 1.0) / gamma);
        let mdot = self.cd
            * area
            * (2.0 * up.rho_kg_m3() * p_up * gamma / (gamma - 1.0) * psi).sqrt();
        // A degenerate ratio (gamma -> 1, zero density) is a closed nozzle
        if !mdot.is_finite() {
            return Ok(0.0);
        }
        Ok(mdot)
    }
}
