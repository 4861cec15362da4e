//! CoolProp-based fluid property model.

use crate::error::{FluidError, FluidResult};
use crate::model::FluidModel;
use crate::species::Species;
use crate::state::{FluidState, StateInput};
use pd_core::units::{Pressure, Temperature, k, pa};
use rfluids::prelude::*;

const T_MIN: f64 = 100.0;
const T_MAX: f64 = 2000.0;
const MAX_ITER: usize = 100;

/// CoolProp backend for real-fluid properties.
///
/// rfluids `Fluid` instances are built per call, so the model itself holds no state.
#[derive(Debug, Default)]
pub struct CoolPropModel;

fn backend(what: &str, e: impl std::fmt::Display) -> FluidError {
    FluidError::Backend {
        message: format!("rfluids error {what}: {e}"),
    }
}

fn validate_quality(q: f64) -> FluidResult<()> {
    if !(0.0..=1.0).contains(&q) {
        return Err(FluidError::OutOfRange {
            what: "quality must lie in [0, 1]",
        });
    }
    Ok(())
}

impl CoolPropModel {
    pub fn new() -> Self {
        Self
    }

    fn snapshot(&self, species: Species, mut fluid: Fluid) -> FluidResult<FluidState> {
        let p = fluid.pressure().map_err(|e| backend("getting pressure", e))?;
        let t = fluid.temperature().map_err(|e| backend("getting temperature", e))?;
        let rho = fluid.density().map_err(|e| backend("getting density", e))?;
        let h = fluid.enthalpy().map_err(|e| backend("getting enthalpy", e))?;
        let s = fluid.entropy().map_err(|e| backend("getting entropy", e))?;
        let cp = fluid.specific_heat().map_err(|e| backend("getting cp", e))?;
        // cv from the ideal-gas offset; only tube NTU and nozzle gamma read it
        let cv = (cp - species.gas_constant()).max(f64::EPSILON);
        FluidState::from_parts(species, p, t, rho, h - p / rho, h, s, cp, cv)
    }

    fn fluid_at(&self, species: Species, a: FluidInput, b: FluidInput) -> FluidResult<Fluid> {
        Fluid::from(species.rfluids_pure())
            .in_state(a, b)
            .map_err(|e| backend("setting state", e))
    }

    /// Bisection on T at fixed density so that u(ρ, T) = u_target.
    fn solve_t_from_rho_u(&self, species: Species, rho: f64, u_target: f64) -> FluidResult<f64> {
        let u_at = |t: f64| -> FluidResult<f64> {
            let mut fluid =
                self.fluid_at(species, FluidInput::density(rho), FluidInput::temperature(t))?;
            let h = fluid.enthalpy().map_err(|e| backend("getting enthalpy", e))?;
            let p = fluid.pressure().map_err(|e| backend("getting pressure", e))?;
            Ok(h - p / rho)
        };

        let (mut lo, mut hi) = (T_MIN, T_MAX);
        if u_target < u_at(lo)? || u_target > u_at(hi)? {
            return Err(FluidError::OutOfRange {
                what: "internal energy outside valid range for given density",
            });
        }
        for _ in 0..MAX_ITER {
            let mid = 0.5 * (lo + hi);
            let u_mid = u_at(mid)?;
            if (u_mid - u_target).abs() < 1e-6_f64.max(u_target.abs() * 1e-10) {
                return Ok(mid);
            }
            if u_mid < u_target {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Err(FluidError::ConvergenceFailed {
            what: "temperature from density and internal energy",
        })
    }
}

impl FluidModel for CoolPropModel {
    fn name(&self) -> &str {
        "CoolProp"
    }

    fn supports(&self, _species: Species) -> bool {
        true
    }

    fn state(&self, input: StateInput, species: Species) -> FluidResult<FluidState> {
        let fluid = match input {
            StateInput::PT { p, t } => self.fluid_at(
                species,
                FluidInput::pressure(p.value),
                FluidInput::temperature(t.value),
            )?,
            StateInput::DT { rho, t } => self.fluid_at(
                species,
                FluidInput::density(rho.value),
                FluidInput::temperature(t.value),
            )?,
            StateInput::DU { rho, u } => {
                let t = self.solve_t_from_rho_u(species, rho.value, u)?;
                self.fluid_at(
                    species,
                    FluidInput::density(rho.value),
                    FluidInput::temperature(t),
                )?
            }
            StateInput::PH { p, h } => self.fluid_at(
                species,
                FluidInput::pressure(p.value),
                FluidInput::enthalpy(h),
            )?,
            StateInput::PS { p, s } => self.fluid_at(
                species,
                FluidInput::pressure(p.value),
                FluidInput::entropy(s),
            )?,
            StateInput::DP { rho, p } => self.fluid_at(
                species,
                FluidInput::density(rho.value),
                FluidInput::pressure(p.value),
            )?,
        };
        self.snapshot(species, fluid)
    }

    fn saturation_temperature(
        &self,
        p: Pressure,
        q: f64,
        species: Species,
    ) -> FluidResult<Temperature> {
        validate_quality(q)?;
        let mut fluid = self.fluid_at(
            species,
            FluidInput::pressure(p.value),
            FluidInput::quality(q),
        )?;
        let t = fluid.temperature().map_err(|e| backend("getting temperature", e))?;
        Ok(k(t))
    }

    fn saturation_pressure(
        &self,
        t: Temperature,
        q: f64,
        species: Species,
    ) -> FluidResult<Pressure> {
        validate_quality(q)?;
        let mut fluid = self.fluid_at(
            species,
            FluidInput::temperature(t.value),
            FluidInput::quality(q),
        )?;
        let p = fluid.pressure().map_err(|e| backend("getting pressure", e))?;
        Ok(pa(p))
    }

    fn handles_two_phase(&self) -> bool {
        true
    }
}
