//! Fluid property model trait.

use crate::error::{FluidError, FluidResult};
use crate::species::Species;
use crate::state::{FluidState, StateInput};
use pd_core::units::{Pressure, Temperature};

/// Scalar outputs of the property service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Pressure,
    Temperature,
    Density,
    InternalEnergy,
    Enthalpy,
    Entropy,
    Cp,
    Cv,
}

impl Property {
    pub fn of(self, state: &FluidState) -> f64 {
        match self {
            Property::Pressure => state.p_pa(),
            Property::Temperature => state.t_k(),
            Property::Density => state.rho_kg_m3(),
            Property::InternalEnergy => state.u(),
            Property::Enthalpy => state.h(),
            Property::Entropy => state.s(),
            Property::Cp => state.cp(),
            Property::Cv => state.cv(),
        }
    }
}

/// Trait for fluid property backends.
///
/// Implementations are pure and thread-safe so that independent runs can
/// share one model across worker threads.
pub trait FluidModel: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, species: Species) -> bool;

    /// Full state from two independent properties.
    fn state(&self, input: StateInput, species: Species) -> FluidResult<FluidState>;

    /// Single property lookup.
    fn property(&self, output: Property, input: StateInput, species: Species) -> FluidResult<f64> {
        Ok(output.of(&self.state(input, species)?))
    }

    /// Saturation temperature at pressure `p` and vapor quality `q`.
    fn saturation_temperature(
        &self,
        _p: Pressure,
        _q: f64,
        _species: Species,
    ) -> FluidResult<Temperature> {
        Err(FluidError::NotSupported {
            what: "saturation queries",
        })
    }

    /// Saturation pressure at temperature `t` and vapor quality `q`.
    fn saturation_pressure(
        &self,
        _t: Temperature,
        _q: f64,
        _species: Species,
    ) -> FluidResult<Pressure> {
        Err(FluidError::NotSupported {
            what: "saturation queries",
        })
    }

    /// Whether this backend can represent two-phase states.
    fn handles_two_phase(&self) -> bool {
        false
    }
}
