//! Thermodynamic state definitions.

use crate::error::{FluidError, FluidResult};
use crate::species::Species;
use pd_core::units::{Density, Pressure, Temperature, kgpm3, k, pa};

/// Specific enthalpy [J/kg].
pub type SpecEnthalpy = f64;

/// Specific internal energy [J/kg].
pub type SpecEnergy = f64;

/// Specific entropy [J/(kg·K)].
pub type SpecEntropy = f64;

/// Specific heat capacity [J/(kg·K)].
pub type SpecHeatCapacity = f64;

/// Two independent properties fixing a state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateInput {
    PT { p: Pressure, t: Temperature },
    DT { rho: Density, t: Temperature },
    /// Density and specific internal energy: the chamber integration pair.
    DU { rho: Density, u: SpecEnergy },
    PH { p: Pressure, h: SpecEnthalpy },
    PS { p: Pressure, s: SpecEntropy },
    DP { rho: Density, p: Pressure },
}

/// Immutable state snapshot.
///
/// A chamber holds one of these and replaces it wholesale on every update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidState {
    p_pa: f64,
    t_k: f64,
    rho_kg_m3: f64,
    u_j_per_kg: SpecEnergy,
    h_j_per_kg: SpecEnthalpy,
    s_j_per_kg_k: SpecEntropy,
    cp: SpecHeatCapacity,
    cv: SpecHeatCapacity,
    species: Species,
}

impl FluidState {
    /// Assemble a snapshot from backend output, rejecting non-physical values.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        species: Species,
        p_pa: f64,
        t_k: f64,
        rho_kg_m3: f64,
        u_j_per_kg: SpecEnergy,
        h_j_per_kg: SpecEnthalpy,
        s_j_per_kg_k: SpecEntropy,
        cp: SpecHeatCapacity,
        cv: SpecHeatCapacity,
    ) -> FluidResult<Self> {
        if !p_pa.is_finite() || p_pa <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "pressure must be positive and finite",
            });
        }
        if !t_k.is_finite() || t_k <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "temperature must be positive and finite",
            });
        }
        if !rho_kg_m3.is_finite() || rho_kg_m3 <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "density must be positive and finite",
            });
        }
        if !(u_j_per_kg.is_finite() && h_j_per_kg.is_finite() && s_j_per_kg_k.is_finite()) {
            return Err(FluidError::NonPhysical {
                what: "energy properties must be finite",
            });
        }
        Ok(Self {
            p_pa,
            t_k,
            rho_kg_m3,
            u_j_per_kg,
            h_j_per_kg,
            s_j_per_kg_k,
            cp,
            cv,
            species,
        })
    }

    pub fn pressure(&self) -> Pressure {
        pa(self.p_pa)
    }

    pub fn temperature(&self) -> Temperature {
        k(self.t_k)
    }

    pub fn density(&self) -> Density {
        kgpm3(self.rho_kg_m3)
    }

    pub fn p_pa(&self) -> f64 {
        self.p_pa
    }

    pub fn t_k(&self) -> f64 {
        self.t_k
    }

    pub fn rho_kg_m3(&self) -> f64 {
        self.rho_kg_m3
    }

    pub fn u(&self) -> SpecEnergy {
        self.u_j_per_kg
    }

    pub fn h(&self) -> SpecEnthalpy {
        self.h_j_per_kg
    }

    pub fn s(&self) -> SpecEntropy {
        self.s_j_per_kg_k
    }

    pub fn cp(&self) -> SpecHeatCapacity {
        self.cp
    }

    pub fn cv(&self) -> SpecHeatCapacity {
        self.cv
    }

    pub fn gamma(&self) -> f64 {
        self.cp / self.cv
    }

    pub fn species(&self) -> Species {
        self.species
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_physical_parts() {
        let ok = FluidState::from_parts(Species::Air, 1e5, 300.0, 1.16, 2e5, 3e5, 0.0, 1005.0, 718.0);
        assert!(ok.is_ok());
        let bad_p =
            FluidState::from_parts(Species::Air, -1.0, 300.0, 1.16, 2e5, 3e5, 0.0, 1005.0, 718.0);
        assert!(bad_p.is_err());
        let bad_t =
            FluidState::from_parts(Species::Air, 1e5, 0.0, 1.16, 2e5, 3e5, 0.0, 1005.0, 718.0);
        assert!(bad_t.is_err());
        let bad_u = FluidState::from_parts(
            Species::Air,
            1e5,
            300.0,
            1.16,
            f64::NAN,
            3e5,
            0.0,
            1005.0,
            718.0,
        );
        assert!(bad_u.is_err());
    }

    #[test]
    fn uom_accessors_match_raw() {
        let st =
            FluidState::from_parts(Species::N2, 2e5, 320.0, 2.1, 2.3e5, 3.2e5, 10.0, 1040.0, 743.0)
                .unwrap();
        assert_eq!(st.pressure().value, 2e5);
        assert_eq!(st.temperature().value, 320.0);
        assert_eq!(st.density().value, 2.1);
        assert!((st.gamma() - 1040.0 / 743.0).abs() < 1e-12);
    }
}
