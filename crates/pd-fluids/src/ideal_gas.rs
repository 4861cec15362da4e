//! Calorically perfect ideal gas.
//!
//! `u = cv·T`, `h = cp·T`, `s = cp·ln(T/T_ref) − R·ln(p/p_ref)`. Every input
//! pair has a closed-form inverse, so no iteration happens here.

use crate::error::{FluidError, FluidResult};
use crate::model::FluidModel;
use crate::species::Species;
use crate::state::{FluidState, StateInput};

#[derive(Debug, Clone, Copy, Default)]
pub struct IdealGasModel;

impl IdealGasModel {
    pub fn new() -> Self {
        Self
    }

    fn from_pt(species: Species, p: f64, t: f64) -> FluidResult<FluidState> {
        if !t.is_finite() || t <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "temperature must be positive and finite",
            });
        }
        let r = species.gas_constant();
        let cp = species.cp0();
        let cv = species.cv0();
        let (t_ref, p_ref) = species.entropy_reference();
        let rho = p / (r * t);
        let s = cp * (t / t_ref).ln() - r * (p / p_ref).ln();
        FluidState::from_parts(species, p, t, rho, cv * t, cp * t, s, cp, cv)
    }
}

impl FluidModel for IdealGasModel {
    fn name(&self) -> &str {
        "IdealGas"
    }

    fn supports(&self, _species: Species) -> bool {
        true
    }

    fn state(&self, input: StateInput, species: Species) -> FluidResult<FluidState> {
        let r = species.gas_constant();
        let cp = species.cp0();
        let cv = species.cv0();
        match input {
            StateInput::PT { p, t } => Self::from_pt(species, p.value, t.value),
            StateInput::DT { rho, t } => Self::from_pt(species, rho.value * r * t.value, t.value),
            StateInput::DU { rho, u } => {
                let t = u / cv;
                Self::from_pt(species, rho.value * r * t, t)
            }
            StateInput::PH { p, h } => Self::from_pt(species, p.value, h / cp),
            StateInput::PS { p, s } => {
                let (t_ref, p_ref) = species.entropy_reference();
                let t = t_ref * ((s + r * (p.value / p_ref).ln()) / cp).exp();
                Self::from_pt(species, p.value, t)
            }
            StateInput::DP { rho, p } => {
                if !rho.value.is_finite() || rho.value <= 0.0 {
                    return Err(FluidError::NonPhysical {
                        what: "density must be positive and finite",
                    });
                }
                Self::from_pt(species, p.value, p.value / (rho.value * r))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Property;
    use pd_core::units::{k, kgpm3, pa};

    fn air_state() -> FluidState {
        IdealGasModel::new()
            .state(
                StateInput::PT {
                    p: pa(101_325.0),
                    t: k(300.0),
                },
                Species::Air,
            )
            .unwrap()
    }

    #[test]
    fn pt_density_matches_ideal_gas_law() {
        let st = air_state();
        assert!((st.rho_kg_m3() - 101_325.0 / (287.05 * 300.0)).abs() < 2e-3);
    }

    #[test]
    fn every_input_pair_recovers_the_same_state() {
        let model = IdealGasModel::new();
        let st = air_state();
        let inputs = [
            StateInput::DT {
                rho: st.density(),
                t: st.temperature(),
            },
            StateInput::DU {
                rho: st.density(),
                u: st.u(),
            },
            StateInput::PH {
                p: st.pressure(),
                h: st.h(),
            },
            StateInput::PS {
                p: st.pressure(),
                s: st.s(),
            },
            StateInput::DP {
                rho: st.density(),
                p: st.pressure(),
            },
        ];
        for input in inputs {
            let other = model.state(input, Species::Air).unwrap();
            assert!((other.t_k() - 300.0).abs() < 1e-9, "{input:?}");
            assert!((other.p_pa() - 101_325.0).abs() < 1e-6, "{input:?}");
        }
    }

    #[test]
    fn entropy_is_zero_at_reference() {
        let s = IdealGasModel::new()
            .property(
                Property::Entropy,
                StateInput::PT {
                    p: pa(101_325.0),
                    t: k(298.15),
                },
                Species::N2,
            )
            .unwrap();
        assert!(s.abs() < 1e-9);
    }

    #[test]
    fn rejects_negative_energy_and_saturation() {
        let model = IdealGasModel::new();
        let bad = model.state(
            StateInput::DU {
                rho: kgpm3(1.0),
                u: -10.0,
            },
            Species::Air,
        );
        assert!(matches!(bad, Err(FluidError::NonPhysical { .. })));
        let sat = model.saturation_temperature(pa(1e5), 1.0, Species::R134a);
        assert!(matches!(sat, Err(FluidError::NotSupported { .. })));
    }
}
