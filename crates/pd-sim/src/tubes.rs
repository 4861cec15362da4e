//! Boundary conduits feeding and draining the chamber network.
//!
//! A tube has no dynamics of its own. One end state is imposed (the
//! boundary condition); the other follows from the cycle-mean flow, an
//! isothermal-wall NTU heat balance and a Darcy-Weisbach pressure drop.

use std::collections::HashMap;
use std::f64::consts::PI;

use pd_core::units::{k, pa};
use pd_flow::friction_factor;
use pd_fluids::{FluidModel, FluidState, StateInput};

use crate::error::{SimError, SimResult};

const MDOT_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TubeEnd {
    One,
    Two,
}

#[derive(Debug, Clone)]
pub struct Tube {
    pub key1: String,
    pub key2: String,
    pub length_m: f64,
    pub diameter_m: f64,
    pub rel_roughness: f64,
    pub mu_pa_s: f64,
    /// Wall film coefficient [W/(m²·K)]
    pub alpha_w_per_m2k: f64,
    /// Extra heat into the gas from outside the lump [W]
    pub q_add_w: f64,
    pub fixed: TubeEnd,
    /// Mass flow from `key1` to `key2` [kg/s]
    pub mdot_kg_s: f64,
    /// Wall-to-gas heat from the last update [W]
    pub q_w: f64,
    state1: FluidState,
    state2: FluidState,
}

impl Tube {
    pub fn new(
        key1: impl Into<String>,
        key2: impl Into<String>,
        length_m: f64,
        diameter_m: f64,
        fixed: TubeEnd,
        fixed_state: FluidState,
    ) -> SimResult<Self> {
        if !(length_m > 0.0 && diameter_m > 0.0) {
            return Err(SimError::config("tube length and diameter must be positive"));
        }
        Ok(Self {
            key1: key1.into(),
            key2: key2.into(),
            length_m,
            diameter_m,
            rel_roughness: 1e-5,
            mu_pa_s: 1.8e-5,
            alpha_w_per_m2k: 0.0,
            q_add_w: 0.0,
            fixed,
            mdot_kg_s: 0.0,
            q_w: 0.0,
            state1: fixed_state,
            state2: fixed_state,
        })
    }

    pub fn with_wall_coefficient(mut self, alpha_w_per_m2k: f64) -> Self {
        self.alpha_w_per_m2k = alpha_w_per_m2k;
        self
    }

    pub fn state(&self, end: TubeEnd) -> &FluidState {
        match end {
            TubeEnd::One => &self.state1,
            TubeEnd::Two => &self.state2,
        }
    }

    pub fn fixed_state(&self) -> &FluidState {
        self.state(self.fixed)
    }

    /// Replace the imposed boundary state.
    pub fn set_fixed_state(&mut self, state: FluidState) {
        match self.fixed {
            TubeEnd::One => self.state1 = state,
            TubeEnd::Two => self.state2 = state,
        }
    }

    fn flow_area(&self) -> f64 {
        PI * self.diameter_m.powi(2) / 4.0
    }

    fn wall_area(&self) -> f64 {
        PI * self.diameter_m * self.length_m
    }

    /// Darcy-Weisbach pressure drop for `mdot` at density `rho` [Pa].
    pub fn pressure_drop(&self, rho: f64, mdot: f64) -> f64 {
        let mdot = mdot.abs();
        if mdot < MDOT_EPS || rho <= 0.0 {
            return 0.0;
        }
        let v = mdot / (rho * self.flow_area());
        let re = rho * v * self.diameter_m / self.mu_pa_s;
        let f = friction_factor(re, self.rel_roughness);
        f * self.length_m / self.diameter_m * 0.5 * rho * v * v
    }

    /// Outlet temperature and wall heat for inlet temperature `t_in`.
    fn heat_balance(&self, t_in: f64, cp: f64, t_wall: f64) -> (f64, f64) {
        let mdot = self.mdot_kg_s.abs();
        if mdot < MDOT_EPS {
            return (t_in, 0.0);
        }
        let ntu = self.alpha_w_per_m2k * self.wall_area() / (mdot * cp);
        let t_wall_out = t_wall - (t_wall - t_in) * (-ntu).exp();
        let q_wall = mdot * cp * (t_wall_out - t_in);
        (t_wall_out + self.q_add_w / (mdot * cp), q_wall)
    }

    /// Recompute the free end for mass flow `mdot` and wall temperature
    /// `t_wall`.
    ///
    /// With the downstream end fixed (`TubeEnd::Two`) the upstream enthalpy
    /// comes from `upstream_h` (the mixed discharge enthalpy), or is kept.
    pub fn update(
        &mut self,
        fluid: &dyn FluidModel,
        mdot: f64,
        t_wall: f64,
        upstream_h: Option<f64>,
    ) -> SimResult<()> {
        self.mdot_kg_s = mdot;
        let species = self.fixed_state().species();
        match self.fixed {
            TubeEnd::One => {
                let inlet = self.state1;
                let (t_out, q) = self.heat_balance(inlet.t_k(), inlet.cp(), t_wall);
                let p_out = inlet.p_pa() - self.pressure_drop(inlet.rho_kg_m3(), mdot);
                if p_out <= 0.0 {
                    return Err(SimError::invariant(format!(
                        "tube {}-{} pressure drop exceeds inlet pressure",
                        self.key1, self.key2
                    )));
                }
                self.state2 = fluid.state(StateInput::PT { p: pa(p_out), t: k(t_out) }, species)?;
                self.q_w = q;
            }
            TubeEnd::Two => {
                let p2 = self.state2.p_pa();
                let h1 = upstream_h.unwrap_or(self.state1.h());
                let p1 = p2 + self.pressure_drop(self.state1.rho_kg_m3(), mdot);
                self.state1 = fluid.state(StateInput::PH { p: pa(p1), h: h1 }, species)?;
                let (t_out, q) = self.heat_balance(self.state1.t_k(), self.state1.cp(), t_wall);
                self.state2 = fluid.state(StateInput::PT { p: pa(p2), t: k(t_out) }, species)?;
                self.q_w = q;
            }
        }
        Ok(())
    }
}

/// Tubes keyed by their node names.
#[derive(Debug, Default)]
pub struct TubeNetwork {
    tubes: Vec<Tube>,
    nodes: HashMap<String, (usize, TubeEnd)>,
}

impl TubeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tube: Tube) -> SimResult<usize> {
        for key in [&tube.key1, &tube.key2] {
            if self.nodes.contains_key(key) {
                return Err(SimError::config(format!("duplicate tube node '{key}'")));
            }
        }
        let idx = self.tubes.len();
        self.nodes.insert(tube.key1.clone(), (idx, TubeEnd::One));
        self.nodes.insert(tube.key2.clone(), (idx, TubeEnd::Two));
        self.tubes.push(tube);
        Ok(idx)
    }

    pub fn node(&self, key: &str) -> Option<(usize, TubeEnd)> {
        self.nodes.get(key).copied()
    }

    pub fn node_state(&self, tube: usize, end: TubeEnd) -> Option<&FluidState> {
        self.tubes.get(tube).map(|t| t.state(end))
    }

    pub fn get(&self, idx: usize) -> Option<&Tube> {
        self.tubes.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Tube> {
        self.tubes.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tube> {
        self.tubes.iter()
    }

    pub fn len(&self) -> usize {
        self.tubes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tubes.is_empty()
    }

    /// Sum of wall-to-gas heat over all tubes [W].
    pub fn total_heat(&self) -> f64 {
        self.tubes.iter().map(|t| t.q_w).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pd_fluids::{IdealGasModel, Species};

    fn inlet_tube() -> (IdealGasModel, Tube) {
        let model = IdealGasModel::new();
        let st = model
            .state(StateInput::PT { p: pa(3e5), t: k(290.0) }, Species::Air)
            .unwrap();
        let tube = Tube::new("inlet.1", "inlet.2", 0.3, 0.02, TubeEnd::One, st)
            .unwrap()
            .with_wall_coefficient(50.0);
        (model, tube)
    }

    #[test]
    fn hot_wall_heats_gas_toward_wall_temperature() {
        let (model, mut tube) = inlet_tube();
        tube.update(&model, 0.05, 330.0, None).unwrap();
        let t2 = tube.state(TubeEnd::Two).t_k();
        assert!(t2 > 290.0 && t2 < 330.0, "t2 = {t2}");
        assert!(tube.q_w > 0.0);
        assert!(tube.state(TubeEnd::Two).p_pa() < 3e5);
    }

    #[test]
    fn added_heat_raises_outlet_temperature() {
        let (model, mut tube) = inlet_tube();
        tube.update(&model, 0.05, 290.0, None).unwrap();
        let base = tube.state(TubeEnd::Two).t_k();
        tube.q_add_w = 100.0;
        tube.update(&model, 0.05, 290.0, None).unwrap();
        let heated = tube.state(TubeEnd::Two).t_k();
        let expected = 100.0 / (0.05 * Species::Air.cp0());
        assert!((heated - base - expected).abs() < 1e-6);
        assert!(tube.q_w.abs() < 1e-9);
    }

    #[test]
    fn fixed_outlet_end_back_computes_inlet() {
        let model = IdealGasModel::new();
        let out = model
            .state(StateInput::PT { p: pa(9e5), t: k(360.0) }, Species::Air)
            .unwrap();
        let mut tube = Tube::new("outlet.1", "outlet.2", 0.3, 0.02, TubeEnd::Two, out).unwrap();
        let h_mix = Species::Air.cp0() * 370.0;
        tube.update(&model, 0.05, 340.0, Some(h_mix)).unwrap();
        assert!(tube.state(TubeEnd::One).p_pa() > 9e5);
        assert!((tube.state(TubeEnd::One).t_k() - 370.0).abs() < 1e-9);
        assert_eq!(tube.state(TubeEnd::Two).p_pa(), 9e5);
    }

    #[test]
    fn network_rejects_duplicate_nodes() {
        let (_, tube) = inlet_tube();
        let mut net = TubeNetwork::new();
        net.add(tube.clone()).unwrap();
        assert!(net.add(tube).is_err());
        assert_eq!(net.node("inlet.2"), Some((0, TubeEnd::Two)));
    }
}
