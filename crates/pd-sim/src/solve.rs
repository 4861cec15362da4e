//! Outer iteration to cyclic steady state.
//!
//! Each pass integrates one revolution, updates the boundary tubes from the
//! cycle-mean flows, evaluates forces and losses, re-solves the lump
//! temperature and reseeds the chambers. The loop ends when the reseed
//! residual, the inlet/outlet mass imbalance and the lump temperature change
//! are all inside tolerance.

use std::f64::consts::TAU;
use std::sync::Arc;

use pd_core::units::pa;
use pd_fluids::StateInput;
use tracing::{info, warn};

use crate::error::{SimError, SimResult};
use crate::forces::{ForceGeometry, ForceOptions, ForceSummary, compute_forces};
use crate::losses::{MechanicalConfig, MechanicalLosses, mechanical_losses, motor_losses};
use crate::lump::{LumpLoads, net_heat, solve_lump_temperature};
use crate::sim::SimulationState;
use crate::summary::{mean_flow_from, mean_heat_to_gas, mixed_enthalpy_into, pv_power};
use crate::tubes::{Tube, TubeEnd};

/// Adiabatic efficiency assumed before the first cycle.
pub const INITIAL_ADIABATIC_EFFICIENCY: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOptions {
    pub max_cycles: usize,
    /// Relative change of seeded chamber T and p between cycles
    pub cyclic_tol: f64,
    /// Relative inlet/outlet mass-flow mismatch
    pub mass_tol: f64,
    /// Lump energy balance residual [W]
    pub lump_tol_w: f64,
    /// Lump temperature change between cycles [K]
    pub lump_dt_tol_k: f64,
    /// Starting lump temperature; defaults to midway between suction and
    /// isentropic discharge temperature
    pub t_lump_init_k: Option<f64>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_cycles: 40,
            cyclic_tol: 1e-3,
            mass_tol: 1e-2,
            lump_tol_w: 1e-3,
            lump_dt_tol_k: 0.05,
            t_lump_init_k: None,
        }
    }
}

impl SolveOptions {
    pub fn validate(&self) -> SimResult<()> {
        if self.max_cycles == 0 {
            return Err(SimError::config("max_cycles must be positive"));
        }
        if !(self.cyclic_tol > 0.0
            && self.mass_tol > 0.0
            && self.lump_tol_w > 0.0
            && self.lump_dt_tol_k > 0.0)
        {
            return Err(SimError::config("outer-loop tolerances must be positive"));
        }
        Ok(())
    }
}

/// Converged operating point.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveSummary {
    /// Overall isentropic efficiency `ṁ (h2s − h1) / W_el`
    pub eta_oi: f64,
    pub mdot_kg_s: f64,
    pub wdot_pv_w: f64,
    pub wdot_mech_w: f64,
    pub wdot_el_w: f64,
    pub motor_losses_w: f64,
    pub motor_efficiency: f64,
    pub volumetric_efficiency: f64,
    pub t_lump_k: f64,
    pub q_gas_w: f64,
    pub q_ambient_w: f64,
    pub omega: f64,
    pub cycles: usize,
    pub cyclic_residual: f64,
    pub mass_imbalance: f64,
    pub forces: ForceSummary,
    pub losses: MechanicalLosses,
}

/// A simulation plus everything the outer loop needs around it.
pub struct CompressorModel {
    pub sim: SimulationState,
    pub geometry: Arc<dyn ForceGeometry>,
    pub mech: MechanicalConfig,
    /// Index of the suction tube in `sim.tubes`
    pub inlet_tube: usize,
    pub outlet_tube: usize,
    /// Swept suction volume per revolution [m³]
    pub displacement_m3: f64,
}

fn free_node(tube: &Tube) -> &str {
    match tube.fixed {
        TubeEnd::One => &tube.key2,
        TubeEnd::Two => &tube.key1,
    }
}

impl CompressorModel {
    fn tube(&self, idx: usize) -> SimResult<&Tube> {
        self.sim
            .tubes
            .get(idx)
            .ok_or_else(|| SimError::config(format!("no tube at index {idx}")))
    }

    fn tube_mut(&mut self, idx: usize) -> SimResult<&mut Tube> {
        self.sim
            .tubes
            .get_mut(idx)
            .ok_or_else(|| SimError::config(format!("no tube at index {idx}")))
    }

    pub fn validate(&mut self) -> SimResult<()> {
        self.mech.validate()?;
        if !(self.displacement_m3 > 0.0) {
            return Err(SimError::config("displacement must be positive"));
        }
        if self.inlet_tube == self.outlet_tube {
            return Err(SimError::config("inlet and outlet must be different tubes"));
        }
        self.tube(self.inlet_tube)?;
        self.tube(self.outlet_tube)?;
        self.sim.validate()
    }

    /// `(h1, h2s, T2s)` between the imposed suction state and the imposed
    /// discharge pressure.
    fn isentropic_reference(&self) -> SimResult<(f64, f64, f64)> {
        let inlet = *self.tube(self.inlet_tube)?.fixed_state();
        let p_out = self.tube(self.outlet_tube)?.fixed_state().p_pa();
        let out = self.sim.fluid.state(
            StateInput::PS {
                p: pa(p_out),
                s: inlet.s(),
            },
            inlet.species(),
        )?;
        Ok((inlet.h(), out.h(), out.t_k()))
    }

    fn suction_heating(&mut self, motor_losses_w: f64) -> SimResult<()> {
        let fraction = self.mech.suction_fraction;
        let outlet = self.outlet_tube;
        self.tube_mut(outlet)?.q_add_w = 0.0;
        let inlet = self.inlet_tube;
        self.tube_mut(inlet)?.q_add_w = fraction * motor_losses_w;
        Ok(())
    }

    /// Motor-loss and suction-heating estimate before any cycle has run.
    fn initial_motor_losses(&mut self, t_lump: f64) -> SimResult<()> {
        let (h1, h2s, _) = self.isentropic_reference()?;
        let rho_in = self.tube(self.inlet_tube)?.fixed_state().rho_kg_m3();
        let mdot = rho_in * self.displacement_m3 * self.sim.omega / TAU;
        let h2 = h1 + (h2s - h1) / INITIAL_ADIABATIC_EFFICIENCY;
        let w = (mdot * (h2 - h1)).abs();
        let point = self.mech.motor.operating_point(w / self.sim.omega)?;
        self.suction_heating(motor_losses(w, point.efficiency))?;
        let fluid = self.sim.fluid.clone();
        let inlet = self.inlet_tube;
        self.tube_mut(inlet)?.update(fluid.as_ref(), mdot, t_lump, None)?;
        Ok(())
    }

    pub fn solve(&mut self, opts: &SolveOptions) -> SimResult<SolveSummary> {
        opts.validate()?;
        let (h1, h2s, t2s) = self.isentropic_reference()?;
        let t_in = self.tube(self.inlet_tube)?.fixed_state().t_k();
        let mut t_lump = opts.t_lump_init_k.unwrap_or(0.5 * (t_in + t2s));
        self.initial_motor_losses(t_lump)?;

        let fluid = self.sim.fluid.clone();
        let inlet_node = free_node(self.tube(self.inlet_tube)?).to_owned();
        let outlet_node = free_node(self.tube(self.outlet_tube)?).to_owned();
        let mut last = (f64::INFINITY, f64::INFINITY, f64::INFINITY);

        for cycle in 1..=opts.max_cycles {
            self.sim.t_wall_k = t_lump;
            self.sim.run_cycle()?;
            let omega = self.sim.omega;
            let history = &self.sim.history;

            let mdot_in = mean_flow_from(history, &self.sim.flows, &inlet_node)?;
            let mdot_out = -mean_flow_from(history, &self.sim.flows, &outlet_node)?;
            let h_mix = mixed_enthalpy_into(history, &self.sim.flows, &outlet_node)?;
            let wdot_pv = pv_power(history, omega)?;
            let q_gas = mean_heat_to_gas(history)?;

            let p_in = self.tube(self.inlet_tube)?.fixed_state().p_pa();
            let p_out = self.tube(self.outlet_tube)?.fixed_state().p_pa();
            let ro = self.geometry.orbiting_radius();
            let forces = compute_forces(
                &self.sim.history,
                &self.sim.cvs,
                self.geometry.as_ref(),
                &ForceOptions {
                    back_pressure_pa: self.mech.shell_pressure.back_pressure(p_in, p_out),
                    back_area_m2: self.mech.back_area_m2(),
                    moment_arm_m: 0.5 * (self.geometry.wrap_height() + self.mech.upper_bearing.length_m),
                    orbiting_mass_kg: self.mech.orbiting_mass_kg,
                    omega,
                },
            )?;
            let losses = mechanical_losses(&forces, &self.mech, ro, omega)?;
            let wdot_mech = wdot_pv + losses.total_w;
            let point = self.mech.motor.operating_point(wdot_mech / omega)?;
            let w_motor = motor_losses(wdot_mech, point.efficiency);
            let wdot_el = wdot_mech + w_motor;
            self.suction_heating(w_motor)?;

            // Lump temperature with the tube heat recomputed at each trial
            let loads = LumpLoads {
                w_bearings: losses.total_w,
                q_gas,
            };
            let trial_tubes = [
                (self.tube(self.inlet_tube)?.clone(), mdot_in, None),
                (self.tube(self.outlet_tube)?.clone(), mdot_out, h_mix),
            ];
            let mech = &self.mech;
            let root = solve_lump_temperature(
                |t| {
                    let mut q_tubes = 0.0;
                    for (tube, mdot, h_up) in &trial_tubes {
                        let mut tube = tube.clone();
                        tube.update(fluid.as_ref(), *mdot, t, *h_up)?;
                        q_tubes += tube.q_w;
                    }
                    Ok(net_heat(q_tubes, mech.ambient_heat(t), &loads))
                },
                t_lump,
                opts.lump_tol_w,
            )?;
            let dt_lump = (root.x - t_lump).abs();
            t_lump = root.x;

            let (inlet, outlet) = (self.inlet_tube, self.outlet_tube);
            self.tube_mut(inlet)?.update(fluid.as_ref(), mdot_in, t_lump, None)?;
            self.tube_mut(outlet)?.update(fluid.as_ref(), mdot_out, t_lump, h_mix)?;

            let cyclic = self.sim.reseed()?;
            let mass_imbalance = if mdot_in.abs() > 0.0 {
                (mdot_in - mdot_out).abs() / mdot_in.abs()
            } else {
                f64::INFINITY
            };
            info!(
                cycle,
                cyclic,
                mass_imbalance,
                t_lump,
                mdot = mdot_in,
                wdot_el,
                "outer iteration"
            );

            if let Some(speed) = point.speed_rad_s
                && (speed - omega).abs() > 1e-9 * omega
            {
                info!(from = omega, to = speed, "motor map moved shaft speed");
                self.sim.omega = speed;
            }

            let converged = cycle > 1
                && cyclic < opts.cyclic_tol
                && mass_imbalance < opts.mass_tol
                && dt_lump < opts.lump_dt_tol_k;
            last = (cyclic, mass_imbalance, dt_lump);
            if converged {
                let rho_in = self.tube(self.inlet_tube)?.fixed_state().rho_kg_m3();
                return Ok(SolveSummary {
                    eta_oi: mdot_in * (h2s - h1) / wdot_el,
                    mdot_kg_s: mdot_in,
                    wdot_pv_w: wdot_pv,
                    wdot_mech_w: wdot_mech,
                    wdot_el_w: wdot_el,
                    motor_losses_w: w_motor,
                    motor_efficiency: point.efficiency,
                    volumetric_efficiency: mdot_in / (rho_in * self.displacement_m3 * omega / TAU),
                    t_lump_k: t_lump,
                    q_gas_w: q_gas,
                    q_ambient_w: self.mech.ambient_heat(t_lump),
                    omega,
                    cycles: cycle,
                    cyclic_residual: cyclic,
                    mass_imbalance,
                    forces,
                    losses,
                });
            }
        }

        warn!(
            cyclic = last.0,
            mass_imbalance = last.1,
            dt_lump = last.2,
            "outer loop hit the cycle limit"
        );
        Err(SimError::NonConvergence {
            what: "cyclic steady state",
            iterations: opts.max_cycles,
            residual: last.0.max(last.1),
        })
    }
}
