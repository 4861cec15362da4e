//! Per-chamber mass and energy balances.
//!
//! The state vector holds `[m_0 … m_n−1, U_0 … U_n−1]` for the existing
//! chambers in row order, with `U` the total internal energy. Volume is not
//! integrated; it comes from each chamber's volume function.

use nalgebra::DVector;
use pd_core::units::kgpm3;
use pd_flow::FlowContext;
use pd_fluids::{FluidState, StateInput};

use crate::error::{SimError, SimResult};
use crate::flow_path::{Node, PathFlow};
use crate::heat_transfer::HeatTransferInput;
use crate::integrator::AngleModel;
use crate::sim::SimulationState;

/// Everything computed at one `(θ, y)`.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub theta: f64,
    pub rows: Vec<usize>,
    pub states: Vec<FluidState>,
    /// `(V, dV/dθ)` per existing chamber
    pub volumes: Vec<(f64, f64)>,
    /// Heat into the gas per existing chamber [W]
    pub q_w: Vec<f64>,
    pub flows: Vec<PathFlow>,
    pub dy: DVector<f64>,
}

/// Borrowing view that evaluates derivatives for a fixed existing set.
pub struct DerivativeEvaluator<'a> {
    sim: &'a SimulationState,
    rows: Vec<usize>,
    discharge_pending: bool,
}

impl<'a> DerivativeEvaluator<'a> {
    pub fn new(sim: &'a SimulationState, discharge_pending: bool) -> SimResult<Self> {
        Ok(Self {
            sim,
            rows: sim.cvs.exists_indices()?.to_vec(),
            discharge_pending,
        })
    }

    pub fn evaluate(&self, theta: f64, y: &DVector<f64>) -> SimResult<Evaluation> {
        let sim = self.sim;
        let n = self.rows.len();
        if y.len() != 2 * n {
            return Err(SimError::invariant(format!(
                "state vector has {} entries for {n} existing chambers",
                y.len()
            )));
        }

        let mut position = vec![None; sim.cvs.len()];
        let mut states = Vec::with_capacity(n);
        let mut volumes = Vec::with_capacity(n);
        for (j, &row) in self.rows.iter().enumerate() {
            let cv = sim
                .cvs
                .get(row)
                .ok_or_else(|| SimError::invariant(format!("no control volume at row {row}")))?;
            let (v, dv) = cv.volume(theta);
            let (m, u_total) = (y[j], y[n + j]);
            if !(m > 0.0 && v > 0.0) {
                return Err(SimError::Backend {
                    message: format!(
                        "chamber '{}' has non-positive mass or volume at theta={theta} (m={m}, V={v})",
                        cv.key()
                    ),
                });
            }
            let state = sim.fluid.state(
                StateInput::DU {
                    rho: kgpm3(m / v),
                    u: u_total / m,
                },
                cv.state().species(),
            )?;
            position[row] = Some(j);
            states.push(state);
            volumes.push((v, dv));
        }

        let ctx = FlowContext {
            theta,
            discharge_pending: self.discharge_pending,
        };
        let flows = sim.flows.evaluate_all(&ctx, |node| match node {
            Node::Cv(row) => position[row].map(|j| &states[j]),
            Node::Tube(t, end) => sim.tubes.node_state(t, end),
        })?;

        let mut mdot_net = vec![0.0; n];
        let mut energy_net = vec![0.0; n];
        for (path, flow) in sim.flows.iter().zip(&flows) {
            let Some((n1, n2)) = path.ends() else {
                continue;
            };
            if let Node::Cv(row) = n1
                && let Some(j) = position[row]
            {
                mdot_net[j] -= flow.mdot;
                energy_net[j] -= flow.mdot * flow.h_up;
            }
            if let Node::Cv(row) = n2
                && let Some(j) = position[row]
            {
                mdot_net[j] += flow.mdot;
                energy_net[j] += flow.mdot * flow.h_up;
            }
        }

        let omega = sim.omega;
        let mut q_w = Vec::with_capacity(n);
        let mut dy = DVector::zeros(2 * n);
        for (j, &row) in self.rows.iter().enumerate() {
            let Some(cv) = sim.cvs.get(row) else {
                continue;
            };
            let (v, dv) = volumes[j];
            let q = sim.heat.heat_rate(&HeatTransferInput {
                key: cv.key(),
                shape: cv.shape(),
                theta,
                state: &states[j],
                volume_m3: v,
                span: cv.involute_angles(theta),
                t_wall_k: sim.t_wall_k,
            });
            dy[j] = mdot_net[j] / omega;
            dy[n + j] = (energy_net[j] + q) / omega - states[j].p_pa() * dv;
            q_w.push(q);
        }

        Ok(Evaluation {
            theta,
            rows: self.rows.clone(),
            states,
            volumes,
            q_w,
            flows,
            dy,
        })
    }
}

impl AngleModel for DerivativeEvaluator<'_> {
    fn rhs(&mut self, theta: f64, y: &DVector<f64>) -> SimResult<DVector<f64>> {
        Ok(self.evaluate(theta, y)?.dy)
    }
}
