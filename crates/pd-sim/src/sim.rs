//! Cycle runner: owns the chamber network and advances it from θ = 0 to 2π.

use std::f64::consts::TAU;
use std::sync::Arc;

use nalgebra::DVector;
use pd_core::units::constants::T_REF_K;
use pd_fluids::{FluidModel, FluidState};
use tracing::{debug, info};

use crate::control_volume::CvRegistry;
use crate::derivs::{DerivativeEvaluator, Evaluation};
use crate::error::{SimError, SimResult};
use crate::events::{EventConfig, EventMachine};
use crate::flow_path::FlowRegistry;
use crate::heat_transfer::{Adiabatic, HeatTransferModel};
use crate::history::{CvSample, History};
use crate::integrator::{Integrator, IntegratorKind, IntegratorOptions, Rk4, Rkf45};
use crate::tubes::TubeNetwork;

/// Angles closer than this to the end of the cycle count as reaching it.
const END_EPS: f64 = 1e-12;

/// Counters from one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub steps: usize,
    pub rejected: usize,
    pub events: usize,
}

/// Everything one simulated machine owns. Independent runs share nothing
/// but the fluid model.
pub struct SimulationState {
    pub fluid: Arc<dyn FluidModel>,
    pub cvs: CvRegistry,
    pub flows: FlowRegistry,
    pub tubes: TubeNetwork,
    pub heat: Box<dyn HeatTransferModel>,
    /// Last completed cycle
    pub history: History,
    /// Shaft speed [rad/s]
    pub omega: f64,
    /// Wall temperature seen by the chambers and tubes [K]
    pub t_wall_k: f64,
    pub events: EventConfig,
    pub integrator: IntegratorOptions,
    /// Loop iterations allowed per cycle, accepted or not
    pub max_steps_per_cycle: usize,
    start_states: Vec<Option<FluidState>>,
}

impl SimulationState {
    pub fn new(fluid: Arc<dyn FluidModel>, omega: f64, events: EventConfig) -> Self {
        Self {
            fluid,
            cvs: CvRegistry::new(),
            flows: FlowRegistry::new(),
            tubes: TubeNetwork::new(),
            heat: Box::new(Adiabatic),
            history: History::default(),
            omega,
            t_wall_k: T_REF_K,
            events,
            integrator: IntegratorOptions::default(),
            max_steps_per_cycle: 200_000,
            start_states: Vec::new(),
        }
    }

    pub fn with_heat_transfer(mut self, model: impl HeatTransferModel + 'static) -> Self {
        self.heat = Box::new(model);
        self
    }

    pub fn with_integrator(mut self, options: IntegratorOptions) -> Self {
        self.integrator = options;
        self
    }

    /// Check the assembled network and bind flow-path ends. Must run once
    /// after the last `add` and before the first cycle.
    pub fn validate(&mut self) -> SimResult<()> {
        if !(self.omega.is_finite() && self.omega > 0.0) {
            return Err(SimError::config("shaft speed must be positive"));
        }
        let theta_d = self.events.theta_d;
        if !(theta_d > 0.0 && theta_d < TAU) {
            return Err(SimError::config(format!(
                "discharge angle {theta_d} outside (0, 2π)"
            )));
        }
        if self.max_steps_per_cycle == 0 {
            return Err(SimError::config("max_steps_per_cycle must be positive"));
        }
        self.integrator.validate()?;
        self.cvs.validate_successions()?;
        if let Some(rule) = &self.events.merge {
            self.cvs.require(&rule.pre_merge)?;
            self.cvs.require(&rule.target)?;
            if rule.sources.is_empty() {
                return Err(SimError::config("merge rule has no source chambers"));
            }
            for key in &rule.sources {
                self.cvs.require(key)?;
            }
        }
        self.flows.resolve(&self.cvs, &self.tubes)?;
        self.history = History::new(self.cvs.len(), self.flows.len());
        Ok(())
    }

    /// `[m…, U…]` for the existing chambers from their stored states.
    pub fn pack(&self, theta: f64) -> SimResult<DVector<f64>> {
        let rows = self.cvs.exists_indices()?;
        let n = rows.len();
        let mut y = DVector::zeros(2 * n);
        for (j, &row) in rows.iter().enumerate() {
            let cv = self
                .cvs
                .get(row)
                .ok_or_else(|| SimError::invariant(format!("no control volume at row {row}")))?;
            let (v, _) = cv.volume(theta);
            let m = cv.state().rho_kg_m3() * v;
            y[j] = m;
            y[n + j] = cv.state().u() * m;
        }
        Ok(y)
    }

    fn evaluate(&self, theta: f64, y: &DVector<f64>, pending: bool) -> SimResult<Evaluation> {
        DerivativeEvaluator::new(self, pending)?.evaluate(theta, y)
    }

    /// Write `eval` into history column `col` and the chamber states.
    ///
    /// Only rows in `eval` are written. Re-committing a column after a
    /// topology change keeps the samples of chambers that just ceased to
    /// exist.
    fn commit(&mut self, col: usize, eval: &Evaluation) -> SimResult<()> {
        for (j, &row) in eval.rows.iter().enumerate() {
            let st = eval.states[j];
            let (v, dv) = eval.volumes[j];
            self.history.record_cv(
                row,
                col,
                CvSample {
                    p_pa: st.p_pa(),
                    t_k: st.t_k(),
                    rho_kg_m3: st.rho_kg_m3(),
                    m_kg: st.rho_kg_m3() * v,
                    v_m3: v,
                    dv_m3_per_rad: dv,
                    q_w: eval.q_w[j],
                },
            );
            self.cvs.set_state(row, st)?;
        }
        for (i, flow) in eval.flows.iter().enumerate() {
            self.history.record_path(i, col, flow.mdot, flow.h_up);
        }
        Ok(())
    }

    /// Integrate one revolution, replacing `history`.
    pub fn run_cycle(&mut self) -> SimResult<CycleStats> {
        let opts = self.integrator;
        match opts.kind {
            IntegratorKind::Rkf45 => self.run_with(&Rkf45 {
                abs_tol: opts.abs_tol,
                rel_tol: opts.rel_tol,
                h_min: opts.h_min,
                h_max: opts.h_max,
            }),
            IntegratorKind::Rk4 => self.run_with(&Rk4 { h: opts.h_init }),
        }
    }

    fn run_with<I: Integrator>(&mut self, integ: &I) -> SimResult<CycleStats> {
        self.cvs.reset_existence();
        self.start_states = self
            .cvs
            .iter()
            .map(|cv| cv.initially_exists().then(|| *cv.state()))
            .collect();
        self.history = History::new(self.cvs.len(), self.flows.len());
        let mut machine = EventMachine::new(self.events.clone());
        let mut stats = CycleStats::default();

        let mut theta = 0.0;
        let mut y = self.pack(theta)?;
        let first = self.evaluate(theta, &y, machine.discharge_pending())?;
        let col = self.history.push_column(theta);
        self.commit(col, &first)?;

        let mut h = self.integrator.h_init;
        let mut iterations = 0;
        while theta < TAU - END_EPS {
            iterations += 1;
            if iterations > self.max_steps_per_cycle {
                return Err(SimError::NonConvergence {
                    what: "cycle integration step budget",
                    iterations: self.max_steps_per_cycle,
                    residual: TAU - theta,
                });
            }

            let h_try = h.min(TAU - theta);
            let plan = machine.plan(self, theta, h_try)?;
            if plan.topology_changed {
                stats.events += 1;
                y = self.pack(theta)?;
                let eval = self.evaluate(theta, &y, machine.discharge_pending())?;
                let col = self.history.last_column()?;
                self.commit(col, &eval)?;
            }
            if plan.h <= 0.0 {
                continue;
            }

            let attempt = {
                let mut model = DerivativeEvaluator::new(self, machine.discharge_pending())?;
                integ.attempt(&mut model, theta, &y, plan.h)?
            };
            if !plan.forced && attempt.error_norm > 1.0 && plan.h > integ.min_step() {
                machine.reject();
                stats.rejected += 1;
                h = integ.next_step(plan.h, attempt.error_norm);
                continue;
            }

            theta += plan.h;
            y = attempt.y;
            let eval = self.evaluate(theta, &y, machine.discharge_pending())?;
            let col = self.history.push_column(theta);
            self.commit(col, &eval)?;
            stats.steps += 1;
            if !plan.disabled {
                h = integ.next_step(plan.h, attempt.error_norm);
            }
        }
        if machine.force_pending_merge(self, theta)? {
            stats.events += 1;
            y = self.pack(theta)?;
            let eval = self.evaluate(theta, &y, machine.discharge_pending())?;
            let col = self.history.last_column()?;
            self.commit(col, &eval)?;
        }
        info!(
            steps = stats.steps,
            rejected = stats.rejected,
            events = stats.events,
            "cycle integrated"
        );
        Ok(stats)
    }

    /// Seed the next cycle's starting states from this cycle's end states
    /// through each chamber's `becomes` successors.
    ///
    /// Returns the largest relative change in temperature or pressure of any
    /// seeded chamber.
    pub fn reseed(&mut self) -> SimResult<f64> {
        let mut seeds = Vec::new();
        for cv in self.cvs.iter().filter(|cv| cv.exists()) {
            for next in cv.successor().keys() {
                seeds.push((self.cvs.require(next)?, *cv.state()));
            }
        }

        let mut seeded = vec![false; self.cvs.len()];
        let mut residual: f64 = 0.0;
        for (row, state) in seeds {
            if let Some(Some(prev)) = self.start_states.get(row) {
                let dt = (state.t_k() - prev.t_k()).abs() / prev.t_k();
                let dp = (state.p_pa() - prev.p_pa()).abs() / prev.p_pa();
                residual = residual.max(dt).max(dp);
            }
            self.cvs.set_state(row, state)?;
            seeded[row] = true;
        }
        for (row, start) in self.start_states.iter().enumerate() {
            if let (Some(state), false) = (start, seeded[row]) {
                self.cvs.set_state(row, *state)?;
            }
        }
        debug!(residual, "reseeded chambers for next cycle");
        Ok(residual)
    }
}
