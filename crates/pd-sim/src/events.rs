//! Discharge and merge events.
//!
//! The machine is consulted before every trial step. It may shrink the
//! step, rewire which chambers exist, and mark the step disabled (committed,
//! but ignored by step-size adaptation).

use pd_core::numeric::angle_difference;
use pd_core::units::{k, kgpm3};
use pd_fluids::StateInput;
use pd_solver::{RootConfig, bracket_and_solve};
use tracing::{debug, warn};

use crate::error::{SimError, SimResult};
use crate::sim::SimulationState;

/// Gap left before the discharge angle by the truncated approach step [rad].
pub const APPROACH_GAP: f64 = 1e-10;
/// Forced step taken right after the discharge transition [rad].
pub const POST_DISCHARGE_STEP: f64 = 2.2e-10;
/// Allowed change of total internal energy across a merge [J].
pub const MERGE_ENERGY_TOL: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DischargePhase {
    #[default]
    Normal,
    /// The last committed step was truncated to land just short of θ_d.
    ApproachingDischarge,
    /// Chambers were handed to their discharge successors; past θ_d by the
    /// forced step.
    AtDischargeTransition,
    /// Waiting for the merge predicate.
    PostDischargePreMerge,
}

/// Instantaneous mixing of several discharge-side chambers into one.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRule {
    /// Chamber whose existence arms the predicate.
    pub pre_merge: String,
    pub sources: Vec<String>,
    pub target: String,
    pub eps_tight: f64,
    pub eps_loose: f64,
    /// Angle past θ_d after which `eps_loose` applies [rad]
    pub angle_gate: f64,
}

impl MergeRule {
    pub fn new(
        pre_merge: impl Into<String>,
        sources: impl IntoIterator<Item = impl Into<String>>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            pre_merge: pre_merge.into(),
            sources: sources.into_iter().map(Into::into).collect(),
            target: target.into(),
            eps_tight: 1e-5,
            eps_loose: 2e-3,
            angle_gate: 1.2,
        }
    }

    /// `|p_min/p_max − 1| < eps_tight`, or `< eps_loose` once θ is more than
    /// `angle_gate` past θ_d.
    pub fn is_due(&self, pressures: &[f64], theta: f64, theta_d: f64) -> bool {
        let p_max = pressures.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let p_min = pressures.iter().copied().fold(f64::INFINITY, f64::min);
        if !(p_max.is_finite() && p_min.is_finite()) || p_max <= 0.0 {
            return false;
        }
        let spread = (p_min / p_max - 1.0).abs();
        spread < self.eps_tight
            || (angle_difference(theta, theta_d) > self.angle_gate && spread < self.eps_loose)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventConfig {
    pub theta_d: f64,
    pub merge: Option<MergeRule>,
    /// Liquid-flooded operation; merging such chambers is not implemented.
    pub flooded: bool,
}

/// What the loop should do with the next trial step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPlan {
    pub h: f64,
    /// Committed but excluded from step-size adaptation.
    pub disabled: bool,
    /// Accepted without error control.
    pub forced: bool,
    /// The existing set changed; the state vector must be rebuilt.
    pub topology_changed: bool,
}

impl StepPlan {
    fn normal(h: f64) -> Self {
        Self {
            h,
            disabled: false,
            forced: false,
            topology_changed: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventMachine {
    phase: DischargePhase,
    config: EventConfig,
}

impl EventMachine {
    pub fn new(config: EventConfig) -> Self {
        Self {
            phase: DischargePhase::Normal,
            config,
        }
    }

    pub fn phase(&self) -> DischargePhase {
        self.phase
    }

    /// Paths gated on the discharge transition stay closed while true.
    pub fn discharge_pending(&self) -> bool {
        matches!(
            self.phase,
            DischargePhase::ApproachingDischarge | DischargePhase::AtDischargeTransition
        )
    }

    /// Undo the approach truncation after its step failed error control.
    pub fn reject(&mut self) {
        if self.phase == DischargePhase::ApproachingDischarge {
            self.phase = DischargePhase::Normal;
        }
    }

    pub fn plan(&mut self, sim: &mut SimulationState, theta: f64, h: f64) -> SimResult<StepPlan> {
        let theta_d = self.config.theta_d;
        match self.phase {
            DischargePhase::Normal if theta < theta_d && theta + h >= theta_d => {
                self.phase = DischargePhase::ApproachingDischarge;
                debug!(theta, theta_d, "truncating step onto discharge angle");
                Ok(StepPlan {
                    h: (theta_d - theta - APPROACH_GAP).max(0.0),
                    disabled: true,
                    forced: false,
                    topology_changed: false,
                })
            }
            DischargePhase::ApproachingDischarge => {
                let moved = discharge_transition(sim)?;
                debug!(theta, moved, "discharge transition");
                self.phase = DischargePhase::AtDischargeTransition;
                Ok(StepPlan {
                    h: POST_DISCHARGE_STEP,
                    disabled: true,
                    forced: true,
                    topology_changed: true,
                })
            }
            DischargePhase::Normal
            | DischargePhase::AtDischargeTransition
            | DischargePhase::PostDischargePreMerge => {
                if self.try_merge(sim, theta)? {
                    self.phase = DischargePhase::Normal;
                    return Ok(StepPlan {
                        h,
                        disabled: true,
                        forced: false,
                        topology_changed: true,
                    });
                }
                if self.phase == DischargePhase::AtDischargeTransition && theta > theta_d {
                    self.phase = if self.config.merge.is_some() {
                        DischargePhase::PostDischargePreMerge
                    } else {
                        DischargePhase::Normal
                    };
                }
                Ok(StepPlan::normal(h))
            }
        }
    }

    /// Merge at the end of the cycle if the pre-merge chamber still exists,
    /// so the merged chamber can seed the next cycle. Returns whether it
    /// merged.
    pub fn force_pending_merge(
        &mut self,
        sim: &mut SimulationState,
        theta: f64,
    ) -> SimResult<bool> {
        let Some(rule) = &self.config.merge else {
            return Ok(false);
        };
        let Some(pre) = sim.cvs.index_of(&rule.pre_merge) else {
            return Ok(false);
        };
        if !sim.cvs.get(pre).is_some_and(|cv| cv.exists()) {
            return Ok(false);
        }
        warn!(theta, "merge criterion not met within the cycle; merging at its end");
        merge_chambers(sim, rule, theta, self.config.flooded)?;
        self.phase = DischargePhase::Normal;
        Ok(true)
    }

    fn try_merge(&self, sim: &mut SimulationState, theta: f64) -> SimResult<bool> {
        let Some(rule) = &self.config.merge else {
            return Ok(false);
        };
        let Some(pre) = sim.cvs.index_of(&rule.pre_merge) else {
            return Ok(false);
        };
        if !sim.cvs.get(pre).is_some_and(|cv| cv.exists()) {
            return Ok(false);
        }
        let pressures: Vec<f64> = rule
            .sources
            .iter()
            .filter_map(|key| sim.cvs.index_of(key))
            .filter_map(|row| sim.cvs.get(row))
            .filter(|cv| cv.exists())
            .map(|cv| cv.state().p_pa())
            .collect();
        if !rule.is_due(&pressures, theta, self.config.theta_d) {
            return Ok(false);
        }
        if rule.eps_tight <= pressure_spread(&pressures) {
            warn!(theta, "merging on the relaxed pressure criterion");
        }
        merge_chambers(sim, rule, theta, self.config.flooded)?;
        Ok(true)
    }
}

fn pressure_spread(pressures: &[f64]) -> f64 {
    let p_max = pressures.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let p_min = pressures.iter().copied().fold(f64::INFINITY, f64::min);
    (p_min / p_max - 1.0).abs()
}

/// Hand every existing chamber with a discharge successor over to it,
/// copying temperature and density. Returns the number of hand-overs.
pub fn discharge_transition(sim: &mut SimulationState) -> SimResult<usize> {
    let mut transfers = Vec::new();
    for &row in sim.cvs.exists_indices()? {
        let Some(cv) = sim.cvs.get(row) else {
            continue;
        };
        if let Some(next) = cv.discharge_successor() {
            let target = sim.cvs.index_of(next).ok_or_else(|| {
                SimError::invariant(format!(
                    "'{}' exists at discharge but its successor '{next}' is not registered",
                    cv.key()
                ))
            })?;
            transfers.push((row, target));
        }
    }

    for &(src, dst) in &transfers {
        let (state, species) = match sim.cvs.get(src) {
            Some(cv) => (*cv.state(), cv.state().species()),
            None => continue,
        };
        let copied = sim.fluid.state(
            StateInput::DT {
                rho: state.density(),
                t: state.temperature(),
            },
            species,
        )?;
        sim.cvs.set_state(dst, copied)?;
    }
    for &(src, _) in &transfers {
        sim.cvs.set_exists(src, false)?;
    }
    for &(_, dst) in &transfers {
        sim.cvs.set_exists(dst, true)?;
    }
    sim.cvs.update_existence();
    Ok(transfers.len())
}

/// Mix `rule.sources` into `rule.target`, conserving mass and internal
/// energy.
pub fn merge_chambers(
    sim: &mut SimulationState,
    rule: &MergeRule,
    theta: f64,
    flooded: bool,
) -> SimResult<()> {
    if flooded {
        return Err(SimError::Unsupported {
            what: "merging liquid-flooded chambers",
        });
    }
    let target = sim.cvs.require(&rule.target)?;

    let mut rows = Vec::with_capacity(rule.sources.len());
    let (mut m_total, mut u_total, mut v_total) = (0.0, 0.0, 0.0);
    let (mut t_lo, mut t_hi, mut mt_sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
    let mut species = None;
    for key in &rule.sources {
        let row = sim.cvs.require(key)?;
        let cv = sim
            .cvs
            .get(row)
            .ok_or_else(|| SimError::invariant(format!("no control volume at row {row}")))?;
        if !cv.exists() {
            return Err(SimError::invariant(format!(
                "merge source '{key}' does not exist at theta={theta}"
            )));
        }
        let (v, _) = cv.volume(theta);
        let st = cv.state();
        let m = st.rho_kg_m3() * v;
        m_total += m;
        u_total += st.u() * m;
        v_total += v;
        mt_sum += m * st.t_k();
        t_lo = t_lo.min(st.t_k());
        t_hi = t_hi.max(st.t_k());
        species.get_or_insert(st.species());
        rows.push(row);
    }
    let Some(species) = species else {
        return Err(SimError::config("merge rule has no source chambers"));
    };
    if !(m_total > 0.0 && v_total > 0.0) {
        return Err(SimError::invariant("merged chambers hold no mass"));
    }

    let rho = m_total / v_total;
    let u_target = u_total / m_total;
    let fluid = sim.fluid.clone();
    let root = bracket_and_solve::<_, SimError>(
        "merged chamber temperature",
        |t| {
            let st = fluid.state(StateInput::DT { rho: kgpm3(rho), t: k(t) }, species)?;
            Ok(st.u() - u_target)
        },
        mt_sum / m_total,
        0.5 * (t_hi - t_lo) + 1.0,
        16,
        &RootConfig {
            max_iterations: 100,
            f_tol: 0.1 * MERGE_ENERGY_TOL / m_total,
            x_tol: 1e-12,
        },
    )?;
    let mixed = sim.fluid.state(
        StateInput::DT {
            rho: kgpm3(rho),
            t: k(root.x),
        },
        species,
    )?;
    let energy_error = mixed.u() * m_total - u_total;
    if energy_error.abs() >= MERGE_ENERGY_TOL {
        return Err(SimError::invariant(format!(
            "merge changed internal energy by {energy_error:e} J"
        )));
    }

    for row in rows {
        sim.cvs.set_exists(row, false)?;
    }
    sim.cvs.set_state(target, mixed)?;
    sim.cvs.set_exists(target, true)?;
    sim.cvs.update_existence();
    debug!(theta, t_k = root.x, m_kg = m_total, "merged discharge chambers");
    Ok(())
}
