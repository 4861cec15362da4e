//! Result data types.

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub project_name: String,
    pub timestamp: String,
    pub engine_version: String,
    pub outputs: RunOutputs,
}

impl RunManifest {
    /// Manifest stamped with the current UTC time.
    pub fn new(
        run_id: impl Into<RunId>,
        project_name: impl Into<String>,
        engine_version: impl Into<String>,
        outputs: RunOutputs,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            project_name: project_name.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            engine_version: engine_version.into(),
            outputs,
        }
    }
}

/// Primary scalar outputs of a converged run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RunOutputs {
    pub eta_oi: f64,
    pub mdot_kg_s: f64,
    pub wdot_pv_w: f64,
    pub wdot_mech_w: f64,
    pub wdot_el_w: f64,
    pub motor_losses_w: f64,
    pub volumetric_efficiency: f64,
    pub t_lump_k: f64,
    pub q_ambient_w: f64,
    pub omega_rad_s: f64,
    pub cycles: usize,
}

impl RunOutputs {
    /// `(name, value)` in display order.
    pub fn pairs(&self) -> [(&'static str, f64); 11] {
        [
            ("eta_oi", self.eta_oi),
            ("mdot_kg_s", self.mdot_kg_s),
            ("wdot_pv_w", self.wdot_pv_w),
            ("wdot_mech_w", self.wdot_mech_w),
            ("wdot_el_w", self.wdot_el_w),
            ("motor_losses_w", self.motor_losses_w),
            ("volumetric_efficiency", self.volumetric_efficiency),
            ("t_lump_k", self.t_lump_k),
            ("q_ambient_w", self.q_ambient_w),
            ("omega_rad_s", self.omega_rad_s),
            ("cycles", self.cycles as f64),
        ]
    }
}
