//! Project validation logic.

use std::f64::consts::TAU;

use crate::schema::{
    FluidBackendDef, JournalDef, LATEST_VERSION, LeakageDef, MechDef, MotorDef, PortsDef, Project,
    SolverDef, TubeDef,
};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }
    if project.fluid.species.trim().is_empty() {
        return Err(invalid("fluid species", "", "must name a species"));
    }
    if project.flooded && project.fluid.backend == FluidBackendDef::IdealGas {
        return Err(ValidationError::Unsupported {
            feature: "flooded operation".to_string(),
            reason: "the ideal-gas backend has no liquid phase".to_string(),
        });
    }

    let g = &project.geometry;
    positive("geometry.displacement_m3", g.displacement_m3)?;
    positive("geometry.wrap_height_m", g.wrap_height_m)?;
    positive("geometry.orbiting_radius_m", g.orbiting_radius_m)?;
    positive("geometry.phi_ie_rad", g.phi_ie_rad)?;
    positive("geometry.discharge_dead_volume_m3", g.discharge_dead_volume_m3)?;
    positive("geometry.plenum_volume_m3", g.plenum_volume_m3)?;
    positive("geometry.suction_clearance_m3", g.suction_clearance_m3)?;
    non_negative("geometry.wrap_thickness_m", g.wrap_thickness_m)?;
    if !(g.volume_ratio.is_finite() && g.volume_ratio > 1.0) {
        return Err(invalid(
            "geometry.volume_ratio",
            g.volume_ratio,
            "must be greater than 1",
        ));
    }
    if !(g.discharge_angle_rad > 0.0 && g.discharge_angle_rad < TAU) {
        return Err(invalid(
            "geometry.discharge_angle_rad",
            g.discharge_angle_rad,
            "must lie in (0, 2π)",
        ));
    }
    if g.compression_pairs == 0 {
        return Err(invalid(
            "geometry.compression_pairs",
            g.compression_pairs,
            "must be at least 1",
        ));
    }

    positive("inlet.pressure_pa", project.inlet.pressure_pa)?;
    positive("inlet.temperature_k", project.inlet.temperature_k)?;
    positive("outlet.pressure_pa", project.outlet.pressure_pa)?;
    if project.outlet.pressure_pa <= project.inlet.pressure_pa {
        return Err(invalid(
            "outlet.pressure_pa",
            project.outlet.pressure_pa,
            "must exceed the inlet pressure",
        ));
    }
    positive("omega_rad_s", project.omega_rad_s)?;

    validate_ports(&project.ports)?;
    validate_leakage(&project.leakage)?;
    validate_tube("tubes.inlet", &project.tubes.inlet)?;
    validate_tube("tubes.outlet", &project.tubes.outlet)?;
    validate_mech(&project.mech)?;
    validate_solver(&project.solver)?;

    let m = &project.merge;
    positive("merge.eps_tight", m.eps_tight)?;
    if !(m.eps_loose.is_finite() && m.eps_loose >= m.eps_tight) {
        return Err(invalid(
            "merge.eps_loose",
            m.eps_loose,
            "must be at least eps_tight",
        ));
    }
    non_negative("merge.angle_gate_rad", m.angle_gate_rad)?;
    Ok(())
}

fn validate_ports(ports: &PortsDef) -> Result<(), ValidationError> {
    if !(ports.cd > 0.0 && ports.cd <= 1.0) {
        return Err(invalid("ports.cd", ports.cd, "must be in (0, 1]"));
    }
    positive("ports.inlet_area_m2", ports.inlet_area_m2)?;
    positive("ports.suction_area_m2", ports.suction_area_m2)?;
    positive("ports.discharge_area_m2", ports.discharge_area_m2)?;
    positive("ports.outlet_area_m2", ports.outlet_area_m2)
}

fn validate_leakage(leakage: &LeakageDef) -> Result<(), ValidationError> {
    non_negative("leakage.flank_gap_m", leakage.flank_gap_m)?;
    non_negative("leakage.radial_gap_m", leakage.radial_gap_m)
}

fn validate_tube(prefix: &str, tube: &TubeDef) -> Result<(), ValidationError> {
    positive(&format!("{prefix}.length_m"), tube.length_m)?;
    positive(&format!("{prefix}.diameter_m"), tube.diameter_m)?;
    non_negative(&format!("{prefix}.wall_alpha_w_per_m2k"), tube.wall_alpha_w_per_m2k)
}

fn validate_journal(prefix: &str, j: &JournalDef) -> Result<(), ValidationError> {
    positive(&format!("{prefix}.diameter_m"), j.diameter_m)?;
    positive(&format!("{prefix}.length_m"), j.length_m)?;
    positive(&format!("{prefix}.clearance_m"), j.clearance_m)
}

fn validate_mech(mech: &MechDef) -> Result<(), ValidationError> {
    validate_journal("mech.upper_bearing", &mech.upper_bearing)?;
    validate_journal("mech.lower_bearing", &mech.lower_bearing)?;
    validate_journal("mech.crank_bearing", &mech.crank_bearing)?;
    non_negative("mech.thrust_friction_coefficient", mech.thrust_friction_coefficient)?;
    non_negative("mech.thrust_inner_diameter_m", mech.thrust_inner_diameter_m)?;
    positive("mech.mu_oil_pa_s", mech.mu_oil_pa_s)?;
    positive("mech.l_ratio_bearings", mech.l_ratio_bearings)?;
    non_negative("mech.journal_tune_factor", mech.journal_tune_factor)?;
    non_negative("mech.orbiting_mass_kg", mech.orbiting_mass_kg)?;
    non_negative("mech.h_shell_w_per_m2k", mech.h_shell_w_per_m2k)?;
    non_negative("mech.a_shell_m2", mech.a_shell_m2)?;
    positive("mech.t_amb_k", mech.t_amb_k)?;
    if !matches!(
        mech.shell_pressure.to_ascii_lowercase().as_str(),
        "low" | "mid" | "high"
    ) {
        return Err(invalid(
            "mech.shell_pressure",
            &mech.shell_pressure,
            "must be 'low', 'mid' or 'high'",
        ));
    }
    if !(0.0..=1.0).contains(&mech.suction_fraction) {
        return Err(invalid(
            "mech.suction_fraction",
            mech.suction_fraction,
            "must be in [0, 1]",
        ));
    }
    match &mech.motor {
        MotorDef::ConstantEfficiency { efficiency } => {
            efficiency_in_range("mech.motor.efficiency", *efficiency)
        }
        MotorDef::Map {
            torque_nm,
            efficiency,
            speed_rad_s,
        } => {
            if torque_nm.len() < 2
                || torque_nm.len() != efficiency.len()
                || torque_nm.len() != speed_rad_s.len()
            {
                return Err(invalid(
                    "mech.motor",
                    torque_nm.len(),
                    "map needs at least two rows of equal length",
                ));
            }
            for e in efficiency {
                efficiency_in_range("mech.motor.efficiency", *e)?;
            }
            Ok(())
        }
    }
}

fn validate_solver(solver: &SolverDef) -> Result<(), ValidationError> {
    positive("solver.abs_tol", solver.abs_tol)?;
    non_negative("solver.rel_tol", solver.rel_tol)?;
    positive("solver.step_rad", solver.step_rad)?;
    if solver.max_cycles == 0 {
        return Err(invalid("solver.max_cycles", solver.max_cycles, "must be at least 1"));
    }
    positive("solver.cyclic_tol", solver.cyclic_tol)?;
    positive("solver.mass_tol", solver.mass_tol)?;
    positive("solver.lump_tol_w", solver.lump_tol_w)?;
    positive("solver.lump_dt_tol_k", solver.lump_dt_tol_k)?;
    if let Some(t) = solver.t_lump_init_k {
        positive("solver.t_lump_init_k", t)?;
    }
    Ok(())
}

fn efficiency_in_range(field: &str, eta: f64) -> Result<(), ValidationError> {
    if !(eta.is_finite() && eta > 0.0 && eta <= 1.0) {
        return Err(invalid(field, eta, "must be in (0, 1]"));
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, value, "must be positive and finite"));
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, value, "must be non-negative and finite"));
    }
    Ok(())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
