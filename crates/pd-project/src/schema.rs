//! Project schema definitions.

use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    pub fluid: FluidDef,
    pub geometry: GeometryDef,
    pub inlet: InletDef,
    pub outlet: OutletDef,
    /// Shaft speed [rad/s]
    pub omega_rad_s: f64,
    #[serde(default)]
    pub ports: PortsDef,
    #[serde(default)]
    pub leakage: LeakageDef,
    #[serde(default)]
    pub tubes: TubesDef,
    #[serde(default)]
    pub heat_transfer: HeatTransferDef,
    #[serde(default)]
    pub mech: MechDef,
    #[serde(default)]
    pub solver: SolverDef,
    #[serde(default)]
    pub merge: MergeDef,
    /// Liquid-flooded operation. No backend supports it yet.
    #[serde(default)]
    pub flooded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FluidDef {
    pub species: String,
    #[serde(default)]
    pub backend: FluidBackendDef,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FluidBackendDef {
    #[default]
    IdealGas,
    CoolProp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeometryDef {
    /// Displacement per revolution [m³]
    pub displacement_m3: f64,
    /// Built-in volume ratio
    pub volume_ratio: f64,
    pub wrap_height_m: f64,
    pub orbiting_radius_m: f64,
    /// Involute angle at the end of the inner wrap [rad]
    pub phi_ie_rad: f64,
    /// Crank angle at which the innermost pair opens to discharge [rad]
    pub discharge_angle_rad: f64,
    /// Volume of each suction pocket as it opens at θ = 0 [m³]
    #[serde(default = "default_suction_clearance")]
    pub suction_clearance_m3: f64,
    #[serde(default = "default_wrap_thickness")]
    pub wrap_thickness_m: f64,
    /// Volume of the central discharge region outside the pockets [m³]
    #[serde(default = "default_discharge_dead_volume")]
    pub discharge_dead_volume_m3: f64,
    #[serde(default = "default_compression_pairs")]
    pub compression_pairs: usize,
    /// Shell-side suction plenum volume [m³]
    #[serde(default = "default_plenum_volume")]
    pub plenum_volume_m3: f64,
}

fn default_suction_clearance() -> f64 {
    2.0e-6
}

fn default_wrap_thickness() -> f64 {
    0.004
}

fn default_discharge_dead_volume() -> f64 {
    2.0e-6
}

fn default_compression_pairs() -> usize {
    2
}

fn default_plenum_volume() -> f64 {
    5.0e-4
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct InletDef {
    pub pressure_pa: f64,
    pub temperature_k: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OutletDef {
    pub pressure_pa: f64,
}

/// Nozzle areas of the fixed flow paths.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PortsDef {
    #[serde(default = "default_cd")]
    pub cd: f64,
    /// Inlet tube to shell plenum [m²]
    pub inlet_area_m2: f64,
    /// Plenum to each open suction pocket [m²]
    pub suction_area_m2: f64,
    /// Discharge pockets to the centre region [m²]
    pub discharge_area_m2: f64,
    /// Centre region to the outlet tube [m²]
    pub outlet_area_m2: f64,
}

fn default_cd() -> f64 {
    0.8
}

impl Default for PortsDef {
    fn default() -> Self {
        Self {
            cd: default_cd(),
            inlet_area_m2: 5.0e-4,
            suction_area_m2: 3.0e-4,
            discharge_area_m2: 1.0e-4,
            outlet_area_m2: 2.0e-4,
        }
    }
}

/// Clearance gaps of the leakage paths. A zero gap drops that family of
/// paths from the model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LeakageDef {
    /// Gap along the wrap flanks between neighbouring pockets [m]
    #[serde(default = "default_leakage_gap")]
    pub flank_gap_m: f64,
    /// Gap between the wrap tips and the opposing base plate [m]
    #[serde(default = "default_leakage_gap")]
    pub radial_gap_m: f64,
}

fn default_leakage_gap() -> f64 {
    10.0e-6
}

impl Default for LeakageDef {
    fn default() -> Self {
        Self {
            flank_gap_m: default_leakage_gap(),
            radial_gap_m: default_leakage_gap(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TubeDef {
    pub length_m: f64,
    pub diameter_m: f64,
    /// Wall heat-transfer coefficient [W/(m²·K)]
    #[serde(default)]
    pub wall_alpha_w_per_m2k: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TubesDef {
    pub inlet: TubeDef,
    pub outlet: TubeDef,
}

impl Default for TubesDef {
    fn default() -> Self {
        let tube = TubeDef {
            length_m: 0.3,
            diameter_m: 0.02,
            wall_alpha_w_per_m2k: 0.0,
        };
        Self {
            inlet: tube,
            outlet: tube,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type")]
pub enum HeatTransferDef {
    #[default]
    Adiabatic,
    /// Convection between the chamber gas and the lump-temperature walls.
    WallConvection { h_w_per_m2k: f64 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct JournalDef {
    pub diameter_m: f64,
    pub length_m: f64,
    /// Radial clearance [m]
    pub clearance_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MotorDef {
    ConstantEfficiency {
        efficiency: f64,
    },
    Map {
        torque_nm: Vec<f64>,
        efficiency: Vec<f64>,
        speed_rad_s: Vec<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MechDef {
    pub upper_bearing: JournalDef,
    pub lower_bearing: JournalDef,
    pub crank_bearing: JournalDef,
    pub thrust_friction_coefficient: f64,
    pub thrust_inner_diameter_m: f64,
    /// Oil dynamic viscosity [Pa·s]
    pub mu_oil_pa_s: f64,
    pub l_ratio_bearings: f64,
    #[serde(default = "default_tune_factor")]
    pub journal_tune_factor: f64,
    pub orbiting_mass_kg: f64,
    /// `low`, `mid` or `high`
    pub shell_pressure: String,
    pub h_shell_w_per_m2k: f64,
    pub a_shell_m2: f64,
    pub t_amb_k: f64,
    pub motor: MotorDef,
    /// Share of motor losses heating the suction gas
    #[serde(default)]
    pub suction_fraction: f64,
}

fn default_tune_factor() -> f64 {
    1.0
}

impl Default for MechDef {
    fn default() -> Self {
        Self {
            upper_bearing: JournalDef {
                diameter_m: 0.04,
                length_m: 0.04,
                clearance_m: 20e-6,
            },
            lower_bearing: JournalDef {
                diameter_m: 0.025,
                length_m: 0.025,
                clearance_m: 20e-6,
            },
            crank_bearing: JournalDef {
                diameter_m: 0.04,
                length_m: 0.04,
                clearance_m: 20e-6,
            },
            thrust_friction_coefficient: 0.028,
            thrust_inner_diameter_m: 0.05,
            mu_oil_pa_s: 0.008,
            l_ratio_bearings: 3.0,
            journal_tune_factor: default_tune_factor(),
            orbiting_mass_kg: 2.5,
            shell_pressure: "low".to_string(),
            h_shell_w_per_m2k: 10.0,
            a_shell_m2: 0.45,
            t_amb_k: 298.0,
            motor: MotorDef::ConstantEfficiency { efficiency: 0.95 },
            suction_fraction: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorDef {
    #[default]
    Rkf45,
    Rk4,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverDef {
    #[serde(default)]
    pub integrator: IntegratorDef,
    pub abs_tol: f64,
    pub rel_tol: f64,
    /// First trial step, and the fixed step for RK4 [rad]
    pub step_rad: f64,
    pub max_cycles: usize,
    pub cyclic_tol: f64,
    pub mass_tol: f64,
    pub lump_tol_w: f64,
    pub lump_dt_tol_k: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_lump_init_k: Option<f64>,
}

impl Default for SolverDef {
    fn default() -> Self {
        Self {
            integrator: IntegratorDef::Rkf45,
            abs_tol: 1e-8,
            rel_tol: 1e-6,
            step_rad: 1e-3,
            max_cycles: 40,
            cyclic_tol: 1e-3,
            mass_tol: 1e-2,
            lump_tol_w: 1e-3,
            lump_dt_tol_k: 0.05,
            t_lump_init_k: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MergeDef {
    pub eps_tight: f64,
    pub eps_loose: f64,
    /// Angle past the discharge angle after which `eps_loose` applies [rad]
    pub angle_gate_rad: f64,
}

impl Default for MergeDef {
    fn default() -> Self {
        Self {
            eps_tight: 1e-5,
            eps_loose: 2e-3,
            angle_gate_rad: 1.2,
        }
    }
}
