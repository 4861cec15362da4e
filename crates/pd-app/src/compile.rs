//! Compilation of a project file into a runnable compressor model.

use std::str::FromStr;
use std::sync::Arc;

use pd_core::units::{k, kgpm3, pa};
use pd_flow::{ConstantArea, FlowContext, FlowFunction, Gated, IsentropicNozzle};
use pd_fluids::{FluidModel, FluidState, IdealGasModel, Species, StateInput};
use pd_project::schema::{
    FluidBackendDef, FluidDef, HeatTransferDef, IntegratorDef, JournalDef, LeakageDef, MechDef,
    MotorDef, Project, SolverDef,
};
use pd_sim::{
    CompressorModel, ControlVolume, EventConfig, FlowPath, IntegratorKind, IntegratorOptions,
    JournalBearing, MechanicalConfig, MergeRule, Motor, ShellPressure, SimulationState,
    SolveOptions, ThrustBearing, Tube, TubeEnd, WallConvection,
};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::ideal_scroll::{IdealScroll, Leak, Pocket, PocketKind, compression_key};

pub const INLET_TUBE: (&str, &str) = ("inlet.1", "inlet.2");
pub const OUTLET_TUBE: (&str, &str) = ("outlet.1", "outlet.2");

/// A model ready to solve, with the outer-loop options from the project.
pub struct CompiledModel {
    pub model: CompressorModel,
    pub options: SolveOptions,
}

/// Compile a validated project into a compressor model.
pub fn compile_model(project: &Project) -> AppResult<CompiledModel> {
    pd_project::validate_project(project)?;
    let species = parse_species(&project.fluid.species)?;
    let fluid = build_fluid_model(&project.fluid)?;
    let geo = IdealScroll::from_def(&project.geometry);

    let inlet = fluid.state(
        StateInput::PT {
            p: pa(project.inlet.pressure_pa),
            t: k(project.inlet.temperature_k),
        },
        species,
    )?;
    let discharge = fluid.state(
        StateInput::PS {
            p: pa(project.outlet.pressure_pa),
            s: inlet.s(),
        },
        species,
    )?;

    let merge = MergeRule {
        eps_tight: project.merge.eps_tight,
        eps_loose: project.merge.eps_loose,
        angle_gate: project.merge.angle_gate_rad,
        ..MergeRule::new("d1", ["d1", "d2", "dd"], "ddd")
    };
    let mut sim = SimulationState::new(
        fluid.clone(),
        project.omega_rad_s,
        EventConfig {
            theta_d: geo.theta_d,
            merge: Some(merge),
            flooded: project.flooded,
        },
    )
    .with_integrator(integrator_options(&project.solver));
    if let HeatTransferDef::WallConvection { h_w_per_m2k } = project.heat_transfer {
        sim = sim.with_heat_transfer(WallConvection {
            htc_w_per_m2k: h_w_per_m2k,
            wrap_height_m: geo.wrap_height_m,
            base_radius_m: geo.base_radius(),
            skip_plenum: true,
        });
    }

    let pairs = geo.compression_pairs;
    for (key, kind, shape) in geo.chambers() {
        let state = initial_state(fluid.as_ref(), &geo, kind, &inlet, &discharge)?;
        let mut cv = ControlVolume::new(key.as_str(), shape, Pocket { geo, kind }, state);
        cv = match kind {
            PocketKind::Plenum => cv.becomes_split(["sa", "s1", "s2"]),
            PocketKind::Suction => cv.becomes(compression_key(side_of(&key), 1)),
            PocketKind::Compression(n) if n < pairs => {
                cv.becomes(compression_key(side_of(&key), n + 1))
            }
            PocketKind::Compression(_) => cv.discharge_becomes(format!("d{}", side_of(&key))),
            PocketKind::Merged => cv.discharge_becomes("dd").becomes("ddd"),
            PocketKind::Discharge | PocketKind::Centre => cv.exists_at_start(false),
        };
        sim.cvs.add(cv)?;
    }

    let tubes = &project.tubes;
    let inlet_tube = sim.tubes.add(
        Tube::new(
            INLET_TUBE.0,
            INLET_TUBE.1,
            tubes.inlet.length_m,
            tubes.inlet.diameter_m,
            TubeEnd::One,
            inlet,
        )?
        .with_wall_coefficient(tubes.inlet.wall_alpha_w_per_m2k),
    )?;
    let outlet_tube = sim.tubes.add(
        Tube::new(
            OUTLET_TUBE.0,
            OUTLET_TUBE.1,
            tubes.outlet.length_m,
            tubes.outlet.diameter_m,
            TubeEnd::Two,
            discharge,
        )?
        .with_wall_coefficient(tubes.outlet.wall_alpha_w_per_m2k),
    )?;

    let ports = &project.ports;
    let nozzle = |name: &str, area: f64| IsentropicNozzle::new(name, ports.cd, ConstantArea(area));
    sim.flows.add(FlowPath::new(INLET_TUBE.1, "sa", nozzle("inlet", ports.inlet_area_m2)?));
    for pocket in ["s1", "s2"] {
        sim.flows.add(FlowPath::new("sa", pocket, nozzle("suction", ports.suction_area_m2)?));
    }
    for pocket in ["d1", "d2"] {
        sim.flows.add(FlowPath::new(
            pocket,
            "dd",
            Gated::after_discharge(nozzle("discharge", ports.discharge_area_m2)?),
        ));
    }
    for centre in ["dd", "ddd"] {
        sim.flows.add(FlowPath::new(centre, OUTLET_TUBE.0, nozzle("outlet", ports.outlet_area_m2)?));
    }
    for path in geo.leakage_paths() {
        let name = format!("{}-{}", path.key1, path.key2);
        if let Some(func) = leak_function(&geo, path.leak, &project.leakage, name)? {
            sim.flows.add(FlowPath::new(path.key1, path.key2, func));
        }
    }
    debug!(
        chambers = sim.cvs.len(),
        paths = sim.flows.len(),
        "compiled scroll model"
    );

    let mut model = CompressorModel {
        sim,
        geometry: Arc::new(geo),
        mech: mechanical_config(&project.mech)?,
        inlet_tube,
        outlet_tube,
        displacement_m3: geo.displacement_m3,
    };
    model.validate()?;
    Ok(CompiledModel {
        model,
        options: solve_options(&project.solver),
    })
}

/// Nozzle for one leakage path, or `None` when its gap is zero.
pub fn leak_function(
    geo: &IdealScroll,
    leak: Leak,
    def: &LeakageDef,
    name: String,
) -> AppResult<Option<Box<dyn FlowFunction>>> {
    let geo = *geo;
    let func: Box<dyn FlowFunction> = match leak {
        Leak::Flank if def.flank_gap_m > 0.0 => Box::new(IsentropicNozzle::new(
            name,
            1.0,
            ConstantArea(geo.flank_leak_area(def.flank_gap_m)),
        )?),
        Leak::Radial(kind) if def.radial_gap_m > 0.0 => {
            let gap = def.radial_gap_m;
            Box::new(IsentropicNozzle::new(name, 1.0, move |theta: f64| {
                geo.radial_leak_area(gap, kind, theta)
            })?)
        }
        Leak::CentreToSuction if def.flank_gap_m > 0.0 => Box::new(Gated::new(
            IsentropicNozzle::new(name, 1.0, ConstantArea(geo.flank_leak_area(def.flank_gap_m)))?,
            move |ctx: &FlowContext| geo.compression_pockets_alive(ctx.theta) == 0,
        )),
        _ => return Ok(None),
    };
    Ok(Some(func))
}

pub fn parse_species(name: &str) -> AppResult<Species> {
    Species::from_str(name).map_err(|e| AppError::Compile(format!("{e}: '{name}'")))
}

/// Select the fluid property backend.
pub fn build_fluid_model(def: &FluidDef) -> AppResult<Arc<dyn FluidModel>> {
    match def.backend {
        FluidBackendDef::IdealGas => Ok(Arc::new(IdealGasModel::new())),
        #[cfg(feature = "coolprop")]
        FluidBackendDef::CoolProp => Ok(Arc::new(pd_fluids::CoolPropModel::new())),
        #[cfg(not(feature = "coolprop"))]
        FluidBackendDef::CoolProp => Err(AppError::Unsupported {
            message: "CoolProp backend requires the 'coolprop' feature".to_string(),
        }),
    }
}

fn side_of(key: &str) -> usize {
    match key.as_bytes().get(1) {
        Some(b'2') => 2,
        _ => 1,
    }
}

/// Starting chamber state: suction side at the inlet state, compression
/// pockets compressed isentropically from closure, discharge side at the
/// isentropic discharge state.
fn initial_state(
    fluid: &dyn FluidModel,
    geo: &IdealScroll,
    kind: PocketKind,
    inlet: &FluidState,
    discharge: &FluidState,
) -> AppResult<FluidState> {
    match kind {
        PocketKind::Plenum | PocketKind::Suction => Ok(*inlet),
        PocketKind::Compression(_) => {
            let (v, _) = geo.volume(kind, 0.0);
            let ratio = geo.pocket_max() / v;
            let rho = inlet.rho_kg_m3() * ratio;
            let p = inlet.p_pa() * ratio.powf(inlet.gamma());
            Ok(fluid.state(
                StateInput::DP {
                    rho: kgpm3(rho),
                    p: pa(p),
                },
                inlet.species(),
            )?)
        }
        PocketKind::Discharge | PocketKind::Centre | PocketKind::Merged => Ok(*discharge),
    }
}

pub fn integrator_options(solver: &SolverDef) -> IntegratorOptions {
    IntegratorOptions {
        kind: match solver.integrator {
            IntegratorDef::Rkf45 => IntegratorKind::Rkf45,
            IntegratorDef::Rk4 => IntegratorKind::Rk4,
        },
        abs_tol: solver.abs_tol,
        rel_tol: solver.rel_tol,
        h_init: solver.step_rad,
        ..IntegratorOptions::default()
    }
}

pub fn solve_options(solver: &SolverDef) -> SolveOptions {
    SolveOptions {
        max_cycles: solver.max_cycles,
        cyclic_tol: solver.cyclic_tol,
        mass_tol: solver.mass_tol,
        lump_tol_w: solver.lump_tol_w,
        lump_dt_tol_k: solver.lump_dt_tol_k,
        t_lump_init_k: solver.t_lump_init_k,
    }
}

fn journal(def: &JournalDef) -> JournalBearing {
    JournalBearing {
        radius_m: 0.5 * def.diameter_m,
        length_m: def.length_m,
        clearance_m: def.clearance_m,
    }
}

pub fn mechanical_config(def: &MechDef) -> AppResult<MechanicalConfig> {
    let motor = match &def.motor {
        MotorDef::ConstantEfficiency { efficiency } => Motor::Constant {
            efficiency: *efficiency,
        },
        MotorDef::Map {
            torque_nm,
            efficiency,
            speed_rad_s,
        } => Motor::Map {
            torque_nm: torque_nm.clone(),
            efficiency: efficiency.clone(),
            speed_rad_s: speed_rad_s.clone(),
        },
    };
    Ok(MechanicalConfig {
        upper_bearing: journal(&def.upper_bearing),
        lower_bearing: journal(&def.lower_bearing),
        crank_bearing: journal(&def.crank_bearing),
        thrust_bearing: ThrustBearing {
            friction_coefficient: def.thrust_friction_coefficient,
            inner_diameter_m: def.thrust_inner_diameter_m,
        },
        mu_oil: def.mu_oil_pa_s,
        l_ratio_bearings: def.l_ratio_bearings,
        journal_tune_factor: def.journal_tune_factor,
        orbiting_mass_kg: def.orbiting_mass_kg,
        shell_pressure: ShellPressure::from_str(&def.shell_pressure)?,
        h_shell_w_per_m2k: def.h_shell_w_per_m2k,
        a_shell_m2: def.a_shell_m2,
        t_amb_k: def.t_amb_k,
        motor,
        suction_fraction: def.suction_fraction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_seed_is_above_suction_pressure() {
        let geo = IdealScroll {
            displacement_m3: 1e-4,
            volume_ratio: 2.2,
            wrap_height_m: 0.03,
            orbiting_radius_m: 0.005,
            phi_ie_rad: 20.0,
            theta_d: 3.5,
            suction_clearance_m3: 2e-6,
            wrap_thickness_m: 0.004,
            dead_volume_m3: 2e-6,
            compression_pairs: 2,
            plenum_volume_m3: 5e-4,
        };
        let fluid = IdealGasModel::new();
        let inlet = fluid
            .state(StateInput::PT { p: pa(1e5), t: k(300.0) }, Species::Air)
            .unwrap();
        let c1 = initial_state(&fluid, &geo, PocketKind::Compression(1), &inlet, &inlet).unwrap();
        let c2 = initial_state(&fluid, &geo, PocketKind::Compression(2), &inlet, &inlet).unwrap();
        assert!((c1.p_pa() - 1e5).abs() < 1.0);
        assert!(c2.p_pa() > c1.p_pa());
        assert!(c2.t_k() > inlet.t_k());
    }

    fn scroll(pairs: usize) -> IdealScroll {
        IdealScroll {
            displacement_m3: 1e-4,
            volume_ratio: 2.2,
            wrap_height_m: 0.03,
            orbiting_radius_m: 0.005,
            phi_ie_rad: 20.0,
            theta_d: 3.5,
            suction_clearance_m3: 2e-6,
            wrap_thickness_m: 0.004,
            dead_volume_m3: 2e-6,
            compression_pairs: pairs,
            plenum_volume_m3: 5e-4,
        }
    }

    fn air(p: f64, t: f64) -> FluidState {
        IdealGasModel::new()
            .state(StateInput::PT { p: pa(p), t: k(t) }, Species::Air)
            .unwrap()
    }

    fn leak_flow(geo: &IdealScroll, leak: Leak, def: &LeakageDef, theta: f64) -> f64 {
        let func = leak_function(geo, leak, def, "leak".to_string())
            .unwrap()
            .unwrap();
        func.mdot(&FlowContext::at(theta), &air(3e5, 400.0), &air(1e5, 300.0))
            .unwrap()
    }

    #[test]
    fn centre_to_suction_leak_waits_for_last_pair_to_discharge() {
        let geo = scroll(1);
        let def = LeakageDef::default();
        assert_eq!(leak_flow(&geo, Leak::CentreToSuction, &def, 1.0), 0.0);
        assert_eq!(leak_flow(&geo, Leak::CentreToSuction, &def, 3.4), 0.0);
        assert!(leak_flow(&geo, Leak::CentreToSuction, &def, 5.0) > 0.0);
    }

    #[test]
    fn radial_leak_is_closed_when_suction_wall_is_absent() {
        let geo = scroll(2);
        let def = LeakageDef::default();
        let radial = Leak::Radial(PocketKind::Suction);
        assert_eq!(leak_flow(&geo, radial, &def, 0.0), 0.0);
        assert!(leak_flow(&geo, radial, &def, 2.0) > 0.0);
        assert!(leak_flow(&geo, Leak::Flank, &def, 0.0) > 0.0);
    }

    #[test]
    fn zero_gap_drops_the_path() {
        let def = LeakageDef {
            flank_gap_m: 0.0,
            radial_gap_m: 1e-5,
        };
        let geo = scroll(1);
        let none = |leak| leak_function(&geo, leak, &def, "x".to_string()).unwrap().is_none();
        assert!(none(Leak::Flank));
        assert!(none(Leak::CentreToSuction));
        assert!(!none(Leak::Radial(PocketKind::Suction)));
    }

    #[test]
    fn side_follows_key() {
        assert_eq!(side_of("s2"), 2);
        assert_eq!(side_of("c1.3"), 1);
        assert_eq!(side_of("d2"), 2);
    }

    #[test]
    fn journal_takes_half_diameter() {
        let j = journal(&JournalDef {
            diameter_m: 0.04,
            length_m: 0.03,
            clearance_m: 2e-5,
        });
        assert_eq!(j.radius_m, 0.02);
    }

    #[test]
    fn unknown_species_is_a_compile_error() {
        assert!(matches!(parse_species("unobtainium"), Err(AppError::Compile(_))));
    }
}
