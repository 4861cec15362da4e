use pd_project::schema::*;
use pd_project::{load_json, load_yaml, save_json, save_yaml, validate_project};

fn project() -> Project {
    Project {
        version: 1,
        name: "Roundtrip".to_string(),
        fluid: FluidDef {
            species: "N2".to_string(),
            backend: FluidBackendDef::IdealGas,
        },
        geometry: GeometryDef {
            displacement_m3: 1e-4,
            volume_ratio: 2.5,
            wrap_height_m: 0.03,
            orbiting_radius_m: 0.005,
            phi_ie_rad: 20.0,
            discharge_angle_rad: 3.5,
            suction_clearance_m3: 2e-6,
            wrap_thickness_m: 0.004,
            discharge_dead_volume_m3: 2e-6,
            compression_pairs: 3,
            plenum_volume_m3: 5e-4,
        },
        inlet: InletDef {
            pressure_pa: 1e5,
            temperature_k: 290.0,
        },
        outlet: OutletDef { pressure_pa: 3e5 },
        omega_rad_s: 314.0,
        ports: PortsDef::default(),
        leakage: LeakageDef::default(),
        tubes: TubesDef::default(),
        heat_transfer: HeatTransferDef::WallConvection { h_w_per_m2k: 40.0 },
        mech: MechDef::default(),
        solver: SolverDef {
            t_lump_init_k: Some(320.0),
            ..SolverDef::default()
        },
        merge: MergeDef::default(),
        flooded: false,
    }
}

#[test]
fn roundtrip_yaml() {
    let project = project();
    validate_project(&project).unwrap();
    let path = std::env::temp_dir().join("pd_project_roundtrip.yaml");
    save_yaml(&path, &project).unwrap();
    let loaded = load_yaml(&path).unwrap();
    assert_eq!(project, loaded);
}

#[test]
fn roundtrip_json() {
    let mut project = project();
    project.mech.motor = MotorDef::Map {
        torque_nm: vec![0.0, 5.0],
        efficiency: vec![0.8, 0.9],
        speed_rad_s: vec![314.0, 300.0],
    };
    let path = std::env::temp_dir().join("pd_project_roundtrip.json");
    save_json(&path, &project).unwrap();
    let loaded = load_json(&path).unwrap();
    assert_eq!(project, loaded);
}

#[test]
fn optional_sections_take_defaults() {
    let yaml = r#"
version: 1
name: minimal
fluid: { species: Air }
geometry:
  displacement_m3: 1.0e-4
  volume_ratio: 2.2
  wrap_height_m: 0.03
  orbiting_radius_m: 0.005
  phi_ie_rad: 20.0
  discharge_angle_rad: 3.5
inlet: { pressure_pa: 1.0e5, temperature_k: 300.0 }
outlet: { pressure_pa: 3.0e5 }
omega_rad_s: 300.0
"#;
    let project: Project = serde_yaml::from_str(yaml).unwrap();
    validate_project(&project).unwrap();
    assert_eq!(project.geometry.compression_pairs, 2);
    assert_eq!(project.mech, MechDef::default());
    assert_eq!(project.heat_transfer, HeatTransferDef::Adiabatic);
    assert_eq!(project.fluid.backend, FluidBackendDef::IdealGas);
    assert!(!project.flooded);
}
