use std::path::Path;

use pd_project::schema::*;
use pd_project::{ValidationError, validate_project};

fn demo() -> Project {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/projects");
    pd_project::load(&root.join("scroll_air.yaml")).unwrap()
}

#[test]
fn demos_load_and_validate() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/projects");
    for name in ["scroll_air.yaml", "scroll_air_motor_map.json"] {
        let project = pd_project::load(&root.join(name))
            .unwrap_or_else(|e| panic!("Failed to load {name}: {e}"));
        validate_project(&project).unwrap_or_else(|e| panic!("Failed to validate {name}: {e}"));
    }
}

#[test]
fn rejects_unknown_shell_pressure() {
    let mut p = demo();
    p.mech.shell_pressure = "sideways".to_string();
    let err = validate_project(&p).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "mech.shell_pressure"));
}

#[test]
fn rejects_flooded_ideal_gas() {
    let mut p = demo();
    p.flooded = true;
    assert!(matches!(
        validate_project(&p),
        Err(ValidationError::Unsupported { .. })
    ));
}

#[test]
fn rejects_inverted_pressures() {
    let mut p = demo();
    p.outlet.pressure_pa = p.inlet.pressure_pa;
    assert!(validate_project(&p).is_err());
}

#[test]
fn rejects_volume_ratio_at_or_below_one() {
    let mut p = demo();
    p.geometry.volume_ratio = 1.0;
    assert!(validate_project(&p).is_err());
}

#[test]
fn rejects_discharge_angle_outside_cycle() {
    let mut p = demo();
    p.geometry.discharge_angle_rad = 7.0;
    assert!(validate_project(&p).is_err());
}

#[test]
fn rejects_newer_version() {
    let mut p = demo();
    p.version = LATEST_VERSION + 1;
    assert!(matches!(
        validate_project(&p),
        Err(ValidationError::UnsupportedVersion { .. })
    ));
}

#[test]
fn unknown_extension_is_reported() {
    let err = pd_project::load(Path::new("compressor.toml")).unwrap_err();
    assert!(matches!(err, pd_project::ProjectError::UnknownFormat { .. }));
}

#[test]
fn leakage_gaps_default_and_reject_negative() {
    let mut p = demo();
    assert_eq!(p.leakage, LeakageDef::default());
    p.leakage.radial_gap_m = 0.0;
    validate_project(&p).unwrap();
    p.leakage.flank_gap_m = -1e-6;
    assert!(matches!(
        validate_project(&p),
        Err(ValidationError::InvalidValue { ref field, .. }) if field == "leakage.flank_gap_m"
    ));
}
