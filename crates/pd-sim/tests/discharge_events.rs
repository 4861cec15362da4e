use std::f64::consts::PI;
use std::sync::Arc;

use pd_core::units::{k, pa};
use pd_fluids::{FluidModel, FluidState, IdealGasModel, Species, StateInput};
use pd_sim::events::{discharge_transition, merge_chambers};
use pd_sim::{ChamberShape, ControlVolume, EventConfig, MergeRule, SimError, SimulationState};

fn air(p: f64, t: f64) -> FluidState {
    IdealGasModel::new()
        .state(StateInput::PT { p: pa(p), t: k(t) }, Species::Air)
        .unwrap()
}

fn mass_and_energy(sim: &SimulationState, keys: &[&str], theta: f64) -> (f64, f64) {
    keys.iter().fold((0.0, 0.0), |(m, u), key| {
        let cv = sim.cvs.get(sim.cvs.require(key).unwrap()).unwrap();
        let mi = cv.state().rho_kg_m3() * cv.volume(theta).0;
        (m + mi, u + mi * cv.state().u())
    })
}

/// Two discharge pockets and the centre pocket ahead of the merged chamber.
fn discharge_region(merge: Option<MergeRule>, flooded: bool) -> SimulationState {
    let mut sim = SimulationState::new(
        Arc::new(IdealGasModel::new()),
        300.0,
        EventConfig {
            theta_d: PI,
            merge,
            flooded,
        },
    );
    let d = |t: f64| (2e-6 * (2.0 - t / PI), -2e-6 / PI);
    let dd = |t: f64| (1e-6 * (1.5 - 0.25 * t / PI), -0.25e-6 / PI);
    sim.cvs
        .add(ControlVolume::new("d1", ChamberShape::Discharge, d, air(8e5, 360.0)))
        .unwrap();
    sim.cvs
        .add(ControlVolume::new("d2", ChamberShape::Discharge, d, air(8.1e5, 365.0)))
        .unwrap();
    sim.cvs
        .add(ControlVolume::new("dd", ChamberShape::Discharge, dd, air(7.9e5, 380.0)))
        .unwrap();
    sim.cvs
        .add(
            ControlVolume::new(
                "ddd",
                ChamberShape::DischargeMerged,
                move |t: f64| {
                    let (vd, dvd) = d(t);
                    let (vdd, dvdd) = dd(t);
                    (2.0 * vd + vdd, 2.0 * dvd + dvdd)
                },
                air(8e5, 370.0),
            )
            .exists_at_start(false),
        )
        .unwrap();
    sim
}

fn rule() -> MergeRule {
    MergeRule::new("d1", ["d1", "d2", "dd"], "ddd")
}

#[test]
fn merge_conserves_mass_and_internal_energy() {
    let mut sim = discharge_region(Some(rule()), false);
    sim.validate().unwrap();
    let theta = 4.2;
    let (m0, u0) = mass_and_energy(&sim, &["d1", "d2", "dd"], theta);

    merge_chambers(&mut sim, &rule(), theta, false).unwrap();

    let (m1, u1) = mass_and_energy(&sim, &["ddd"], theta);
    assert!((m1 - m0).abs() < 1e-5 * m0, "mass {m0} -> {m1}");
    assert!((u1 - u0).abs() < 1e-5, "energy {u0} -> {u1}");
    let live = sim.cvs.exists_keys().unwrap();
    assert_eq!(live, ["ddd".to_string()]);
}

#[test]
fn merged_temperature_lies_between_sources() {
    let mut sim = discharge_region(Some(rule()), false);
    sim.validate().unwrap();
    merge_chambers(&mut sim, &rule(), 4.2, false).unwrap();
    let t = sim.cvs.get(3).unwrap().state().t_k();
    assert!(t > 360.0 && t < 380.0, "T = {t}");
}

#[test]
fn merge_rejects_absent_source() {
    let mut sim = discharge_region(Some(rule()), false);
    sim.validate().unwrap();
    let row = sim.cvs.require("d2").unwrap();
    sim.cvs.set_exists(row, false).unwrap();
    sim.cvs.update_existence();
    let err = merge_chambers(&mut sim, &rule(), 4.2, false).unwrap_err();
    assert!(matches!(err, SimError::Invariant { .. }), "{err}");
    assert!(sim.cvs.get(row).is_some_and(|cv| !cv.exists()));
    assert!(!sim.cvs.get(3).unwrap().exists(), "target stays absent");
}

#[test]
fn flooded_merge_is_unsupported() {
    let mut sim = discharge_region(Some(rule()), true);
    sim.validate().unwrap();
    let err = merge_chambers(&mut sim, &rule(), 4.2, true).unwrap_err();
    assert!(matches!(err, SimError::Unsupported { .. }), "{err}");
}

#[test]
fn merge_rule_must_name_registered_chambers() {
    let mut sim = discharge_region(Some(MergeRule::new("d1", ["d1", "d3"], "ddd")), false);
    assert!(matches!(sim.validate(), Err(SimError::Config { .. })));
}

#[test]
fn discharge_transition_copies_temperature_and_density() {
    let mut sim = SimulationState::new(
        Arc::new(IdealGasModel::new()),
        300.0,
        EventConfig {
            theta_d: PI,
            merge: None,
            flooded: false,
        },
    );
    sim.cvs
        .add(
            ControlVolume::new(
                "c2.1",
                ChamberShape::Compression,
                |_| (2e-6, -1e-6),
                air(7.7e5, 352.0),
            )
            .discharge_becomes("d1"),
        )
        .unwrap();
    sim.cvs
        .add(
            ControlVolume::new("d1", ChamberShape::Discharge, |_| (2e-6, -1e-6), air(1e5, 300.0))
                .exists_at_start(false),
        )
        .unwrap();
    sim.validate().unwrap();

    let moved = discharge_transition(&mut sim).unwrap();
    assert_eq!(moved, 1);
    let src = *sim.cvs.get(0).unwrap().state();
    let dst = sim.cvs.get(1).unwrap();
    assert!(dst.exists());
    assert!(!sim.cvs.get(0).unwrap().exists());
    assert!((dst.state().t_k() - src.t_k()).abs() < 1e-9);
    assert!((dst.state().rho_kg_m3() - src.rho_kg_m3()).abs() < 1e-9 * src.rho_kg_m3());
    assert!(!sim.cvs.is_stale());
}
