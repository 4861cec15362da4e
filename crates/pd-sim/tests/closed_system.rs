use std::f64::consts::PI;
use std::sync::Arc;

use pd_core::units::{k, pa};
use pd_flow::{ConstantArea, IsentropicNozzle};
use pd_fluids::{FluidModel, FluidState, IdealGasModel, Species, StateInput};
use pd_sim::summary::column_sums;
use pd_sim::{
    ChamberShape, ControlVolume, EventConfig, FlowPath, IntegratorKind, IntegratorOptions,
    SimulationState,
};

fn air(p: f64, t: f64) -> FluidState {
    IdealGasModel::new()
        .state(StateInput::PT { p: pa(p), t: k(t) }, Species::Air)
        .unwrap()
}

fn two_tanks() -> SimulationState {
    let mut sim = SimulationState::new(
        Arc::new(IdealGasModel::new()),
        50.0,
        EventConfig {
            theta_d: PI,
            merge: None,
            flooded: false,
        },
    );
    sim.cvs
        .add(ControlVolume::new("a", ChamberShape::Compression, |_| (2e-5, 0.0), air(4e5, 320.0)))
        .unwrap();
    sim.cvs
        .add(ControlVolume::new("b", ChamberShape::Compression, |_| (1e-5, 0.0), air(1e5, 300.0)))
        .unwrap();
    sim.flows.add(FlowPath::new(
        "a",
        "b",
        IsentropicNozzle::new("orifice", 0.7, ConstantArea(1e-7)).unwrap(),
    ));
    sim
}

fn check_conservation(mut sim: SimulationState) {
    sim.validate().unwrap();
    sim.run_cycle().unwrap();
    let h = &sim.history;
    let mass = column_sums(&h.m);
    let (first, last) = (mass[0], mass[mass.len() - 1]);
    assert!((last - first).abs() < 1e-6 * first, "mass {first} -> {last}");

    // Flow runs from the high-pressure tank until the pressures tie
    let last_col = h.len() - 1;
    assert!(h.p.get(0, last_col) < 4e5);
    assert!(h.p.get(1, last_col) > 1e5);
    assert!(h.p.get(0, last_col) >= h.p.get(1, last_col) - 1.0);
    assert!(h.mdot.row(0).iter().all(|&m| m >= 0.0));
}

#[test]
fn adaptive_cycle_conserves_mass() {
    check_conservation(two_tanks());
}

#[test]
fn fixed_step_cycle_conserves_mass() {
    let sim = two_tanks().with_integrator(IntegratorOptions {
        kind: IntegratorKind::Rk4,
        h_init: 2e-3,
        ..IntegratorOptions::default()
    });
    check_conservation(sim);
}
