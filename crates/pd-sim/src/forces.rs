//! Gas forces on the orbiting member, reconstructed from a cycle history.
//!
//! Everything here is read-only over the [`History`]: no chamber or flow
//! state is touched. Force coefficients are per unit chamber pressure and
//! come from the machine family through [`ForceGeometry`].

use std::f64::consts::{FRAC_PI_2, PI};

use pd_core::numeric::cycle_mean;

use crate::control_volume::{ChamberShape, CvRegistry};
use crate::error::{SimError, SimResult};
use crate::history::History;

/// In-plane force and spin moment per unit pressure for one chamber.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceCoefficients {
    /// [m²]
    pub fx: f64,
    /// [m²]
    pub fy: f64,
    /// [m³]
    pub mz: f64,
}

impl ForceCoefficients {
    /// Coefficients whose only effect is a tangential force doing the
    /// chamber's `−p dV` work through the crank pin.
    ///
    /// `big_theta` is the pin angle `φ_ie − π/2 − θ`.
    pub fn from_volume_rate(big_theta: f64, dv: f64, ro: f64) -> Self {
        let ft = -dv / ro;
        Self {
            fx: -big_theta.sin() * ft,
            fy: big_theta.cos() * ft,
            mz: 0.0,
        }
    }
}

/// Machine-family geometry the post-processor needs.
pub trait ForceGeometry: Send + Sync {
    /// [m]
    fn wrap_height(&self) -> f64;

    /// Orbiting radius [m]
    fn orbiting_radius(&self) -> f64;

    /// Involute angle at the end of the inner wrap [rad]
    fn phi_ie(&self) -> f64;

    fn coefficients(&self, key: &str, shape: ChamberShape, theta: f64, dv: f64) -> ForceCoefficients;

    /// Wrap-tip area loaded axially by the chamber's pressure [m²]
    fn tip_area(&self, _key: &str, _shape: ChamberShape) -> f64 {
        0.0
    }
}

/// Loads that do not come from the chambers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceOptions {
    /// Pressure behind the orbiting plate [Pa]
    pub back_pressure_pa: f64,
    /// Area the back pressure acts on [m²]
    pub back_area_m2: f64,
    /// Axial distance from the in-plane gas force to the upper bearing [m]
    pub moment_arm_m: f64,
    pub orbiting_mass_kg: f64,
    pub omega: f64,
}

/// Cycle means of the summed per-angle series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceMeans {
    pub fz: f64,
    pub fx: f64,
    pub fy: f64,
    pub fm: f64,
    pub fr: f64,
    pub ft: f64,
    pub mz: f64,
    pub mx: f64,
    pub my: f64,
    pub tau: f64,
}

/// Per-angle force series summed over the chambers, in newtons and
/// newton-metres.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForceSummary {
    pub theta: Vec<f64>,
    pub fz: Vec<f64>,
    pub fx: Vec<f64>,
    pub fy: Vec<f64>,
    pub fr: Vec<f64>,
    pub ft: Vec<f64>,
    pub mz: Vec<f64>,
    pub mx: Vec<f64>,
    pub my: Vec<f64>,
    pub tau: Vec<f64>,
    /// Back-pressure force [N]
    pub f_back: f64,
    /// Orbiting-mass centrifugal force `m ω² r_o` [N]
    pub inertial: f64,
    pub mean: ForceMeans,
}

impl ForceSummary {
    /// Named series for persistence.
    pub fn series(&self) -> [(&'static str, &[f64]); 9] {
        [
            ("Fz", self.fz.as_slice()),
            ("Fx", self.fx.as_slice()),
            ("Fy", self.fy.as_slice()),
            ("Fr", self.fr.as_slice()),
            ("Ft", self.ft.as_slice()),
            ("Mz", self.mz.as_slice()),
            ("Mx", self.mx.as_slice()),
            ("My", self.my.as_slice()),
            ("tau", self.tau.as_slice()),
        ]
    }
}

pub fn compute_forces(
    history: &History,
    cvs: &CvRegistry,
    geometry: &dyn ForceGeometry,
    opts: &ForceOptions,
) -> SimResult<ForceSummary> {
    let h = geometry.wrap_height();
    let ro = geometry.orbiting_radius();
    if !(h > 0.0 && ro > 0.0) {
        return Err(SimError::config("wrap height and orbiting radius must be positive"));
    }
    let n = history.len();
    if n < 2 {
        return Err(SimError::invariant("force analysis needs a completed cycle"));
    }

    let f_back = opts.back_pressure_pa * opts.back_area_m2;
    let mut out = ForceSummary {
        theta: history.theta.clone(),
        f_back,
        inertial: opts.orbiting_mass_kg * opts.omega.powi(2) * ro,
        ..ForceSummary::default()
    };

    for (c, &theta) in history.theta.iter().enumerate() {
        let big_theta = geometry.phi_ie() - FRAC_PI_2 - theta;
        let (mut fz, mut fx, mut fy, mut mz) = (0.0, 0.0, 0.0, 0.0);
        for (row, cv) in cvs.iter().enumerate() {
            if cv.shape() == ChamberShape::Plenum {
                continue;
            }
            let p = history.p.get(row, c);
            let v = history.v.get(row, c);
            let dv = history.dv.get(row, c);
            if !(p.is_finite() && v.is_finite() && dv.is_finite()) {
                continue;
            }
            fz += p * (v / h + geometry.tip_area(cv.key(), cv.shape()));
            let k = geometry.coefficients(cv.key(), cv.shape(), theta, dv);
            fx += p * k.fx;
            fy += p * k.fy;
            mz += p * k.mz;
        }
        fz -= f_back;

        let (s, co) = big_theta.sin_cos();
        let (x_pin, y_pin) = (ro * co, ro * s);
        let fr = co * fx + s * fy;
        let ft = co * fy - s * fx;
        out.fz.push(fz);
        out.fx.push(fx);
        out.fy.push(fy);
        out.fr.push(fr);
        out.ft.push(ft);
        out.mz.push(mz);
        out.mx.push(-fy * opts.moment_arm_m + y_pin * f_back);
        out.my.push(fx * opts.moment_arm_m - x_pin * f_back);
        out.tau.push(x_pin * fy - y_pin * fx);
    }

    let t = &out.theta;
    let fm: Vec<f64> = out.fx.iter().zip(&out.fy).map(|(x, y)| x.hypot(*y)).collect();
    out.mean = ForceMeans {
        fz: cycle_mean(t, &out.fz)?,
        fx: cycle_mean(t, &out.fx)?,
        fy: cycle_mean(t, &out.fy)?,
        fm: cycle_mean(t, &fm)?,
        fr: cycle_mean(t, &out.fr)?,
        ft: cycle_mean(t, &out.ft)?,
        mz: cycle_mean(t, &out.mz)?,
        mx: cycle_mean(t, &out.mx)?,
        my: cycle_mean(t, &out.my)?,
        tau: cycle_mean(t, &out.tau)?,
    };
    Ok(out)
}

/// Back area of a thrust surface with inner diameter `d` [m²].
pub fn back_area(inner_diameter_m: f64) -> f64 {
    PI * inner_diameter_m.powi(2) / 4.0
}
