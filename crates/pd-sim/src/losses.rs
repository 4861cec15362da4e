//! Bearing friction and motor losses.

use std::f64::consts::{PI, TAU};
use std::str::FromStr;

use pd_core::numeric::{cycle_mean, interp1};

use crate::error::{SimError, SimResult};
use crate::forces::{ForceSummary, back_area};

/// Which side of the machine the shell sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellPressure {
    #[default]
    Low,
    Mid,
    High,
}

impl ShellPressure {
    /// Pressure behind the orbiting plate [Pa].
    pub fn back_pressure(self, p_inlet: f64, p_outlet: f64) -> f64 {
        match self {
            ShellPressure::Low => p_inlet.min(p_outlet),
            ShellPressure::High => p_inlet.max(p_outlet),
            ShellPressure::Mid => 0.5 * (p_inlet + p_outlet),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShellPressure::Low => "low",
            ShellPressure::Mid => "mid",
            ShellPressure::High => "high",
        }
    }
}

impl FromStr for ShellPressure {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(ShellPressure::Low),
            "mid" => Ok(ShellPressure::Mid),
            "high" => Ok(ShellPressure::High),
            other => Err(SimError::config(format!(
                "shell pressure must be one of 'low', 'mid' or 'high', got '{other}'"
            ))),
        }
    }
}

/// Raimondi-Boyd design chart for a full journal with `L/D = 1`:
/// Sommerfeld number against the friction variable `(r/c) f`.
const SOMMERFELD: [f64; 7] = [0.0, 0.00474, 0.0188, 0.0446, 0.121, 0.264, 0.631];
const FRICTION_VARIABLE: [f64; 7] = [0.0, 0.514, 1.05, 1.70, 3.22, 5.79, 12.8];

/// Hydrodynamic journal bearing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JournalBearing {
    pub radius_m: f64,
    pub length_m: f64,
    /// Radial clearance [m]
    pub clearance_m: f64,
}

impl JournalBearing {
    fn validate(&self, what: &str) -> SimResult<()> {
        if !(self.radius_m > 0.0 && self.length_m > 0.0 && self.clearance_m > 0.0) {
            return Err(SimError::config(format!(
                "{what} bearing radius, length and clearance must be positive"
            )));
        }
        Ok(())
    }

    /// `S = (r/c)² μ N / P` with `N = ω/2π` and `P = W / (2 r L)`.
    pub fn sommerfeld(&self, mu: f64, load_n: f64, omega: f64) -> f64 {
        let p = load_n / (2.0 * self.radius_m * self.length_m);
        (self.radius_m / self.clearance_m).powi(2) * mu * (omega / TAU) / p
    }

    /// `(r/c) f` from the design chart; Petroff's `2π² S` past its end.
    pub fn friction_variable(sommerfeld: f64) -> SimResult<f64> {
        let last = SOMMERFELD.len() - 1;
        if sommerfeld >= SOMMERFELD[last] {
            let petroff_tail = FRICTION_VARIABLE[last] - 2.0 * PI * PI * SOMMERFELD[last];
            return Ok(2.0 * PI * PI * sommerfeld + petroff_tail);
        }
        Ok(interp1(&SOMMERFELD, &FRICTION_VARIABLE, sommerfeld)?)
    }

    /// Friction power `f W r ω = (r/c) f · c W ω` [W]. An unloaded
    /// bearing still drags at the Petroff rate.
    pub fn friction_power(&self, mu: f64, load_n: f64, omega: f64) -> SimResult<f64> {
        let load = load_n.abs();
        if load <= 0.0 {
            let area = 2.0 * self.radius_m * self.length_m;
            let f_times_w =
                2.0 * PI * PI * mu * (omega / TAU) * area * (self.radius_m / self.clearance_m);
            return Ok(f_times_w * self.radius_m * omega);
        }
        let s = self.sommerfeld(mu, load, omega);
        Ok(Self::friction_variable(s)? * self.clearance_m * load * omega)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrustBearing {
    pub friction_coefficient: f64,
    /// Inner diameter of the thrust surface; sets the back-pressure area [m]
    pub inner_diameter_m: f64,
}

impl ThrustBearing {
    /// `μ |F_z| r_o ω` [W]
    pub fn friction_power(&self, fz: f64, ro: f64, omega: f64) -> f64 {
        self.friction_coefficient * fz.abs() * ro * omega
    }
}

/// Motor efficiency at the shaft load.
#[derive(Debug, Clone, PartialEq)]
pub enum Motor {
    Constant {
        efficiency: f64,
    },
    /// Efficiency and slip speed tabulated against shaft torque.
    Map {
        torque_nm: Vec<f64>,
        efficiency: Vec<f64>,
        speed_rad_s: Vec<f64>,
    },
}

/// Where the motor runs for a given shaft torque.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorPoint {
    pub efficiency: f64,
    /// Shaft speed from the map, if the motor has one [rad/s]
    pub speed_rad_s: Option<f64>,
}

impl Motor {
    pub fn validate(&self) -> SimResult<()> {
        let ok_eta = |e: f64| e > 0.0 && e <= 1.0;
        match self {
            Motor::Constant { efficiency } if ok_eta(*efficiency) => Ok(()),
            Motor::Constant { .. } => Err(SimError::config("motor efficiency must lie in (0, 1]")),
            Motor::Map {
                torque_nm,
                efficiency,
                speed_rad_s,
            } => {
                if torque_nm.len() < 2
                    || torque_nm.len() != efficiency.len()
                    || torque_nm.len() != speed_rad_s.len()
                {
                    return Err(SimError::config(
                        "motor map needs at least two rows of equal length",
                    ));
                }
                if torque_nm.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(SimError::config("motor map torque must increase strictly"));
                }
                if !efficiency.iter().all(|e| ok_eta(*e)) {
                    return Err(SimError::config("motor map efficiency must lie in (0, 1]"));
                }
                if !speed_rad_s.iter().all(|w| *w > 0.0) {
                    return Err(SimError::config("motor map speed must be positive"));
                }
                Ok(())
            }
        }
    }

    pub fn operating_point(&self, shaft_torque_nm: f64) -> SimResult<MotorPoint> {
        match self {
            Motor::Constant { efficiency } => Ok(MotorPoint {
                efficiency: *efficiency,
                speed_rad_s: None,
            }),
            Motor::Map {
                torque_nm,
                efficiency,
                speed_rad_s,
            } => Ok(MotorPoint {
                efficiency: interp1(torque_nm, efficiency, shaft_torque_nm)?,
                speed_rad_s: Some(interp1(torque_nm, speed_rad_s, shaft_torque_nm)?),
            }),
        }
    }
}

/// `W_mech (1/η − 1)` [W]
pub fn motor_losses(w_mech: f64, efficiency: f64) -> f64 {
    w_mech * (1.0 / efficiency - 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MechanicalConfig {
    pub upper_bearing: JournalBearing,
    pub lower_bearing: JournalBearing,
    /// Orbiting-scroll (crank pin) bearing
    pub crank_bearing: JournalBearing,
    pub thrust_bearing: ThrustBearing,
    /// Oil dynamic viscosity [Pa·s]
    pub mu_oil: f64,
    /// Lever ratio between the upper and lower main bearings
    pub l_ratio_bearings: f64,
    /// Scale on every journal-bearing loss
    pub journal_tune_factor: f64,
    pub orbiting_mass_kg: f64,
    pub shell_pressure: ShellPressure,
    pub h_shell_w_per_m2k: f64,
    pub a_shell_m2: f64,
    pub t_amb_k: f64,
    pub motor: Motor,
    /// Fraction of motor losses that heats the suction gas
    pub suction_fraction: f64,
}

impl MechanicalConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.upper_bearing.validate("upper")?;
        self.lower_bearing.validate("lower")?;
        self.crank_bearing.validate("crank")?;
        if !(self.mu_oil >= 0.0 && self.l_ratio_bearings > 0.0 && self.journal_tune_factor >= 0.0) {
            return Err(SimError::config(
                "oil viscosity, bearing lever ratio and tune factor must be non-negative",
            ));
        }
        if !(self.thrust_bearing.friction_coefficient >= 0.0
            && self.thrust_bearing.inner_diameter_m >= 0.0)
        {
            return Err(SimError::config("thrust bearing parameters must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.suction_fraction) {
            return Err(SimError::config("suction heating fraction must lie in [0, 1]"));
        }
        if !(self.h_shell_w_per_m2k >= 0.0 && self.a_shell_m2 >= 0.0 && self.t_amb_k > 0.0) {
            return Err(SimError::config("shell heat transfer parameters are non-physical"));
        }
        self.motor.validate()
    }

    /// Area behind the orbiting plate [m²].
    pub fn back_area_m2(&self) -> f64 {
        back_area(self.thrust_bearing.inner_diameter_m)
    }

    /// Heat rejected by the shell to ambient at lump temperature `t` [W].
    pub fn ambient_heat(&self, t_lump_k: f64) -> f64 {
        self.h_shell_w_per_m2k * self.a_shell_m2 * (t_lump_k - self.t_amb_k)
    }
}

/// Cycle-mean bearing losses and loads.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MechanicalLosses {
    pub crank_bearing_w: f64,
    pub upper_bearing_w: f64,
    pub lower_bearing_w: f64,
    pub thrust_bearing_w: f64,
    pub total_w: f64,
    /// Mean crank-pin load [N]
    pub crank_load_n: f64,
    pub upper_load_n: f64,
    pub lower_load_n: f64,
}

pub fn mechanical_losses(
    forces: &ForceSummary,
    mech: &MechanicalConfig,
    ro: f64,
    omega: f64,
) -> SimResult<MechanicalLosses> {
    let t = &forces.theta;
    let w_crank: Vec<f64> = forces
        .fr
        .iter()
        .zip(&forces.ft)
        .map(|(fr, ft)| (fr + forces.inertial).hypot(*ft))
        .collect();
    let inv_l = 1.0 / mech.l_ratio_bearings;
    let w_upper: Vec<f64> = w_crank.iter().map(|w| w * (1.0 + inv_l)).collect();
    let w_lower: Vec<f64> = w_crank.iter().map(|w| w * inv_l).collect();

    let tune = mech.journal_tune_factor;
    let journal_loss = |bearing: &JournalBearing, loads: &[f64]| -> SimResult<f64> {
        let series = loads
            .iter()
            .map(|w| bearing.friction_power(mech.mu_oil, *w, omega))
            .collect::<SimResult<Vec<f64>>>()?;
        Ok(tune * cycle_mean(t, &series)?)
    };
    let crank = journal_loss(&mech.crank_bearing, &w_crank)?;
    let upper = journal_loss(&mech.upper_bearing, &w_upper)?;
    let lower = journal_loss(&mech.lower_bearing, &w_lower)?;
    let thrust_series: Vec<f64> = forces
        .fz
        .iter()
        .map(|fz| mech.thrust_bearing.friction_power(*fz, ro, omega))
        .collect();
    let thrust = cycle_mean(t, &thrust_series)?;

    Ok(MechanicalLosses {
        crank_bearing_w: crank,
        upper_bearing_w: upper,
        lower_bearing_w: lower,
        thrust_bearing_w: thrust,
        total_w: crank + upper + lower + thrust,
        crank_load_n: cycle_mean(t, &w_crank)?,
        upper_load_n: cycle_mean(t, &w_upper)?,
        lower_load_n: cycle_mean(t, &w_lower)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_pressure_options() {
        assert_eq!("LOW".parse::<ShellPressure>().unwrap(), ShellPressure::Low);
        assert_eq!(ShellPressure::Mid.back_pressure(1e5, 3e5), 2e5);
        assert_eq!(ShellPressure::High.back_pressure(3e5, 1e5), 3e5);
        assert!(matches!(
            "medium".parse::<ShellPressure>(),
            Err(SimError::Config { .. })
        ));
    }

    fn bearing() -> JournalBearing {
        JournalBearing {
            radius_m: 0.01,
            length_m: 0.02,
            clearance_m: 2e-5,
        }
    }

    #[test]
    fn journal_loss_grows_with_load() {
        let b = bearing();
        let (mu, omega) = (0.008, 377.0);
        let mut last = b.friction_power(mu, 0.0, omega).unwrap();
        for w in [10.0, 100.0, 1000.0, 5000.0, 20_000.0] {
            let p = b.friction_power(mu, w, omega).unwrap();
            assert!(p > last, "loss at {w} N = {p} not above {last}");
            last = p;
        }
    }

    #[test]
    fn light_load_approaches_petroff() {
        let b = bearing();
        let (mu, omega) = (0.008, 377.0);
        let unloaded = b.friction_power(mu, 0.0, omega).unwrap();
        let light = b.friction_power(mu, 1e-3, omega).unwrap();
        assert!((light - unloaded).abs() < 0.01 * unloaded);
        assert!(b.sommerfeld(mu, 1e-3, omega) > 0.631);
    }

    #[test]
    fn chart_is_continuous_at_its_end() {
        let below = JournalBearing::friction_variable(0.631 - 1e-9).unwrap();
        let above = JournalBearing::friction_variable(0.631 + 1e-9).unwrap();
        assert!((below - above).abs() < 1e-6);
        assert_eq!(JournalBearing::friction_variable(0.0).unwrap(), 0.0);
        assert!((JournalBearing::friction_variable(0.121).unwrap() - 3.22).abs() < 1e-12);
    }

    #[test]
    fn motor_map_interpolates() {
        let m = Motor::Map {
            torque_nm: vec![0.0, 10.0],
            efficiency: vec![0.8, 0.9],
            speed_rad_s: vec![377.0, 360.0],
        };
        m.validate().unwrap();
        let pt = m.operating_point(5.0).unwrap();
        assert!((pt.efficiency - 0.85).abs() < 1e-12);
        assert_eq!(pt.speed_rad_s, Some(368.5));
        assert!((motor_losses(900.0, 0.9) - 100.0).abs() < 1e-9);
        assert!(Motor::Constant { efficiency: 1.2 }.validate().is_err());
    }
}
