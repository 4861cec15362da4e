//! Crank-angle integrators over a flat state vector.

use nalgebra::DVector;

use crate::error::{SimError, SimResult};

/// ODE system `dy/dθ = f(θ, y)`.
///
/// Takes `&mut self` so models can record the stage evaluations they need.
pub trait AngleModel {
    fn rhs(&mut self, theta: f64, y: &DVector<f64>) -> SimResult<DVector<f64>>;
}

/// Result of one trial step.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub y: DVector<f64>,
    /// Scaled local error; `<= 1` means acceptable. Zero for fixed-step methods.
    pub error_norm: f64,
}

pub trait Integrator {
    fn attempt<M: AngleModel>(
        &self,
        model: &mut M,
        theta: f64,
        y: &DVector<f64>,
        h: f64,
    ) -> SimResult<Attempt>;

    /// Step size to try after a step of size `h` with `error_norm`.
    fn next_step(&self, h: f64, error_norm: f64) -> f64;

    fn min_step(&self) -> f64;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorKind {
    /// Runge-Kutta-Fehlberg 4(5) with step control.
    #[default]
    Rkf45,
    /// Classical fixed-step RK4.
    Rk4,
}

#[derive(Clone, Copy, Debug)]
pub struct IntegratorOptions {
    pub kind: IntegratorKind,
    pub abs_tol: f64,
    pub rel_tol: f64,
    /// First trial step, and the fixed step for RK4 [rad]
    pub h_init: f64,
    pub h_min: f64,
    pub h_max: f64,
}

impl Default for IntegratorOptions {
    fn default() -> Self {
        Self {
            kind: IntegratorKind::Rkf45,
            abs_tol: 1e-8,
            rel_tol: 1e-6,
            h_init: 1e-3,
            h_min: 1e-12,
            h_max: 0.05,
        }
    }
}

impl IntegratorOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.h_init > 0.0 && self.h_min > 0.0 && self.h_max >= self.h_min) {
            return Err(SimError::config("integrator step bounds must satisfy 0 < h_min <= h_max"));
        }
        if !(self.abs_tol > 0.0 && self.rel_tol >= 0.0) {
            return Err(SimError::config("integrator tolerances must be positive"));
        }
        Ok(())
    }
}

/// Classical RK4 (4 rhs calls per step).
#[derive(Clone, Copy, Debug)]
pub struct Rk4 {
    pub h: f64,
}

impl Integrator for Rk4 {
    fn attempt<M: AngleModel>(
        &self,
        model: &mut M,
        theta: f64,
        y: &DVector<f64>,
        h: f64,
    ) -> SimResult<Attempt> {
        let k1 = model.rhs(theta, y)?;
        let k2 = model.rhs(theta + 0.5 * h, &(y + &k1 * (0.5 * h)))?;
        let k3 = model.rhs(theta + 0.5 * h, &(y + &k2 * (0.5 * h)))?;
        let k4 = model.rhs(theta + h, &(y + &k3 * h))?;
        let y_new = y + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0);
        Ok(Attempt {
            y: y_new,
            error_norm: 0.0,
        })
    }

    fn next_step(&self, _h: f64, _error_norm: f64) -> f64 {
        self.h
    }

    fn min_step(&self) -> f64 {
        self.h
    }
}

/// Embedded Fehlberg 4(5) pair; the 5th-order solution is propagated.
#[derive(Clone, Copy, Debug)]
pub struct Rkf45 {
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub h_min: f64,
    pub h_max: f64,
}

impl Rkf45 {
    const SAFETY: f64 = 0.9;
    const SHRINK_LIMIT: f64 = 0.2;
    const GROW_LIMIT: f64 = 5.0;

    fn error_norm(&self, y: &DVector<f64>, y_new: &DVector<f64>, err: &DVector<f64>) -> f64 {
        err.iter()
            .zip(y.iter().zip(y_new.iter()))
            .map(|(e, (a, b))| e.abs() / (self.abs_tol + self.rel_tol * a.abs().max(b.abs())))
            .fold(0.0, f64::max)
    }
}

impl Integrator for Rkf45 {
    fn attempt<M: AngleModel>(
        &self,
        model: &mut M,
        theta: f64,
        y: &DVector<f64>,
        h: f64,
    ) -> SimResult<Attempt> {
        let k1 = model.rhs(theta, y)? * h;
        let k2 = model.rhs(theta + h / 4.0, &(y + &k1 * (1.0 / 4.0)))? * h;
        let k3 = model.rhs(
            theta + 3.0 * h / 8.0,
            &(y + &k1 * (3.0 / 32.0) + &k2 * (9.0 / 32.0)),
        )? * h;
        let k4 = model.rhs(
            theta + 12.0 * h / 13.0,
            &(y + &k1 * (1932.0 / 2197.0) - &k2 * (7200.0 / 2197.0) + &k3 * (7296.0 / 2197.0)),
        )? * h;
        let k5 = model.rhs(
            theta + h,
            &(y + &k1 * (439.0 / 216.0) - &k2 * 8.0 + &k3 * (3680.0 / 513.0)
                - &k4 * (845.0 / 4104.0)),
        )? * h;
        let k6 = model.rhs(
            theta + h / 2.0,
            &(y - &k1 * (8.0 / 27.0) + &k2 * 2.0 - &k3 * (3544.0 / 2565.0)
                + &k4 * (1859.0 / 4104.0)
                - &k5 * (11.0 / 40.0)),
        )? * h;

        let y5 = y
            + &k1 * (16.0 / 135.0)
            + &k3 * (6656.0 / 12825.0)
            + &k4 * (28561.0 / 56430.0)
            - &k5 * (9.0 / 50.0)
            + &k6 * (2.0 / 55.0);
        let y4 = y + &k1 * (25.0 / 216.0) + &k3 * (1408.0 / 2565.0) + &k4 * (2197.0 / 4104.0)
            - &k5 * (1.0 / 5.0);
        let err = &y5 - &y4;
        let error_norm = self.error_norm(y, &y5, &err);
        if !error_norm.is_finite() {
            return Err(SimError::Backend {
                message: format!("non-finite integration error at theta={theta}, h={h}"),
            });
        }
        Ok(Attempt { y: y5, error_norm })
    }

    fn next_step(&self, h: f64, error_norm: f64) -> f64 {
        let factor = if error_norm == 0.0 {
            Self::GROW_LIMIT
        } else {
            (Self::SAFETY * error_norm.powf(-0.2)).clamp(Self::SHRINK_LIMIT, Self::GROW_LIMIT)
        };
        (h * factor).clamp(self.h_min, self.h_max)
    }

    fn min_step(&self) -> f64 {
        self.h_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// dy/dθ = -y, y(0) = 1
    struct Decay;

    impl AngleModel for Decay {
        fn rhs(&mut self, _theta: f64, y: &DVector<f64>) -> SimResult<DVector<f64>> {
            Ok(-y)
        }
    }

    fn integrate<I: Integrator>(integ: &I, h0: f64, theta_end: f64) -> (f64, usize) {
        let mut y = DVector::from_element(1, 1.0);
        let mut theta = 0.0;
        let mut h = h0;
        let mut accepted = 0;
        while theta < theta_end - 1e-14 {
            let h_try = h.min(theta_end - theta);
            let a = integ.attempt(&mut Decay, theta, &y, h_try).unwrap();
            if a.error_norm <= 1.0 || h_try <= integ.min_step() {
                theta += h_try;
                y = a.y;
                accepted += 1;
            }
            h = integ.next_step(h_try, a.error_norm);
        }
        (y[0], accepted)
    }

    #[test]
    fn rk4_matches_exponential() {
        let (y, n) = integrate(&Rk4 { h: 0.01 }, 0.01, 1.0);
        assert!((y - (-1.0f64).exp()).abs() < 1e-9);
        assert!((99..=101).contains(&n));
    }

    #[test]
    fn rkf45_meets_tolerance_with_few_steps() {
        let integ = Rkf45 {
            abs_tol: 1e-10,
            rel_tol: 1e-10,
            h_min: 1e-9,
            h_max: 0.5,
        };
        let (y, n) = integrate(&integ, 1e-3, 2.0);
        assert!((y - (-2.0f64).exp()).abs() < 1e-8, "y = {y}");
        assert!(n < 200, "took {n} steps");
    }

    #[test]
    fn step_growth_is_bounded() {
        let integ = Rkf45 {
            abs_tol: 1e-6,
            rel_tol: 1e-6,
            h_min: 1e-6,
            h_max: 1.0,
        };
        assert!((integ.next_step(0.01, 0.0) - 0.05).abs() < 1e-15);
        assert!((integ.next_step(0.01, 1e6) - 0.002).abs() < 1e-15);
        assert_eq!(integ.next_step(1e-7, 1e6), 1e-6);
    }
}
