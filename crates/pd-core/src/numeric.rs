use core::f64::consts::{PI, TAU};

use crate::CoreError;

pub type Real = f64;

#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Signed difference `a - b` wrapped into `(-pi, pi]`.
pub fn angle_difference(a: Real, b: Real) -> Real {
    let d = (a - b + PI).rem_euclid(TAU) - PI;
    // rem_euclid lands on [-pi, pi); fold the lower edge onto +pi
    if d <= -PI { d + TAU } else { d }
}

/// Trapezoidal integral of `y` over the abscissae `x`.
///
/// Pairs where either ordinate is NaN contribute nothing, so rows of
/// chambers that only exist for part of the cycle integrate cleanly.
pub fn trapz(x: &[Real], y: &[Real]) -> Result<Real, CoreError> {
    if x.len() != y.len() {
        return Err(CoreError::LengthMismatch {
            what: "trapz",
            left: x.len(),
            right: y.len(),
        });
    }
    let total = x
        .windows(2)
        .zip(y.windows(2))
        .filter(|(_, yy)| yy[0].is_finite() && yy[1].is_finite())
        .map(|(xx, yy)| 0.5 * (xx[1] - xx[0]) * (yy[0] + yy[1]))
        .sum();
    Ok(total)
}

/// Cycle mean: trapezoidal integral divided by the span of `x`.
pub fn cycle_mean(x: &[Real], y: &[Real]) -> Result<Real, CoreError> {
    let (Some(first), Some(last)) = (x.first(), x.last()) else {
        return Err(CoreError::InvalidArg {
            what: "cycle_mean needs at least two samples",
        });
    };
    let span = last - first;
    if span <= 0.0 {
        return Err(CoreError::InvalidArg {
            what: "cycle_mean span must be positive",
        });
    }
    Ok(trapz(x, y)? / span)
}

/// Piecewise-linear interpolation on a sorted table, clamped at the ends.
pub fn interp1(xs: &[Real], ys: &[Real], x: Real) -> Result<Real, CoreError> {
    if xs.len() != ys.len() {
        return Err(CoreError::LengthMismatch {
            what: "interp1",
            left: xs.len(),
            right: ys.len(),
        });
    }
    let n = xs.len();
    if n == 0 {
        return Err(CoreError::InvalidArg {
            what: "interp1 table is empty",
        });
    }
    if n == 1 || x <= xs[0] {
        return Ok(ys[0]);
    }
    if x >= xs[n - 1] {
        return Ok(ys[n - 1]);
    }
    let i = xs.partition_point(|&xi| xi <= x).saturating_sub(1);
    let (x0, x1) = (xs[i], xs[i + 1]);
    let w = (x - x0) / (x1 - x0);
    Ok(ys[i] + w * (ys[i + 1] - ys[i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances::default();
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        assert!(format!("{err}").contains("Non-finite"));
    }

    #[test]
    fn angle_difference_wraps_across_zero() {
        let d = angle_difference(0.1, TAU - 0.01);
        assert!((d - 0.11).abs() < 1e-12, "got {d}");
        assert_eq!(angle_difference(1.3, 1.3), 0.0);
        assert!((angle_difference(PI, 0.0) - PI).abs() < 1e-12);
        assert!((angle_difference(0.0, PI) - PI).abs() < 1e-12);
    }

    #[test]
    fn trapz_matches_linear_integral() {
        let x: Vec<f64> = (0..=10).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
        assert!((trapz(&x, &y).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn trapz_skips_nan_segments() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 1.0, f64::NAN, f64::NAN];
        assert!((trapz(&x, &y).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn interp1_clamps_and_interpolates() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 10.0, 40.0];
        assert_eq!(interp1(&xs, &ys, -1.0).unwrap(), 0.0);
        assert_eq!(interp1(&xs, &ys, 5.0).unwrap(), 40.0);
        assert!((interp1(&xs, &ys, 1.5).unwrap() - 25.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn angle_difference_in_half_open_range(a in -50.0f64..50.0, b in -50.0f64..50.0) {
            let d = angle_difference(a, b);
            prop_assert!(d > -PI - 1e-12 && d <= PI + 1e-12);
            prop_assert_eq!(angle_difference(a, a), 0.0);
        }

        #[test]
        fn cycle_mean_of_constant_is_constant(c in -1e3f64..1e3, n in 2usize..50) {
            let x: Vec<f64> = (0..n).map(|i| TAU * i as f64 / (n - 1) as f64).collect();
            let y = vec![c; n];
            let mean = cycle_mean(&x, &y).unwrap();
            prop_assert!((mean - c).abs() <= 1e-9 * c.abs().max(1.0));
        }
    }
}
