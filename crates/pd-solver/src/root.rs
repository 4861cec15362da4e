//! Bracketed 1-D root finders.

use crate::error::SolverError;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct RootConfig {
    pub max_iterations: usize,
    /// Absolute tolerance on |f(x)|
    pub f_tol: f64,
    /// Absolute tolerance on the bracket width or step size
    pub x_tol: f64,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            f_tol: 1e-9,
            x_tol: 1e-10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootResult {
    pub x: f64,
    pub residual: f64,
    pub iterations: usize,
}

fn finite<E: From<SolverError>>(v: f64, what: &'static str) -> Result<f64, E> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SolverError::Numeric { what }.into())
    }
}

/// Illinois-modified regula falsi on `[lo, hi]`.
///
/// `f(lo)` and `f(hi)` must have opposite signs (or one of them be zero).
pub fn illinois<F, E>(
    what: &'static str,
    mut f: F,
    lo: f64,
    hi: f64,
    config: &RootConfig,
) -> Result<RootResult, E>
where
    F: FnMut(f64) -> Result<f64, E>,
    E: From<SolverError>,
{
    let (mut a, mut b) = (lo, hi);
    let mut fa = finite::<E>(f(a)?, what)?;
    let mut fb = finite::<E>(f(b)?, what)?;
    if fa == 0.0 {
        return Ok(RootResult {
            x: a,
            residual: 0.0,
            iterations: 0,
        });
    }
    if fb == 0.0 {
        return Ok(RootResult {
            x: b,
            residual: 0.0,
            iterations: 0,
        });
    }
    if fa.signum() == fb.signum() {
        return Err(SolverError::NotBracketed {
            what,
            lo: a,
            hi: b,
            f_lo: fa,
            f_hi: fb,
        }
        .into());
    }

    // -1 when b was replaced last iteration, +1 when a was
    let mut side = 0i8;
    let mut best = if fa.abs() < fb.abs() { (a, fa) } else { (b, fb) };
    for iter in 1..=config.max_iterations {
        let c = (a * fb - b * fa) / (fb - fa);
        let fc = finite::<E>(f(c)?, what)?;
        if fc.abs() < best.1.abs() {
            best = (c, fc);
        }
        if fc.abs() <= config.f_tol || (b - a).abs() <= config.x_tol {
            return Ok(RootResult {
                x: c,
                residual: fc,
                iterations: iter,
            });
        }
        if fc.signum() == fb.signum() {
            b = c;
            fb = fc;
            if side == -1 {
                fa *= 0.5;
            }
            side = -1;
        } else {
            a = c;
            fa = fc;
            if side == 1 {
                fb *= 0.5;
            }
            side = 1;
        }
    }
    Err(SolverError::ConvergenceFailed {
        what,
        iterations: config.max_iterations,
        residual: best.1,
    }
    .into())
}

/// Expand `[x0 - half_width, x0 + half_width]` until it brackets a sign
/// change, then hand off to [`illinois`].
pub fn bracket_and_solve<F, E>(
    what: &'static str,
    mut f: F,
    x0: f64,
    half_width: f64,
    max_expansions: usize,
    config: &RootConfig,
) -> Result<RootResult, E>
where
    F: FnMut(f64) -> Result<f64, E>,
    E: From<SolverError>,
{
    let mut width = half_width;
    let (mut lo, mut hi) = (x0 - width, x0 + width);
    let mut f_lo = finite::<E>(f(lo)?, what)?;
    let mut f_hi = finite::<E>(f(hi)?, what)?;
    let mut expansions = 0;
    while f_lo.signum() == f_hi.signum() && f_lo != 0.0 && f_hi != 0.0 {
        if expansions == max_expansions {
            return Err(SolverError::NotBracketed {
                what,
                lo,
                hi,
                f_lo,
                f_hi,
            }
            .into());
        }
        expansions += 1;
        width *= 2.0;
        warn!(what, lo = x0 - width, hi = x0 + width, "expanding root bracket");
        // Grow toward the side with the smaller residual
        if f_lo.abs() < f_hi.abs() {
            lo = x0 - width;
            f_lo = finite::<E>(f(lo)?, what)?;
        } else {
            hi = x0 + width;
            f_hi = finite::<E>(f(hi)?, what)?;
        }
    }
    debug!(what, lo, hi, "root bracketed");
    illinois(what, f, lo, hi, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverResult;
    use proptest::prelude::*;

    #[test]
    fn illinois_finds_cubic_root() {
        let r = illinois::<_, SolverError>(
            "cubic",
            |x| Ok(x * x * x - 2.0 * x - 5.0),
            2.0,
            3.0,
            &RootConfig::default(),
        )
        .unwrap();
        assert!((r.x - 2.094_551_481_542_327).abs() < 1e-8);
    }

    #[test]
    fn illinois_rejects_unbracketed() {
        let err = illinois::<_, SolverError>("sq", |x| Ok(x * x + 1.0), -1.0, 1.0, &RootConfig::default())
            .unwrap_err();
        assert!(matches!(err, SolverError::NotBracketed { .. }));
    }

    #[test]
    fn iteration_bound_reports_residual() {
        let config = RootConfig {
            max_iterations: 2,
            f_tol: 1e-300,
            x_tol: 0.0,
        };
        let err = illinois::<_, SolverError>("slow", |x: f64| Ok(x.powi(9) - 0.5), 0.0, 1.0, &config)
            .unwrap_err();
        match err {
            SolverError::ConvergenceFailed {
                iterations,
                residual,
                ..
            } => {
                assert_eq!(iterations, 2);
                assert!(residual.is_finite());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn callback_errors_propagate() {
        let res: SolverResult<RootResult> = illinois(
            "fails",
            |_| Err(SolverError::Numeric { what: "boom" }),
            0.0,
            1.0,
            &RootConfig::default(),
        );
        assert!(matches!(res, Err(SolverError::Numeric { what: "boom" })));
    }

    proptest! {
        #[test]
        fn bracket_expansion_reaches_distant_root(root in -400.0f64..400.0, x0 in -50.0f64..50.0) {
            let r = bracket_and_solve::<_, SolverError>(
                "linear",
                |x| Ok(3.0 * (x - root)),
                x0,
                1.0,
                20,
                &RootConfig::default(),
            )
            .unwrap();
            prop_assert!((r.x - root).abs() < 1e-6);
        }
    }
}
