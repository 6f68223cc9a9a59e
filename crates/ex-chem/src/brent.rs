//! Brent's method for bracketed scalar roots.
//!
//! Inverse quadratic interpolation or secant steps are taken while they stay
//! inside the bracket and shrink it fast enough; otherwise the step falls back
//! to bisection. Convergence is declared on the residual (`f_tol`) or on the
//! bracket width (`x_tol`, plus a machine-epsilon floor).

use crate::error::{ChemError, ChemResult};
use ex_core::ensure_finite;

/// Brent solver configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrentConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance on |f(x)|
    pub f_tol: f64,
    /// Absolute tolerance on the bracket width
    pub x_tol: f64,
}

impl Default for BrentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            f_tol: 1e-6,
            x_tol: 0.0,
        }
    }
}

/// Converged root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrentRoot {
    pub x: f64,
    /// Residual at `x`
    pub residual: f64,
    pub iterations: usize,
}

/// Find a root of `f` in `[lower, upper]`.
///
/// `f(lower)` and `f(upper)` must have opposite signs (or one of them must be
/// zero), otherwise [`ChemError::NotBracketed`] is returned.
pub fn find_root<F>(mut f: F, lower: f64, upper: f64, config: &BrentConfig) -> ChemResult<BrentRoot>
where
    F: FnMut(f64) -> f64,
{
    let mut a = ensure_finite(lower, "brent lower bound")?;
    let mut b = ensure_finite(upper, "brent upper bound")?;
    let mut fa = ensure_finite(f(a), "brent f(lower)")?;
    let mut fb = ensure_finite(f(b), "brent f(upper)")?;

    if fa == 0.0 {
        return Ok(BrentRoot {
            x: a,
            residual: 0.0,
            iterations: 0,
        });
    }
    if fb == 0.0 {
        return Ok(BrentRoot {
            x: b,
            residual: 0.0,
            iterations: 0,
        });
    }
    if fa.signum() == fb.signum() {
        return Err(ChemError::NotBracketed {
            lower,
            upper,
            f_lower: fa,
            f_upper: fb,
        });
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for iter in 0..config.max_iterations {
        if fb.signum() == fc.signum() {
            // keep the root between b and c
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * config.x_tol;
        let xm = 0.5 * (c - b);
        if fb.abs() < config.f_tol || xm.abs() <= tol1 {
            return Ok(BrentRoot {
                x: b,
                residual: fb,
                iterations: iter,
            });
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                // secant
                (2.0 * xm * s, 1.0 - s)
            } else {
                // inverse quadratic interpolation
                let qa = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * qa * (qa - r) - (b - a) * (r - 1.0)),
                    (qa - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        if d.abs() > tol1 {
            b += d;
        } else {
            b += tol1.copysign(xm);
        }
        fb = ensure_finite(f(b), "brent f(x)")?;
    }

    Err(ChemError::MaxIterations {
        iterations: config.max_iterations,
        x: b,
    })
}
