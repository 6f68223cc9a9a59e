use crate::CoreError;

/// Floating point type used throughout the kernel
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Round to a fixed number of decimals (sample timestamps use 4).
pub fn round_to(v: Real, decimals: i32) -> Real {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}

/// Number of whole fixed steps covering `duration`.
///
/// A duration that is an integer multiple of `dt` up to float noise maps to
/// exactly that multiple, anything longer rounds up.
pub fn steps_for(duration: Real, dt: Real) -> Result<usize, CoreError> {
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(CoreError::InvalidArg {
            what: "step size must be positive and finite",
        });
    }
    if !(duration >= 0.0) || !duration.is_finite() {
        return Err(CoreError::InvalidArg {
            what: "duration must be non-negative and finite",
        });
    }
    let ratio = duration / dt;
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= 1e-9 * nearest.max(1.0) {
        Ok(nearest as usize)
    } else {
        Ok(ratio.ceil() as usize)
    }
}
