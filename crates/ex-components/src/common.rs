//! Common utilities for component calculations.

use ex_core::numeric::ensure_finite;

/// Flow across `resistance` for a pressure drop `dp`.
///
/// `None` when the resistance is not positive or the ratio is not finite;
/// callers skip the transfer for that step.
#[inline]
pub fn pressure_flow(dp: f64, resistance: f64) -> Option<f64> {
    if resistance > 0.0 {
        ensure_finite(dp / resistance, "pressure flow").ok()
    } else {
        None
    }
}

/// Move a per-volume quantity toward the source value after `dvol` of inflow.
///
/// `vol` is the volume after the inflow and must be positive.
#[inline]
pub fn blend(current: f64, source: f64, dvol: f64, vol: f64) -> f64 {
    current + (source - current) * dvol / vol
}

/// Remove `dvol` from `vol`, clamping at zero.
///
/// Returns the part of `dvol` that could not be removed.
#[inline]
pub fn withdraw(vol: &mut f64, dvol: f64) -> f64 {
    *vol -= dvol;
    if *vol < 0.0 {
        let not_removed = -*vol;
        *vol = 0.0;
        not_removed
    } else {
        0.0
    }
}

/// Concentration after adding `amount` (mmol) to `vol` liters.
///
/// Zero volume leaves the concentration untouched.
#[inline]
pub fn add_amount(conc: f64, amount: f64, vol: f64) -> f64 {
    if vol > 0.0 {
        (conc * vol + amount) / vol
    } else {
        conc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend() {
        assert_eq!(blend(10.0, 20.0, 0.5, 1.0), 15.0);
        assert_eq!(blend(10.0, 20.0, 0.0, 1.0), 10.0);
    }

    #[test]
    fn test_withdraw_clamps() {
        let mut vol = 0.1;
        let rest = withdraw(&mut vol, 0.3);
        assert_eq!(vol, 0.0);
        assert!((rest - 0.2).abs() < 1e-15);

        let mut vol = 1.0;
        assert_eq!(withdraw(&mut vol, 0.25), 0.0);
        assert_eq!(vol, 0.75);
    }

    #[test]
    fn test_add_amount() {
        assert_eq!(add_amount(2.0, 1.0, 0.5), 4.0);
        assert_eq!(add_amount(2.0, 1.0, 0.0), 2.0);
    }

    #[test]
    fn test_pressure_flow_guards_ratio() {
        assert_eq!(pressure_flow(10.0, 2.0), Some(5.0));
        assert_eq!(pressure_flow(-10.0, 2.0), Some(-5.0));
        assert_eq!(pressure_flow(10.0, 0.0), None);
        assert_eq!(pressure_flow(0.0, 0.0), None);
        assert_eq!(pressure_flow(10.0, -1.0), None);
        assert_eq!(pressure_flow(f64::MAX, f64::MIN_POSITIVE), None);
    }
}
