//! Oxygen content and hemoglobin saturation.
//!
//! Total oxygen is dissolved O2 plus hemoglobin-bound O2. Saturation follows a
//! sigmoid dissociation curve shifted by pH, base excess, temperature and
//! 2,3-DPG. pO2 is found by inverting total O2 content with Brent's method.

use ex_core::{GAS_CONSTANT, kelvin_from_celsius};
use serde::{Deserialize, Serialize};

use crate::brent::{BrentConfig, find_root};
use crate::error::ChemResult;

/// pO2 search bracket (mmHg).
pub const PO2_LOWER: f64 = 0.01;
pub const PO2_UPPER: f64 = 800.0;

/// Default 2,3-DPG concentration (mmol/L).
pub const DEFAULT_DPG: f64 = 5.0;

/// Inputs for one oxygenation solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OxygenInput {
    /// Total O2 (mmol/L)
    pub to2: f64,
    /// Hemoglobin (mmol/L)
    pub hemoglobin: f64,
    /// Blood temperature (degC)
    pub temp: f64,
    pub ph: f64,
    /// Base excess (mmol/L)
    pub be: f64,
    /// 2,3-DPG (mmol/L)
    pub dpg: f64,
}

/// Solved oxygenation state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oxygenation {
    /// mmHg
    pub po2: f64,
    /// Saturation in percent
    pub so2: f64,
}

/// Hemoglobin saturation as a fraction for a given pO2.
pub fn saturation(po2: f64, temp: f64, ph: f64, be: f64, dpg: f64) -> f64 {
    let a = 1.04 * (7.4 - ph) + 0.005 * be + 0.07 * (dpg - 5.0);
    let b = 0.055 * (kelvin_from_celsius(temp) - 310.15);
    let x0 = 1.875 + a + b;
    let h0 = 3.5 + a;
    let x = (po2 * 0.1333).ln();
    let y = x - x0 + h0 * (0.5343 * (x - x0)).tanh() + 1.875;
    1.0 / ((-y).exp() + 1.0)
}

/// Total O2 content (mmol/L) for a pO2 and saturation fraction.
pub fn oxygen_content(po2: f64, so2: f64, hemoglobin: f64, temp: f64) -> f64 {
    let ml_per_l = (0.0031 * po2 + 1.36 * (hemoglobin / 0.6206) * so2) * 10.0;
    let molar_volume = GAS_CONSTANT * kelvin_from_celsius(temp) / 760.0;
    ml_per_l / molar_volume
}

/// Find the pO2 whose total content matches `input.to2`.
pub fn solve_oxygenation(input: &OxygenInput, config: &BrentConfig) -> ChemResult<Oxygenation> {
    let residual = |po2: f64| {
        let so2 = saturation(po2, input.temp, input.ph, input.be, input.dpg);
        input.to2 - oxygen_content(po2, so2, input.hemoglobin, input.temp)
    };
    let root = find_root(residual, PO2_LOWER, PO2_UPPER, config)?;
    let so2 = saturation(root.x, input.temp, input.ph, input.be, input.dpg);
    Ok(Oxygenation {
        po2: root.x,
        so2: so2 * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChemError;

    fn arterial(to2: f64) -> OxygenInput {
        OxygenInput {
            to2,
            hemoglobin: 8.0,
            temp: 37.0,
            ph: 7.4,
            be: 0.0,
            dpg: DEFAULT_DPG,
        }
    }

    #[test]
    fn arterial_saturation_is_high() {
        let so2 = saturation(100.0, 37.0, 7.4, 0.0, DEFAULT_DPG);
        assert!(so2 > 0.97 && so2 < 0.99, "so2 = {so2}");
    }

    #[test]
    fn acidosis_shifts_curve_right() {
        let normal = saturation(40.0, 37.0, 7.4, 0.0, DEFAULT_DPG);
        let acidotic = saturation(40.0, 37.0, 7.1, 0.0, DEFAULT_DPG);
        assert!(acidotic < normal);
    }

    #[test]
    fn fever_shifts_curve_right() {
        let normal = saturation(40.0, 37.0, 7.4, 0.0, DEFAULT_DPG);
        let febrile = saturation(40.0, 40.0, 7.4, 0.0, DEFAULT_DPG);
        assert!(febrile < normal);
    }

    #[test]
    fn content_round_trip() {
        for po2 in [20.0, 40.0, 75.0, 100.0, 400.0] {
            let so2 = saturation(po2, 37.0, 7.4, 0.0, DEFAULT_DPG);
            let to2 = oxygen_content(po2, so2, 8.0, 37.0);
            let solved = solve_oxygenation(&arterial(to2), &BrentConfig::default()).unwrap();
            assert!((solved.po2 - po2).abs() < 1e-2, "po2 {po2} -> {}", solved.po2);
            assert!((solved.so2 - so2 * 100.0).abs() < 1e-2);
        }
    }

    #[test]
    fn oversaturated_content_is_not_bracketed() {
        let err = solve_oxygenation(&arterial(1_000.0), &BrentConfig::default()).unwrap_err();
        assert!(matches!(err, ChemError::NotBracketed { .. }));
    }
}
