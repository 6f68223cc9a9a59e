//! Acid-base balance (Stewart-style strong ion model).
//!
//! Hydrogen ion concentration is the root of the net charge balance over
//! strong ions, the CO2/bicarbonate/carbonate system, water and the weak acid
//! buffers (albumin, phosphate). Concentrations are mmol/L throughout, so
//! `ph = -log10(hp / 1000)`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::brent::{BrentConfig, find_root};
use crate::error::ChemResult;

/// Dissociation constants and search bracket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcidBaseConstants {
    /// Water ion product
    pub kw: f64,
    /// First dissociation constant of carbonic acid
    pub kc: f64,
    /// Second dissociation constant of carbonic acid
    pub kd: f64,
    /// CO2 solubility in plasma (mmol/L/mmHg)
    pub alpha_co2p: f64,
    /// Lower bound of the hydrogen ion search (mmol/L, pH ~ 8.23)
    pub hp_lower: f64,
    /// Upper bound of the hydrogen ion search (mmol/L, pH 6.5)
    pub hp_upper: f64,
}

impl Default for AcidBaseConstants {
    fn default() -> Self {
        Self {
            kw: 2.5119e-11,
            kc: 7.94328235e-4,
            kd: 6.0255959e-8,
            alpha_co2p: 0.03067,
            hp_lower: 5.848931925e-6,
            hp_upper: 3.16227766017e-4,
        }
    }
}

/// Conserved quantities the balance is solved from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AcidBaseInput {
    /// Total CO2 (mmol/L)
    pub tco2: f64,
    /// Strong ion difference (mEq/L)
    pub sid: f64,
    /// Albumin (g/L)
    pub albumin: f64,
    /// Inorganic phosphates (mmol/L)
    pub phosphates: f64,
    /// Unmeasured anions (mEq/L)
    pub uma: f64,
    /// Hemoglobin (mmol/L)
    pub hemoglobin: f64,
}

impl AcidBaseInput {
    /// Gather inputs from a solute table. Missing solutes read as zero.
    pub fn from_solutes(tco2: f64, solutes: &BTreeMap<String, f64>) -> Self {
        let get = |key: &str| solutes.get(key).copied().unwrap_or(0.0);
        Self {
            tco2,
            sid: strong_ion_difference(solutes),
            albumin: get("albumin"),
            phosphates: get("phosphates"),
            uma: get("uma"),
            hemoglobin: get("hemoglobin"),
        }
    }
}

/// Strong ion difference `na + k + 2ca + 2mg - cl - lact`.
pub fn strong_ion_difference(solutes: &BTreeMap<String, f64>) -> f64 {
    let get = |key: &str| solutes.get(key).copied().unwrap_or(0.0);
    get("na") + get("k") + 2.0 * get("ca") + 2.0 * get("mg") - get("cl") - get("lact")
}

/// Solved acid-base state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcidBase {
    pub ph: f64,
    /// mmHg
    pub pco2: f64,
    /// mmol/L
    pub hco3: f64,
    /// mmol/L
    pub be: f64,
    /// Hydrogen ion concentration (mmol/L)
    pub hp: f64,
}

/// Intermediate species for a trial hydrogen ion concentration.
#[derive(Debug, Clone, Copy)]
struct Species {
    ph: f64,
    cco2p: f64,
    hco3: f64,
    co3: f64,
    oh: f64,
}

fn species(hp: f64, tco2: f64, k: &AcidBaseConstants) -> Species {
    let ph = -(hp / 1000.0).log10();
    let cco2p = tco2 / (1.0 + k.kc / hp + (k.kc * k.kd) / (hp * hp));
    let hco3 = (k.kc * cco2p) / hp;
    let co3 = (k.kd * hco3) / hp;
    let oh = k.kw / hp;
    Species {
        ph,
        cco2p,
        hco3,
        co3,
        oh,
    }
}

fn weak_acid_charge(ph: f64, albumin: f64, phosphates: f64) -> f64 {
    albumin * (0.123 * ph - 0.631) + phosphates * (0.309 * ph - 0.469)
}

/// Net charge of the plasma for a trial hydrogen ion concentration.
///
/// Monotonically increasing in `hp`, zero at the equilibrium.
pub fn net_charge(hp: f64, input: &AcidBaseInput, k: &AcidBaseConstants) -> f64 {
    let s = species(hp, input.tco2, k);
    let a_base = weak_acid_charge(s.ph, input.albumin, input.phosphates);
    hp + input.sid - s.hco3 - 2.0 * s.co3 - s.oh - a_base - input.uma
}

/// Van Slyke base excess.
pub fn base_excess(hco3: f64, ph: f64, hemoglobin: f64) -> f64 {
    (hco3 - 25.1 + (2.3 * hemoglobin + 7.7) * (ph - 7.4)) * (1.0 - 0.023 * hemoglobin)
}

/// Solve the charge balance for hydrogen ions and derive pH, pCO2, HCO3, BE.
pub fn solve_acid_base(
    input: &AcidBaseInput,
    k: &AcidBaseConstants,
    config: &BrentConfig,
) -> ChemResult<AcidBase> {
    let root = find_root(|hp| net_charge(hp, input, k), k.hp_lower, k.hp_upper, config)?;
    let s = species(root.x, input.tco2, k);
    Ok(AcidBase {
        ph: s.ph,
        pco2: s.cco2p / k.alpha_co2p,
        hco3: s.hco3,
        be: base_excess(s.hco3, s.ph, input.hemoglobin),
        hp: root.x,
    })
}

/// Total CO2 that corresponds to a given pH and pCO2.
pub fn total_co2(ph: f64, pco2: f64, k: &AcidBaseConstants) -> f64 {
    let hp = 1000.0 * 10f64.powf(-ph);
    let cco2p = pco2 * k.alpha_co2p;
    cco2p * (1.0 + k.kc / hp + (k.kc * k.kd) / (hp * hp))
}

/// Strong ion difference that balances a given pH and pCO2.
pub fn balancing_sid(
    ph: f64,
    pco2: f64,
    albumin: f64,
    phosphates: f64,
    uma: f64,
    k: &AcidBaseConstants,
) -> f64 {
    let hp = 1000.0 * 10f64.powf(-ph);
    let s = species(hp, total_co2(ph, pco2, k), k);
    s.hco3 + 2.0 * s.co3 + s.oh + weak_acid_charge(ph, albumin, phosphates) + uma - hp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChemError;

    fn plasma(ph: f64, pco2: f64) -> AcidBaseInput {
        let k = AcidBaseConstants::default();
        AcidBaseInput {
            tco2: total_co2(ph, pco2, &k),
            sid: balancing_sid(ph, pco2, 25.0, 1.64, 3.0, &k),
            albumin: 25.0,
            phosphates: 1.64,
            uma: 3.0,
            hemoglobin: 8.0,
        }
    }

    #[test]
    fn normal_plasma_round_trip() {
        let k = AcidBaseConstants::default();
        let ab = solve_acid_base(&plasma(7.4, 40.0), &k, &BrentConfig::default()).unwrap();
        assert!((ab.ph - 7.4).abs() < 1e-4);
        assert!((ab.pco2 - 40.0).abs() < 1e-4);
        assert!((ab.hco3 - 24.5).abs() < 0.1, "hco3 = {}", ab.hco3);
    }

    #[test]
    fn normal_plasma_has_near_zero_base_excess() {
        let k = AcidBaseConstants::default();
        let ab = solve_acid_base(&plasma(7.4, 40.0), &k, &BrentConfig::default()).unwrap();
        assert!(ab.be.abs() < 1.0, "be = {}", ab.be);
    }

    #[test]
    fn net_charge_increases_with_hydrogen_ions() {
        let k = AcidBaseConstants::default();
        let input = plasma(7.4, 40.0);
        let mut last = net_charge(k.hp_lower, &input, &k);
        for i in 1..50 {
            let hp = k.hp_lower + (k.hp_upper - k.hp_lower) * i as f64 / 50.0;
            let q = net_charge(hp, &input, &k);
            assert!(q > last);
            last = q;
        }
    }

    #[test]
    fn impossible_plasma_is_not_bracketed() {
        let k = AcidBaseConstants::default();
        let input = AcidBaseInput {
            tco2: 24.0,
            sid: 10_000.0,
            ..AcidBaseInput::default()
        };
        let err = solve_acid_base(&input, &k, &BrentConfig::default()).unwrap_err();
        assert!(matches!(err, ChemError::NotBracketed { .. }));
    }

    #[test]
    fn sid_from_solute_table() {
        let solutes: BTreeMap<String, f64> = [
            ("na", 138.0),
            ("k", 3.5),
            ("ca", 1.0),
            ("mg", 0.75),
            ("cl", 108.0),
            ("lact", 1.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        assert!((strong_ion_difference(&solutes) - 36.0).abs() < 1e-12);
        let input = AcidBaseInput::from_solutes(24.0, &solutes);
        assert_eq!(input.albumin, 0.0);
        assert_eq!(input.tco2, 24.0);
    }
}
