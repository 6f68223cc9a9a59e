//! Blood-carrying compartments.
//!
//! Blood content is carried as conserved per-volume quantities (total O2,
//! total CO2, solutes) that mix on inflow. Blood gas values are derived on
//! demand by the equilibrium solver and kept stale when it fails.

use std::collections::BTreeMap;

use ex_chem::acid_base::{AcidBaseConstants, AcidBaseInput, solve_acid_base};
use ex_chem::oxygen::{DEFAULT_DPG, OxygenInput, solve_oxygenation};
use ex_chem::BrentConfig;
use serde::Serialize;

use crate::capacitance::{Capacitance, volume_function};
use crate::common::{blend, withdraw};
use crate::error::{ComponentError, ComponentResult};
use crate::factors::Scaling;
use crate::property::{
    Properties, PropertyValue, chain_set, number, table_get, table_set,
};
use crate::time_varying::TimeVaryingElastance;
use crate::traits::{Behavior, Compartment, StepContext};

/// Factor sources of blood compartments.
const BLOOD_SOURCES: [(&str, Scaling); 3] = [
    ("circ", Scaling::Unit),
    ("ans", Scaling::Activity),
    ("drug", Scaling::Unit),
];

/// Value of derived blood gas fields that were never solved.
pub const UNSOLVED: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloodContent {
    /// Total O2 (mmol/L)
    pub to2: f64,
    /// Total CO2 (mmol/L)
    pub tco2: f64,
    /// Solute concentrations by name (mmol/L, albumin g/L)
    pub solutes: BTreeMap<String, f64>,
    /// degC
    pub temp: f64,
    /// cP
    pub viscosity: f64,
    pub ph: f64,
    pub pco2: f64,
    pub po2: f64,
    /// Percent
    pub so2: f64,
    pub hco3: f64,
    pub be: f64,
    #[serde(rename = "_solver_failures")]
    pub solver_failures: u64,
}

impl Default for BloodContent {
    fn default() -> Self {
        Self {
            to2: 0.0,
            tco2: 0.0,
            solutes: BTreeMap::new(),
            temp: 37.0,
            viscosity: 6.0,
            ph: UNSOLVED,
            pco2: UNSOLVED,
            po2: UNSOLVED,
            so2: UNSOLVED,
            hco3: UNSOLVED,
            be: UNSOLVED,
            solver_failures: 0,
        }
    }
}

impl BloodContent {
    /// Mix `dvol` liters of `source` into a compartment now holding `vol`.
    ///
    /// A solute missing on either side counts as zero there.
    pub fn blend_from(&mut self, source: &BloodContent, dvol: f64, vol: f64) {
        self.to2 = blend(self.to2, source.to2, dvol, vol);
        self.tco2 = blend(self.tco2, source.tco2, dvol, vol);
        for (name, conc) in self.solutes.iter_mut() {
            *conc = blend(*conc, source.solute(name), dvol, vol);
        }
        for (name, src) in &source.solutes {
            if !self.solutes.contains_key(name) {
                self.solutes
                    .insert(name.clone(), blend(0.0, *src, dvol, vol));
            }
        }
    }

    pub fn solute(&self, name: &str) -> f64 {
        self.solutes.get(name).copied().unwrap_or(0.0)
    }

    /// Derive pH, pCO2, HCO3, BE, pO2 and SO2 from the conserved quantities.
    ///
    /// Fields are only overwritten by a successful solve. Oxygen uses the
    /// fresh pH/BE when acid-base succeeded and the stored ones otherwise.
    /// The first failure is returned after both solves were attempted.
    pub fn update_composition(&mut self) -> ComponentResult<()> {
        let config = BrentConfig::default();
        let input = AcidBaseInput::from_solutes(self.tco2, &self.solutes);
        let acid_base = solve_acid_base(&input, &AcidBaseConstants::default(), &config);
        if let Ok(ab) = &acid_base {
            self.ph = ab.ph;
            self.pco2 = ab.pco2;
            self.hco3 = ab.hco3;
            self.be = ab.be;
        }

        let oxygen = solve_oxygenation(
            &OxygenInput {
                to2: self.to2,
                hemoglobin: self.solute("hemoglobin"),
                temp: self.temp,
                ph: self.ph,
                be: self.be,
                dpg: self.solutes.get("dpg").copied().unwrap_or(DEFAULT_DPG),
            },
            &config,
        );
        if let Ok(ox) = &oxygen {
            self.po2 = ox.po2;
            self.so2 = ox.so2;
        }

        let result = acid_base.map(|_| ()).and(oxygen.map(|_| ()));
        if result.is_err() {
            self.solver_failures += 1;
        }
        result.map_err(ComponentError::from)
    }

    fn field(&self, key: &str) -> Option<f64> {
        Some(match key {
            "to2" => self.to2,
            "tco2" => self.tco2,
            "temp" => self.temp,
            "viscosity" => self.viscosity,
            "ph" => self.ph,
            "pco2" => self.pco2,
            "po2" => self.po2,
            "so2" => self.so2,
            "hco3" => self.hco3,
            "be" => self.be,
            "_solver_failures" => self.solver_failures as f64,
            _ => return None,
        })
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut f64> {
        Some(match key {
            "to2" => &mut self.to2,
            "tco2" => &mut self.tco2,
            "temp" => &mut self.temp,
            "viscosity" => &mut self.viscosity,
            "ph" => &mut self.ph,
            "pco2" => &mut self.pco2,
            "po2" => &mut self.po2,
            "so2" => &mut self.so2,
            "hco3" => &mut self.hco3,
            "be" => &mut self.be,
            _ => return None,
        })
    }
}

impl Properties for BloodContent {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        match (key, sub) {
            ("solutes", sub) => table_get(&self.solutes, sub),
            (_, None) => self.field(key).map(PropertyValue::Number),
            _ => None,
        }
    }

    fn set_property(
        &mut self,
        key: &str,
        sub: Option<&str>,
        value: &PropertyValue,
    ) -> ComponentResult<()> {
        if key == "solutes" {
            return table_set(&mut self.solutes, key, sub, value);
        }
        match (sub, self.field_mut(key)) {
            (None, Some(slot)) => {
                *slot = number(key, value)?;
                Ok(())
            }
            _ => Err(ComponentError::unknown(key)),
        }
    }
}

/// Elastic vessel filled with blood.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloodCapacitance {
    #[serde(flatten)]
    pub vessel: Capacitance,
    #[serde(flatten)]
    pub blood: BloodContent,
}

impl Default for BloodCapacitance {
    fn default() -> Self {
        Self {
            vessel: Capacitance::with_sources(&BLOOD_SOURCES),
            blood: BloodContent::default(),
        }
    }
}

impl Properties for BloodCapacitance {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        self.vessel
            .property(key, sub)
            .or_else(|| self.blood.property(key, sub))
    }

    fn set_property(
        &mut self,
        key: &str,
        sub: Option<&str>,
        value: &PropertyValue,
    ) -> ComponentResult<()> {
        chain_set(self.vessel.set_property(key, sub, value), || {
            self.blood.set_property(key, sub, value)
        })
    }
}

impl Behavior for BloodCapacitance {
    fn step(&mut self, _ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        self.vessel.update_elastances();
        self.vessel.update_pressure();
        Ok(())
    }

    fn call(&mut self, function: &str, args: &[PropertyValue]) -> ComponentResult<()> {
        match function {
            "calc_blood_composition" => self.blood.update_composition(),
            _ => volume_function(self, function, args),
        }
    }
}

impl Compartment for BloodCapacitance {
    fn volume(&self) -> f64 {
        self.vessel.vol
    }

    fn pressure(&self) -> f64 {
        self.vessel.pres
    }

    fn volume_in(&mut self, dvol: f64, source: &dyn Compartment) {
        self.vessel.vol += dvol;
        if self.vessel.vol > 0.0 {
            if let Some(src) = source.blood() {
                self.blood.blend_from(src, dvol, self.vessel.vol);
            }
        }
    }

    fn volume_out(&mut self, dvol: f64) -> f64 {
        withdraw(&mut self.vessel.vol, dvol)
    }

    fn add_external_pressure(&mut self, pres: f64) {
        self.vessel.pres_ext += pres;
    }

    fn blood(&self) -> Option<&BloodContent> {
        Some(&self.blood)
    }

    fn blood_mut(&mut self) -> Option<&mut BloodContent> {
        Some(&mut self.blood)
    }
}

/// Heart chamber filled with blood.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloodTimeVaryingElastance {
    #[serde(flatten)]
    pub chamber: TimeVaryingElastance,
    #[serde(flatten)]
    pub blood: BloodContent,
}

impl Default for BloodTimeVaryingElastance {
    fn default() -> Self {
        Self {
            chamber: TimeVaryingElastance::with_sources(
                &BLOOD_SOURCES,
                &[("mob", Scaling::Unit)],
            ),
            blood: BloodContent::default(),
        }
    }
}

impl Properties for BloodTimeVaryingElastance {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        self.chamber
            .property(key, sub)
            .or_else(|| self.blood.property(key, sub))
    }

    fn set_property(
        &mut self,
        key: &str,
        sub: Option<&str>,
        value: &PropertyValue,
    ) -> ComponentResult<()> {
        chain_set(self.chamber.set_property(key, sub, value), || {
            self.blood.set_property(key, sub, value)
        })
    }
}

impl Behavior for BloodTimeVaryingElastance {
    fn step(&mut self, _ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        self.chamber.update_elastances();
        self.chamber.update_pressure();
        Ok(())
    }

    fn call(&mut self, function: &str, args: &[PropertyValue]) -> ComponentResult<()> {
        match function {
            "calc_blood_composition" => self.blood.update_composition(),
            _ => volume_function(self, function, args),
        }
    }
}

impl Compartment for BloodTimeVaryingElastance {
    fn volume(&self) -> f64 {
        self.chamber.vol
    }

    fn pressure(&self) -> f64 {
        self.chamber.pres
    }

    fn volume_in(&mut self, dvol: f64, source: &dyn Compartment) {
        self.chamber.vol += dvol;
        if self.chamber.vol > 0.0 {
            if let Some(src) = source.blood() {
                self.blood.blend_from(src, dvol, self.chamber.vol);
            }
        }
    }

    fn volume_out(&mut self, dvol: f64) -> f64 {
        withdraw(&mut self.chamber.vol, dvol)
    }

    fn add_external_pressure(&mut self, pres: f64) {
        self.chamber.pres_ext += pres;
    }

    fn blood(&self) -> Option<&BloodContent> {
        Some(&self.blood)
    }

    fn blood_mut(&mut self) -> Option<&mut BloodContent> {
        Some(&mut self.blood)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ex_chem::acid_base::{balancing_sid, total_co2};
    use ex_chem::oxygen::{oxygen_content, saturation};

    fn arterial_blood() -> BloodContent {
        let k = AcidBaseConstants::default();
        let mut blood = BloodContent {
            tco2: total_co2(7.4, 40.0, &k),
            ..BloodContent::default()
        };
        blood.solutes.insert("na".into(), balancing_sid(7.4, 40.0, 25.0, 1.64, 3.0, &k));
        blood.solutes.insert("albumin".into(), 25.0);
        blood.solutes.insert("phosphates".into(), 1.64);
        blood.solutes.insert("uma".into(), 3.0);
        blood.solutes.insert("hemoglobin".into(), 8.0);
        let so2 = saturation(95.0, 37.0, 7.4, -0.5, DEFAULT_DPG);
        blood.to2 = oxygen_content(95.0, so2, 8.0, 37.0);
        blood
    }

    #[test]
    fn composition_recovers_blood_gas() {
        let mut blood = arterial_blood();
        blood.update_composition().unwrap();
        assert!((blood.ph - 7.4).abs() < 1e-4);
        assert!((blood.pco2 - 40.0).abs() < 1e-4);
        assert!(blood.so2 > 90.0 && blood.so2 < 100.0);
        assert!((blood.po2 - 95.0).abs() < 2.0, "po2 = {}", blood.po2);
        assert_eq!(blood.solver_failures, 0);
    }

    #[test]
    fn failed_solve_keeps_stale_values() {
        let mut blood = arterial_blood();
        blood.update_composition().unwrap();
        let before = blood.clone();

        blood.solutes.insert("na".into(), 10_000.0);
        blood.to2 = 1_000.0;
        assert!(blood.update_composition().is_err());
        assert_eq!(blood.ph, before.ph);
        assert_eq!(blood.pco2, before.pco2);
        assert_eq!(blood.po2, before.po2);
        assert_eq!(blood.so2, before.so2);
        assert_eq!(blood.solver_failures, 1);
    }

    #[test]
    fn unsolved_fields_start_at_sentinel() {
        let blood = BloodContent::default();
        assert_eq!(blood.ph, UNSOLVED);
        assert_eq!(blood.so2, UNSOLVED);
    }

    #[test]
    fn inflow_mixes_solutes() {
        let mut source = BloodCapacitance::default();
        source.blood.to2 = 8.0;
        source.blood.solutes.insert("na".into(), 140.0);
        source.blood.solutes.insert("lact".into(), 4.0);

        let mut dest = BloodCapacitance::default();
        dest.vessel.vol = 0.5;
        dest.blood.to2 = 4.0;
        dest.blood.solutes.insert("na".into(), 130.0);

        dest.volume_in(0.5, &source);
        assert_eq!(dest.vessel.vol, 1.0);
        assert!((dest.blood.to2 - 6.0).abs() < 1e-12);
        assert!((dest.blood.solute("na") - 135.0).abs() < 1e-12);
        assert!((dest.blood.solute("lact") - 2.0).abs() < 1e-12);
    }

    #[test]
    fn inflow_without_a_solute_dilutes_it() {
        let source = BloodCapacitance::default();
        let mut dest = BloodCapacitance::default();
        dest.vessel.vol = 0.5;
        dest.blood.solutes.insert("lact".into(), 4.0);

        dest.volume_in(0.5, &source);
        assert!((dest.blood.solute("lact") - 2.0).abs() < 1e-12);
        assert!((dest.blood.solute("lact") * dest.vessel.vol - 2.0).abs() < 1e-12);
    }

    #[test]
    fn solute_paths() {
        let mut c = BloodCapacitance::default();
        c.set_property("solutes", Some("na"), &138.0.into()).unwrap();
        assert_eq!(c.property("solutes", Some("na")), Some(PropertyValue::Number(138.0)));
        c.set_property("el_base_ans_factor", None, &1.2.into()).unwrap();
        assert_eq!(c.property("el_base_ans_factor", None), Some(PropertyValue::Number(1.2)));
        assert!(c.set_property("el_base_resp_factor", None, &1.2.into()).is_err());
    }

    #[test]
    fn ans_factor_is_weighted_by_activity() {
        let mut c = BloodCapacitance::default();
        c.vessel.el_base = 100.0;
        c.vessel.ans_activity_factor = 0.5;
        c.set_property("el_base_ans_factor", None, &2.0.into()).unwrap();
        c.set_property("el_base_circ_factor", None, &2.0.into()).unwrap();
        c.vessel.update_elastances();
        assert!((c.vessel.el_eff - 250.0).abs() < 1e-12);
    }

    #[test]
    fn chamber_calls_solver() {
        let mut lv = BloodTimeVaryingElastance::default();
        lv.blood = arterial_blood();
        lv.call("calc_blood_composition", &[]).unwrap();
        assert!((lv.blood.ph - 7.4).abs() < 1e-4);
        assert!(lv.property("el_max_mob_factor", None).is_some());
    }
}
