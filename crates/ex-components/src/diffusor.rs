//! Non-flow links that exchange content between two compartments.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{ComponentError, ComponentResult};
use crate::factors::{FactorSet, Scaling};
use crate::property::{Properties, PropertyValue, number, table_get, table_set, text};
use crate::traits::{Behavior, StepContext};

/// Move `amount` out of side 1 and into side 2, as concentrations.
fn exchange(c1: &mut f64, v1: f64, c2: &mut f64, v2: f64, amount: f64) {
    *c1 = (*c1 * v1 - amount) / v1;
    *c2 = (*c2 * v2 + amount) / v2;
}

/// Diffusion between two blood compartments.
///
/// O2 and CO2 follow the partial-pressure gradient, solutes listed in
/// `dif_solutes` follow the concentration gradient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloodDiffusor {
    pub comp_blood1: String,
    pub comp_blood2: String,
    /// mmol/(mmHg·s)
    pub dif_o2: f64,
    /// mmol/(mmHg·s)
    pub dif_co2: f64,
    /// Per-solute diffusion constants (1/s)
    pub dif_solutes: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub factors: FactorSet,
}

impl Default for BloodDiffusor {
    fn default() -> Self {
        Self {
            comp_blood1: String::new(),
            comp_blood2: String::new(),
            dif_o2: 0.01,
            dif_co2: 0.01,
            dif_solutes: BTreeMap::new(),
            factors: FactorSet::new()
                .with("dif_o2_factor", Scaling::Unit)
                .with("dif_co2_factor", Scaling::Unit)
                .with("dif_solutes_factor", Scaling::Unit),
        }
    }
}

impl BloodDiffusor {
    fn effective(&self, base: f64, factor: &str) -> f64 {
        base * self.factors.get(factor).unwrap_or(1.0)
    }
}

impl Properties for BloodDiffusor {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        match (key, sub) {
            ("dif_solutes", sub) => table_get(&self.dif_solutes, sub),
            (_, Some(_)) => None,
            ("comp_blood1", None) => Some(PropertyValue::Text(self.comp_blood1.clone())),
            ("comp_blood2", None) => Some(PropertyValue::Text(self.comp_blood2.clone())),
            ("dif_o2", None) => Some(PropertyValue::Number(self.dif_o2)),
            ("dif_co2", None) => Some(PropertyValue::Number(self.dif_co2)),
            (key, None) => self.factors.get(key).map(PropertyValue::Number),
        }
    }

    fn set_property(
        &mut self,
        key: &str,
        sub: Option<&str>,
        value: &PropertyValue,
    ) -> ComponentResult<()> {
        match (key, sub) {
            ("dif_solutes", sub) => return table_set(&mut self.dif_solutes, key, sub, value),
            (_, Some(_)) => return Err(ComponentError::unknown(key)),
            ("comp_blood1", None) => self.comp_blood1 = text(key, value)?,
            ("comp_blood2", None) => self.comp_blood2 = text(key, value)?,
            ("dif_o2", None) => self.dif_o2 = number(key, value)?,
            ("dif_co2", None) => self.dif_co2 = number(key, value)?,
            (key, None) => {
                let v = number(key, value)?;
                if !self.factors.set(key, v) {
                    return Err(ComponentError::unknown(key));
                }
            }
        }
        Ok(())
    }
}

impl Behavior for BloodDiffusor {
    fn step(&mut self, ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        let dt = ctx.dt;
        let (c1, c2) = ctx.compartments(
            (self.comp_blood1.as_str(), "comp_blood1"),
            (self.comp_blood2.as_str(), "comp_blood2"),
        )?;
        let (v1, v2) = (c1.volume(), c2.volume());
        let b1 = c1
            .blood_mut()
            .ok_or_else(|| ComponentError::wrong_content(&self.comp_blood1, "comp_blood1", "blood"))?;
        let b2 = c2
            .blood_mut()
            .ok_or_else(|| ComponentError::wrong_content(&self.comp_blood2, "comp_blood2", "blood"))?;

        // a failed solve keeps the previous blood gas and is counted on the side itself
        if let Err(e) = b1.update_composition() {
            debug!(compartment = %self.comp_blood1, error = %e, "blood gas kept stale");
        }
        if let Err(e) = b2.update_composition() {
            debug!(compartment = %self.comp_blood2, error = %e, "blood gas kept stale");
        }

        if v1 == 0.0 || v2 == 0.0 {
            return Ok(());
        }

        let do2 = (b1.po2 - b2.po2) * self.effective(self.dif_o2, "dif_o2_factor") * dt;
        exchange(&mut b1.to2, v1, &mut b2.to2, v2, do2);

        let dco2 = (b1.pco2 - b2.pco2) * self.effective(self.dif_co2, "dif_co2_factor") * dt;
        exchange(&mut b1.tco2, v1, &mut b2.tco2, v2, dco2);

        let solutes_factor = self.factors.get("dif_solutes_factor").unwrap_or(1.0);
        for (name, dif) in &self.dif_solutes {
            let mut s1 = b1.solute(name);
            let mut s2 = b2.solute(name);
            let dsol = (s1 - s2) * dif * solutes_factor * dt;
            exchange(&mut s1, v1, &mut s2, v2, dsol);
            b1.solutes.insert(name.clone(), s1);
            b2.solutes.insert(name.clone(), s2);
        }
        Ok(())
    }
}

/// Diffusion between two gas compartments along partial-pressure gradients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasDiffusor {
    pub comp_gas1: String,
    pub comp_gas2: String,
    /// mmol/(mmHg·s)
    pub dif_o2: f64,
    pub dif_co2: f64,
    pub dif_n2: f64,
    pub dif_other: f64,
    #[serde(flatten)]
    pub factors: FactorSet,
}

impl Default for GasDiffusor {
    fn default() -> Self {
        Self {
            comp_gas1: String::new(),
            comp_gas2: String::new(),
            dif_o2: 0.01,
            dif_co2: 0.01,
            dif_n2: 0.01,
            dif_other: 0.01,
            factors: FactorSet::new()
                .with("dif_o2_factor", Scaling::Unit)
                .with("dif_co2_factor", Scaling::Unit)
                .with("dif_n2_factor", Scaling::Unit)
                .with("dif_other_factor", Scaling::Unit),
        }
    }
}

impl GasDiffusor {
    fn effective(&self, base: f64, factor: &str) -> f64 {
        base * self.factors.get(factor).unwrap_or(1.0)
    }
}

impl Properties for GasDiffusor {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        if sub.is_some() {
            return None;
        }
        let v = match key {
            "comp_gas1" => return Some(PropertyValue::Text(self.comp_gas1.clone())),
            "comp_gas2" => return Some(PropertyValue::Text(self.comp_gas2.clone())),
            "dif_o2" => self.dif_o2,
            "dif_co2" => self.dif_co2,
            "dif_n2" => self.dif_n2,
            "dif_other" => self.dif_other,
            _ => self.factors.get(key)?,
        };
        Some(PropertyValue::Number(v))
    }

    fn set_property(
        &mut self,
        key: &str,
        sub: Option<&str>,
        value: &PropertyValue,
    ) -> ComponentResult<()> {
        if sub.is_some() {
            return Err(ComponentError::unknown(key));
        }
        match key {
            "comp_gas1" => self.comp_gas1 = text(key, value)?,
            "comp_gas2" => self.comp_gas2 = text(key, value)?,
            "dif_o2" => self.dif_o2 = number(key, value)?,
            "dif_co2" => self.dif_co2 = number(key, value)?,
            "dif_n2" => self.dif_n2 = number(key, value)?,
            "dif_other" => self.dif_other = number(key, value)?,
            _ => {
                let v = number(key, value)?;
                if !self.factors.set(key, v) {
                    return Err(ComponentError::unknown(key));
                }
            }
        }
        Ok(())
    }
}

impl Behavior for GasDiffusor {
    fn step(&mut self, ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        let dt = ctx.dt;
        let (c1, c2) = ctx.compartments(
            (self.comp_gas1.as_str(), "comp_gas1"),
            (self.comp_gas2.as_str(), "comp_gas2"),
        )?;
        let (v1, p1) = (c1.volume(), c1.pressure());
        let (v2, p2) = (c2.volume(), c2.pressure());
        let g1 = c1
            .gas_mut()
            .ok_or_else(|| ComponentError::wrong_content(&self.comp_gas1, "comp_gas1", "gas"))?;
        let g2 = c2
            .gas_mut()
            .ok_or_else(|| ComponentError::wrong_content(&self.comp_gas2, "comp_gas2", "gas"))?;

        g1.update_partial_pressures(p1);
        g2.update_partial_pressures(p2);

        if v1 == 0.0 || v2 == 0.0 {
            return Ok(());
        }

        let do2 = (g1.po2 - g2.po2) * self.effective(self.dif_o2, "dif_o2_factor") * dt;
        exchange(&mut g1.co2, v1, &mut g2.co2, v2, do2);

        let dco2 = (g1.pco2 - g2.pco2) * self.effective(self.dif_co2, "dif_co2_factor") * dt;
        exchange(&mut g1.cco2, v1, &mut g2.cco2, v2, dco2);

        let dn2 = (g1.pn2 - g2.pn2) * self.effective(self.dif_n2, "dif_n2_factor") * dt;
        exchange(&mut g1.cn2, v1, &mut g2.cn2, v2, dn2);

        let dother =
            (g1.pother - g2.pother) * self.effective(self.dif_other, "dif_other_factor") * dt;
        exchange(&mut g1.cother, v1, &mut g2.cother, v2, dother);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blood::BloodCapacitance;
    use crate::gas::GasCapacitance;
    use crate::model::Model;
    use crate::testing::{TestNetwork, blood_at};
    use ex_chem::gas::InspiredGas;

    fn blood(vol: f64, po2: f64) -> Model {
        let mut b = BloodCapacitance::default();
        b.vessel.vol = vol;
        b.blood = blood_at(7.4, 40.0, po2);
        b.blood.solutes.insert("lact".into(), 1.0);
        Model::BloodCapacitance(b)
    }

    fn gas(vol: f64, fio2: f64) -> Model {
        let mut g = GasCapacitance::default();
        g.space.vol = vol;
        g.set_composition(&InspiredGas {
            fio2,
            ..InspiredGas::default()
        })
        .unwrap();
        Model::GasCapacitance(g)
    }

    fn blood_of<'a>(net: &'a TestNetwork, name: &str) -> &'a crate::blood::BloodContent {
        net.get(name).and_then(|m| m.as_compartment()).and_then(|c| c.blood()).unwrap()
    }

    fn gas_of<'a>(net: &'a TestNetwork, name: &str) -> &'a crate::gas::GasContent {
        net.get(name).and_then(|m| m.as_compartment()).and_then(|c| c.gas()).unwrap()
    }

    #[test]
    fn unsolvable_side_keeps_stale_blood_gas() {
        let mut net = TestNetwork::new(vec![
            ("A", blood(0.5, 95.0)),
            ("B", blood(0.25, 40.0)),
        ]);
        let mut d = BloodDiffusor {
            comp_blood1: "A".into(),
            comp_blood2: "B".into(),
            ..BloodDiffusor::default()
        };
        net.step(&mut d, 0.01).unwrap();
        let stale_ph = blood_of(&net, "B").ph;
        {
            let b = net
                .get_mut("B")
                .and_then(|m| m.as_compartment_mut())
                .and_then(|c| c.blood_mut())
                .unwrap();
            b.solutes.insert("na".into(), 10_000.0);
            b.to2 = 1_000.0;
        }

        net.step(&mut d, 0.01).unwrap();
        let b = blood_of(&net, "B");
        assert_eq!(b.ph, stale_ph);
        assert_eq!(b.solver_failures, 1);
        assert_eq!(blood_of(&net, "A").solver_failures, 0);
    }

    #[test]
    fn blood_diffusion_conserves_totals() {
        let mut net = TestNetwork::new(vec![
            ("A", blood(0.5, 95.0)),
            ("B", blood(0.25, 40.0)),
        ]);
        let mut d = BloodDiffusor {
            comp_blood1: "A".into(),
            comp_blood2: "B".into(),
            ..BloodDiffusor::default()
        };
        d.dif_solutes.insert("lact".into(), 0.1);
        net.get_mut("B")
            .and_then(|m| m.as_compartment_mut())
            .and_then(|c| c.blood_mut())
            .unwrap()
            .solutes
            .insert("lact".into(), 3.0);

        let a_before = blood_of(&net, "A").to2;
        let o2_before = a_before * 0.5 + blood_of(&net, "B").to2 * 0.25;
        let lact_before = 1.0 * 0.5 + 3.0 * 0.25;
        for _ in 0..10 {
            net.step(&mut d, 0.01).unwrap();
        }
        let (a, b) = (blood_of(&net, "A"), blood_of(&net, "B"));
        assert!((a.to2 * 0.5 + b.to2 * 0.25 - o2_before).abs() < 1e-9);
        assert!(a.to2 < a_before);
        assert!((a.solute("lact") * 0.5 + b.solute("lact") * 0.25 - lact_before).abs() < 1e-12);
        assert!(a.solute("lact") > 1.0);
    }

    #[test]
    fn blood_diffusion_skips_empty_side() {
        let mut net = TestNetwork::new(vec![("A", blood(0.5, 95.0)), ("B", blood(0.0, 40.0))]);
        let mut d = BloodDiffusor {
            comp_blood1: "A".into(),
            comp_blood2: "B".into(),
            ..BloodDiffusor::default()
        };
        let before = blood_of(&net, "A").to2;
        net.step(&mut d, 0.01).unwrap();
        assert_eq!(blood_of(&net, "A").to2, before);
    }

    #[test]
    fn gas_link_rejects_blood_side() {
        let mut net = TestNetwork::new(vec![("A", gas(0.1, 0.21)), ("B", blood(0.5, 95.0))]);
        let mut d = GasDiffusor {
            comp_gas1: "A".into(),
            comp_gas2: "B".into(),
            ..GasDiffusor::default()
        };
        let err = net.step(&mut d, 0.01).unwrap_err();
        assert!(matches!(err, ComponentError::WrongContent { content: "gas", .. }));
    }

    #[test]
    fn gas_diffusion_moves_oxygen_down_gradient() {
        let mut net = TestNetwork::new(vec![("A", gas(0.1, 0.6)), ("B", gas(0.2, 0.21))]);
        let mut d = GasDiffusor {
            comp_gas1: "A".into(),
            comp_gas2: "B".into(),
            ..GasDiffusor::default()
        };
        let (a0, b0) = (gas_of(&net, "A").co2, gas_of(&net, "B").co2);
        net.step(&mut d, 0.01).unwrap();
        let (a, b) = (gas_of(&net, "A"), gas_of(&net, "B"));
        assert!(a.co2 < a0);
        assert!(b.co2 > b0);
        assert!((a.co2 * 0.1 + b.co2 * 0.2 - (a0 * 0.1 + b0 * 0.2)).abs() < 1e-12);
    }

    #[test]
    fn solute_table_paths() {
        let mut d = BloodDiffusor::default();
        d.set_property("dif_solutes", Some("na"), &0.5.into()).unwrap();
        assert_eq!(d.property("dif_solutes", Some("na")), Some(PropertyValue::Number(0.5)));
        d.set_property("dif_o2_factor", None, &2.0.into()).unwrap();
        assert_eq!(d.effective(d.dif_o2, "dif_o2_factor"), 0.02);
    }
}
