//! Alveolar-capillary exchange between a blood and a gas compartment.

use serde::Serialize;
use tracing::debug;

use crate::error::{ComponentError, ComponentResult};
use crate::factors::{FactorSet, Scaling};
use crate::property::{Properties, PropertyValue, number, text};
use crate::traits::{Behavior, StepContext};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasExchanger {
    pub comp_blood: String,
    pub comp_gas: String,
    /// mmol/(mmHg·s)
    pub dif_o2: f64,
    /// mmol/(mmHg·s)
    pub dif_co2: f64,
    #[serde(flatten)]
    pub factors: FactorSet,
    /// O2 moved from blood to gas in the last step (mmol)
    pub flux_o2: f64,
    /// CO2 moved from blood to gas in the last step (mmol)
    pub flux_co2: f64,
}

impl Default for GasExchanger {
    fn default() -> Self {
        Self {
            comp_blood: String::new(),
            comp_gas: String::new(),
            dif_o2: 0.0,
            dif_co2: 0.0,
            factors: FactorSet::new()
                .with("dif_o2_factor", Scaling::Unit)
                .with("dif_co2_factor", Scaling::Unit),
            flux_o2: 0.0,
            flux_co2: 0.0,
        }
    }
}

impl Properties for GasExchanger {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        if sub.is_some() {
            return None;
        }
        let v = match key {
            "comp_blood" => return Some(PropertyValue::Text(self.comp_blood.clone())),
            "comp_gas" => return Some(PropertyValue::Text(self.comp_gas.clone())),
            "dif_o2" => self.dif_o2,
            "dif_co2" => self.dif_co2,
            "flux_o2" => self.flux_o2,
            "flux_co2" => self.flux_co2,
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
            "comp_blood" => self.comp_blood = text(key, value)?,
            "comp_gas" => self.comp_gas = text(key, value)?,
            "dif_o2" => self.dif_o2 = number(key, value)?,
            "dif_co2" => self.dif_co2 = number(key, value)?,
            "flux_o2" => self.flux_o2 = number(key, value)?,
            "flux_co2" => self.flux_co2 = number(key, value)?,
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

impl Behavior for GasExchanger {
    fn step(&mut self, ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        let dt = ctx.dt;
        let (blood_comp, gas_comp) = ctx.compartments(
            (self.comp_blood.as_str(), "comp_blood"),
            (self.comp_gas.as_str(), "comp_gas"),
        )?;
        let (v_blood, v_gas) = (blood_comp.volume(), gas_comp.volume());
        let blood = blood_comp
            .blood_mut()
            .ok_or_else(|| ComponentError::wrong_content(&self.comp_blood, "comp_blood", "blood"))?;
        let gas = gas_comp
            .gas_mut()
            .ok_or_else(|| ComponentError::wrong_content(&self.comp_gas, "comp_gas", "gas"))?;

        // a failed solve keeps the previous blood gas and is counted on the blood side
        if let Err(e) = blood.update_composition() {
            debug!(compartment = %self.comp_blood, error = %e, "blood gas kept stale");
        }

        if v_blood == 0.0 || v_gas == 0.0 {
            return Ok(());
        }

        let dif_o2 = self.dif_o2 * self.factors.get("dif_o2_factor").unwrap_or(1.0);
        let dif_co2 = self.dif_co2 * self.factors.get("dif_co2_factor").unwrap_or(1.0);

        self.flux_o2 = (blood.po2 - gas.po2) * dif_o2 * dt;
        self.flux_co2 = (blood.pco2 - gas.pco2) * dif_co2 * dt;

        blood.to2 = ((blood.to2 * v_blood - self.flux_o2) / v_blood).max(0.0);
        gas.co2 = ((gas.co2 * v_gas + self.flux_o2) / v_gas).max(0.0);
        blood.tco2 = ((blood.tco2 * v_blood - self.flux_co2) / v_blood).max(0.0);
        gas.cco2 = ((gas.cco2 * v_gas + self.flux_co2) / v_gas).max(0.0);
        Ok(())
    }
}
