//! Enclosing membrane around other compartments.
//!
//! The container volume is the sum of the contained volumes plus `vol_extra`.
//! Its elastic pressure is pushed back onto every contained compartment as a
//! one-shot external pressure.

use serde::Serialize;

use crate::error::{ComponentError, ComponentResult};
use crate::factors::{FactorSet, FactorWeights, get_factor, set_factor};
use crate::property::{Properties, PropertyValue, list, number};
use crate::traits::{Behavior, StepContext};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Container {
    /// Volume (L)
    pub vol: f64,
    /// Unstressed volume (L)
    pub u_vol: f64,
    /// Baseline elastance (mmHg/L)
    pub el_base: f64,
    pub el_k: f64,
    /// Pressure (mmHg)
    pub pres: f64,
    pub pres_in: f64,
    pub pres_ext: f64,
    /// Volume not held by any contained compartment (L)
    pub vol_extra: f64,
    pub contained_components: Vec<String>,
    #[serde(flatten)]
    pub u_vol_factors: FactorSet,
    #[serde(flatten)]
    pub el_base_factors: FactorSet,
    #[serde(flatten)]
    pub el_k_factors: FactorSet,
    #[serde(rename = "_u_vol")]
    pub u_vol_eff: f64,
    #[serde(rename = "_el")]
    pub el_eff: f64,
    #[serde(rename = "_el_k")]
    pub el_k_eff: f64,
}

impl Default for Container {
    fn default() -> Self {
        Self {
            vol: 0.0,
            u_vol: 0.0,
            el_base: 0.0,
            el_k: 0.0,
            pres: 0.0,
            pres_in: 0.0,
            pres_ext: 0.0,
            vol_extra: 0.0,
            contained_components: Vec::new(),
            u_vol_factors: FactorSet::standard("u_vol", &[]),
            el_base_factors: FactorSet::standard("el_base", &[]),
            el_k_factors: FactorSet::standard("el_k", &[]),
            u_vol_eff: 0.0,
            el_eff: 0.0,
            el_k_eff: 0.0,
        }
    }
}

impl Container {
    fn field_mut(&mut self, key: &str) -> Option<&mut f64> {
        Some(match key {
            "vol" => &mut self.vol,
            "u_vol" => &mut self.u_vol,
            "el_base" => &mut self.el_base,
            "el_k" => &mut self.el_k,
            "pres" => &mut self.pres,
            "pres_in" => &mut self.pres_in,
            "pres_ext" => &mut self.pres_ext,
            "vol_extra" => &mut self.vol_extra,
            _ => return None,
        })
    }

    fn field(&self, key: &str) -> Option<f64> {
        Some(match key {
            "vol" => self.vol,
            "u_vol" => self.u_vol,
            "el_base" => self.el_base,
            "el_k" => self.el_k,
            "pres" => self.pres,
            "pres_in" => self.pres_in,
            "pres_ext" => self.pres_ext,
            "vol_extra" => self.vol_extra,
            "_u_vol" => self.u_vol_eff,
            "_el" => self.el_eff,
            "_el_k" => self.el_k_eff,
            _ => return None,
        })
    }
}

impl Properties for Container {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        if sub.is_some() {
            return None;
        }
        if key == "contained_components" {
            return Some(PropertyValue::List(self.contained_components.clone()));
        }
        self.field(key)
            .or_else(|| {
                get_factor(
                    &[&self.u_vol_factors, &self.el_base_factors, &self.el_k_factors],
                    key,
                )
            })
            .map(PropertyValue::Number)
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
        if key == "contained_components" {
            self.contained_components = list(key, value)?;
            return Ok(());
        }
        if let Some(slot) = self.field_mut(key) {
            *slot = number(key, value)?;
            return Ok(());
        }
        let v = number(key, value)?;
        if set_factor(
            &mut [
                &mut self.u_vol_factors,
                &mut self.el_base_factors,
                &mut self.el_k_factors,
            ],
            key,
            v,
        ) {
            Ok(())
        } else {
            Err(ComponentError::unknown(key))
        }
    }
}

impl Behavior for Container {
    fn step(&mut self, ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        let mut vol = self.vol_extra;
        for name in &self.contained_components {
            let model = ctx
                .network
                .model(name)
                .ok_or_else(|| ComponentError::missing(name, "contained_components"))?;
            let comp = model.as_compartment().ok_or_else(|| {
                ComponentError::wrong_content(name, "contained_components", "volume")
            })?;
            vol += comp.volume();
        }
        self.vol = vol;

        let w = FactorWeights::default();
        self.u_vol_eff = self.u_vol_factors.apply(self.u_vol, w);
        self.el_eff = self.el_base_factors.apply(self.el_base, w);
        self.el_k_eff = self.el_k_factors.apply(self.el_k, w);

        let stretch = self.vol - self.u_vol_eff;
        self.pres_in = self.el_k_eff * stretch * stretch + self.el_eff * stretch;
        self.pres = self.pres_in + self.pres_ext;
        self.pres_ext = 0.0;

        for name in &self.contained_components {
            if let Some(comp) = ctx
                .network
                .model_mut(name)
                .and_then(|m| m.as_compartment_mut())
            {
                comp.add_external_pressure(self.pres);
            }
        }
        Ok(())
    }
}
