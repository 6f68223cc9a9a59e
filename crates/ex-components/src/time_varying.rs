//! Capacitance with an activation-driven elastance (heart chambers).
//!
//! The pressure blends an end-systolic relation `el_max·Δv` and an
//! end-diastolic relation `el_k·Δv² + el_min·Δv` by `act_factor ∈ [0, 1]`,
//! which an external driver updates every step.

use serde::Serialize;

use crate::capacitance::volume_function;
use crate::common::withdraw;
use crate::error::{ComponentError, ComponentResult};
use crate::factors::{FactorSet, FactorWeights, Scaling, get_factor, set_factor};
use crate::property::{Properties, PropertyValue, number};
use crate::traits::{Behavior, Compartment, StepContext};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeVaryingElastance {
    pub vol: f64,
    pub u_vol: f64,
    /// Minimal (diastolic) elastance (mmHg/L)
    pub el_min: f64,
    /// Maximal (systolic) elastance (mmHg/L)
    pub el_max: f64,
    pub el_k: f64,
    /// Activation from the driving rhythm (0 = relaxed, 1 = fully contracted)
    pub act_factor: f64,
    pub pres: f64,
    pub pres_in: f64,
    pub pres_ext: f64,
    pub pres_cc: f64,
    pub pres_mus: f64,
    pub ans_activity_factor: f64,
    #[serde(flatten)]
    pub u_vol_factors: FactorSet,
    #[serde(flatten)]
    pub el_min_factors: FactorSet,
    #[serde(flatten)]
    pub el_max_factors: FactorSet,
    #[serde(flatten)]
    pub el_k_factors: FactorSet,
    #[serde(rename = "_u_vol")]
    pub u_vol_eff: f64,
    #[serde(rename = "_el_min")]
    pub el_min_eff: f64,
    #[serde(rename = "_el_max")]
    pub el_max_eff: f64,
    #[serde(rename = "_el_k")]
    pub el_k_eff: f64,
}

impl Default for TimeVaryingElastance {
    fn default() -> Self {
        Self::with_sources(&[], &[])
    }
}

impl TimeVaryingElastance {
    /// `sources` act on every parameter, `contractility` only on
    /// `el_min`/`el_max`.
    pub fn with_sources(sources: &[(&str, Scaling)], contractility: &[(&str, Scaling)]) -> Self {
        let elastance_sources: Vec<(&str, Scaling)> =
            sources.iter().chain(contractility).copied().collect();
        Self {
            vol: 0.0,
            u_vol: 0.0,
            el_min: 0.0,
            el_max: 0.0,
            el_k: 0.0,
            act_factor: 0.0,
            pres: 0.0,
            pres_in: 0.0,
            pres_ext: 0.0,
            pres_cc: 0.0,
            pres_mus: 0.0,
            ans_activity_factor: 1.0,
            u_vol_factors: FactorSet::standard("u_vol", sources),
            el_min_factors: FactorSet::standard("el_min", &elastance_sources),
            el_max_factors: FactorSet::standard("el_max", &elastance_sources),
            el_k_factors: FactorSet::standard("el_k", sources),
            u_vol_eff: 0.0,
            el_min_eff: 0.0,
            el_max_eff: 0.0,
            el_k_eff: 0.0,
        }
    }

    pub fn update_elastances(&mut self) {
        let w = FactorWeights::activity(self.ans_activity_factor);
        self.el_min_eff = self.el_min_factors.apply(self.el_min, w);
        self.el_max_eff = self.el_max_factors.apply(self.el_max, w);
        self.el_k_eff = self.el_k_factors.apply(self.el_k, w);
        self.u_vol_eff = self.u_vol_factors.apply(self.u_vol, w);
    }

    pub fn update_pressure(&mut self) {
        let stretch = self.vol - self.u_vol_eff;
        let p_ms = stretch * self.el_max_eff;
        let p_ed = self.el_k_eff * stretch * stretch + self.el_min_eff * stretch;
        self.pres_in = (p_ms - p_ed) * self.act_factor + p_ed;
        self.pres = self.pres_in + self.pres_ext + self.pres_cc + self.pres_mus;
        self.pres_ext = 0.0;
        self.pres_cc = 0.0;
        self.pres_mus = 0.0;
    }

    fn factor_sets(&self) -> [&FactorSet; 4] {
        [
            &self.u_vol_factors,
            &self.el_min_factors,
            &self.el_max_factors,
            &self.el_k_factors,
        ]
    }

    fn field(&self, key: &str) -> Option<f64> {
        Some(match key {
            "vol" => self.vol,
            "u_vol" => self.u_vol,
            "el_min" => self.el_min,
            "el_max" => self.el_max,
            "el_k" => self.el_k,
            "act_factor" => self.act_factor,
            "pres" => self.pres,
            "pres_in" => self.pres_in,
            "pres_ext" => self.pres_ext,
            "pres_cc" => self.pres_cc,
            "pres_mus" => self.pres_mus,
            "ans_activity_factor" => self.ans_activity_factor,
            "_u_vol" => self.u_vol_eff,
            "_el_min" => self.el_min_eff,
            "_el_max" => self.el_max_eff,
            "_el_k" => self.el_k_eff,
            _ => return None,
        })
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut f64> {
        Some(match key {
            "vol" => &mut self.vol,
            "u_vol" => &mut self.u_vol,
            "el_min" => &mut self.el_min,
            "el_max" => &mut self.el_max,
            "el_k" => &mut self.el_k,
            "act_factor" => &mut self.act_factor,
            "pres" => &mut self.pres,
            "pres_in" => &mut self.pres_in,
            "pres_ext" => &mut self.pres_ext,
            "pres_cc" => &mut self.pres_cc,
            "pres_mus" => &mut self.pres_mus,
            "ans_activity_factor" => &mut self.ans_activity_factor,
            _ => return None,
        })
    }
}

impl Properties for TimeVaryingElastance {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        if sub.is_some() {
            return None;
        }
        self.field(key)
            .or_else(|| get_factor(&self.factor_sets(), key))
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
        if let Some(slot) = self.field_mut(key) {
            *slot = number(key, value)?;
            return Ok(());
        }
        if get_factor(&self.factor_sets(), key).is_none() {
            return Err(ComponentError::unknown(key));
        }
        let v = number(key, value)?;
        set_factor(
            &mut [
                &mut self.u_vol_factors,
                &mut self.el_min_factors,
                &mut self.el_max_factors,
                &mut self.el_k_factors,
            ],
            key,
            v,
        );
        Ok(())
    }
}

impl Behavior for TimeVaryingElastance {
    fn step(&mut self, _ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        self.update_elastances();
        self.update_pressure();
        Ok(())
    }

    fn call(&mut self, function: &str, args: &[PropertyValue]) -> ComponentResult<()> {
        volume_function(self, function, args)
    }
}

impl Compartment for TimeVaryingElastance {
    fn volume(&self) -> f64 {
        self.vol
    }

    fn pressure(&self) -> f64 {
        self.pres
    }

    fn volume_in(&mut self, dvol: f64, _source: &dyn Compartment) {
        self.vol += dvol;
    }

    fn volume_out(&mut self, dvol: f64) -> f64 {
        withdraw(&mut self.vol, dvol)
    }

    fn add_external_pressure(&mut self, pres: f64) {
        self.pres_ext += pres;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ventricle(act: f64) -> TimeVaryingElastance {
        let mut v = TimeVaryingElastance::default();
        v.vol = 0.02;
        v.u_vol = 0.005;
        v.el_min = 100.0;
        v.el_max = 2500.0;
        v.act_factor = act;
        v.update_elastances();
        v.update_pressure();
        v
    }

    #[test]
    fn relaxed_follows_diastolic_relation() {
        let v = ventricle(0.0);
        assert!((v.pres - 100.0 * 0.015).abs() < 1e-12);
    }

    #[test]
    fn contracted_follows_systolic_relation() {
        let v = ventricle(1.0);
        assert!((v.pres - 2500.0 * 0.015).abs() < 1e-9);
    }

    #[test]
    fn activation_blends_linearly() {
        let half = ventricle(0.5).pres;
        let expected = 0.5 * (ventricle(0.0).pres + ventricle(1.0).pres);
        assert!((half - expected).abs() < 1e-9);
    }

    #[test]
    fn contractility_factors_skip_unstressed_volume() {
        let v = TimeVaryingElastance::with_sources(&[("circ", Scaling::Unit)], &[("mob", Scaling::Unit)]);
        assert!(v.property("el_max_mob_factor", None).is_some());
        assert!(v.property("el_min_circ_factor", None).is_some());
        assert!(v.property("u_vol_mob_factor", None).is_none());
        assert!(v.property("el_k_mob_factor", None).is_none());
    }
}
