//! Elastic compartment with a quadratic pressure-volume relation.
//!
//! `pres = el_k·(vol - u_vol)² + el·(vol - u_vol) + external pressures`, with
//! the effective `u_vol`, `el` and `el_k` recomputed each step from their
//! baselines and factor lists.

use serde::Serialize;

use crate::common::withdraw;
use crate::error::{ComponentError, ComponentResult};
use crate::factors::{FactorSet, FactorWeights, Scaling, get_factor, set_factor};
use crate::property::{Properties, PropertyValue, number};
use crate::traits::{Behavior, Compartment, StepContext};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capacitance {
    /// Volume (L)
    pub vol: f64,
    /// Unstressed volume (L)
    pub u_vol: f64,
    /// Baseline elastance (mmHg/L)
    pub el_base: f64,
    /// Nonlinear elastance coefficient
    pub el_k: f64,
    /// Pressure (mmHg)
    pub pres: f64,
    /// Recoil pressure of the wall (mmHg)
    pub pres_in: f64,
    pub pres_ext: f64,
    /// Chest compression pressure (mmHg)
    pub pres_cc: f64,
    /// Muscle pressure (mmHg)
    pub pres_mus: f64,
    pub ans_activity_factor: f64,
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

impl Default for Capacitance {
    fn default() -> Self {
        Self::with_sources(&[])
    }
}

impl Capacitance {
    /// Capacitance whose parameters take factors from the given sources.
    pub fn with_sources(sources: &[(&str, Scaling)]) -> Self {
        Self {
            vol: 0.0,
            u_vol: 0.0,
            el_base: 0.0,
            el_k: 0.0,
            pres: 0.0,
            pres_in: 0.0,
            pres_ext: 0.0,
            pres_cc: 0.0,
            pres_mus: 0.0,
            ans_activity_factor: 1.0,
            u_vol_factors: FactorSet::standard("u_vol", sources),
            el_base_factors: FactorSet::standard("el_base", sources),
            el_k_factors: FactorSet::standard("el_k", sources),
            u_vol_eff: 0.0,
            el_eff: 0.0,
            el_k_eff: 0.0,
        }
    }

    /// Recompute effective elastances and unstressed volume.
    pub fn update_elastances(&mut self) {
        let w = FactorWeights::activity(self.ans_activity_factor);
        self.el_eff = self.el_base_factors.apply(self.el_base, w);
        self.el_k_eff = self.el_k_factors.apply(self.el_k, w);
        self.u_vol_eff = self.u_vol_factors.apply(self.u_vol, w);
    }

    /// Recompute pressure and consume the external pressures.
    pub fn update_pressure(&mut self) {
        let stretch = self.vol - self.u_vol_eff;
        self.pres_in = self.el_k_eff * stretch * stretch + self.el_eff * stretch;
        self.pres = self.pres_in + self.pres_ext + self.pres_cc + self.pres_mus;
        self.pres_ext = 0.0;
        self.pres_cc = 0.0;
        self.pres_mus = 0.0;
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
            "pres_cc" => self.pres_cc,
            "pres_mus" => self.pres_mus,
            "ans_activity_factor" => self.ans_activity_factor,
            "_u_vol" => self.u_vol_eff,
            "_el" => self.el_eff,
            "_el_k" => self.el_k_eff,
            _ => return None,
        })
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut f64> {
        Some(match key {
            "vol" => &mut self.vol,
            "u_vol" => &mut self.u_vol,
            "el_base" => &mut self.el_base,
            "el_k" => &mut self.el_k,
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

impl Properties for Capacitance {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        if sub.is_some() {
            return None;
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
        if let Some(slot) = self.field_mut(key) {
            *slot = number(key, value)?;
            return Ok(());
        }
        let sets = &mut [
            &mut self.u_vol_factors,
            &mut self.el_base_factors,
            &mut self.el_k_factors,
        ];
        if sets.iter().any(|s| s.get(key).is_some()) {
            set_factor(sets, key, number(key, value)?);
            Ok(())
        } else {
            Err(ComponentError::unknown(key))
        }
    }
}

impl Behavior for Capacitance {
    fn step(&mut self, _ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        self.update_elastances();
        self.update_pressure();
        Ok(())
    }

    fn call(&mut self, function: &str, args: &[PropertyValue]) -> ComponentResult<()> {
        volume_function(self, function, args)
    }
}

impl Compartment for Capacitance {
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

/// `add_volume(dvol)` / `remove_volume(dvol)` shared by every compartment.
///
/// Added volume carries the compartment's own content, so concentrations
/// stay put.
pub(crate) fn volume_function<C: Compartment + ?Sized>(
    comp: &mut C,
    function: &str,
    args: &[PropertyValue],
) -> ComponentResult<()> {
    let amount = |args: &[PropertyValue]| -> ComponentResult<f64> {
        let dvol = args
            .first()
            .ok_or(ComponentError::InvalidArg {
                what: "volume function needs a volume argument",
            })
            .and_then(|v| number(function, v))?;
        if dvol < 0.0 || !dvol.is_finite() {
            return Err(ComponentError::InvalidArg {
                what: "volume argument must be non-negative",
            });
        }
        Ok(dvol)
    };
    match function {
        "add_volume" => {
            // a negative withdrawal grows the volume without mixing
            comp.volume_out(-amount(args)?);
            Ok(())
        }
        "remove_volume" => {
            let dvol = amount(args)?;
            comp.volume_out(dvol);
            Ok(())
        }
        _ => Err(ComponentError::UnknownFunction {
            function: function.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chamber() -> Capacitance {
        let mut c = Capacitance::default();
        c.vol = 0.5;
        c.u_vol = 0.2;
        c.el_base = 100.0;
        c.el_k = 10.0;
        c
    }

    #[test]
    fn pressure_volume_relation() {
        let mut c = chamber();
        c.update_elastances();
        c.update_pressure();
        let stretch: f64 = 0.3;
        assert!((c.pres - (10.0 * stretch.powi(2) + 100.0 * stretch)).abs() < 1e-12);
        assert_eq!(c.pres, c.pres_in);
    }

    #[test]
    fn external_pressures_are_consumed() {
        let mut c = chamber();
        c.add_external_pressure(5.0);
        c.pres_cc = 2.0;
        c.pres_mus = 1.0;
        c.update_elastances();
        c.update_pressure();
        assert!((c.pres - c.pres_in - 8.0).abs() < 1e-12);
        assert_eq!((c.pres_ext, c.pres_cc, c.pres_mus), (0.0, 0.0, 0.0));
        c.update_pressure();
        assert_eq!(c.pres, c.pres_in);
    }

    #[test]
    fn factor_raises_elastance_additively() {
        let mut c = chamber();
        c.set_property("el_base_factor", None, &2.0.into()).unwrap();
        c.update_elastances();
        assert_eq!(c.el_eff, 200.0);
        assert_eq!(c.property("el_base_factor", None), Some(PropertyValue::Number(2.0)));
    }

    #[test]
    fn volume_out_returns_remainder() {
        let mut c = chamber();
        assert_eq!(c.volume_out(0.2), 0.0);
        let rest = c.volume_out(0.5);
        assert_eq!(c.vol, 0.0);
        assert!((rest - 0.2).abs() < 1e-12);
    }

    #[test]
    fn unknown_and_mistyped_properties() {
        let mut c = chamber();
        assert!(matches!(
            c.set_property("nope", None, &1.0.into()),
            Err(ComponentError::UnknownProperty { .. })
        ));
        assert!(matches!(
            c.set_property("vol", None, &true.into()),
            Err(ComponentError::TypeMismatch { .. })
        ));
        assert!(c.property("solutes", Some("na")).is_none());
    }

    #[test]
    fn add_and_remove_volume() {
        let mut c = chamber();
        c.call("add_volume", &[0.25.into()]).unwrap();
        assert!((c.vol - 0.75).abs() < 1e-12);
        c.call("remove_volume", &[1.0.into()]).unwrap();
        assert_eq!(c.vol, 0.0);
        assert!(c.call("remove_volume", &[(-1.0).into()]).is_err());
        assert!(c.call("explode", &[]).is_err());
    }
}
