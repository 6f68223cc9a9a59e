//! Directional flow link between two compartments.
//!
//! Flow is positive from `comp_from` to `comp_to`. Resistance is the factor
//! adjusted baseline plus `r_k·flow²` from the previous step, so resistance
//! rises with flow. Volume moves through `volume_out`/`volume_in` and any
//! part the source could not give up is subtracted from what the destination
//! receives.

use serde::Serialize;

use crate::common::pressure_flow;
use crate::error::{ComponentError, ComponentResult};
use crate::factors::{FactorSet, FactorWeights, Scaling, get_factor, set_factor};
use crate::property::{Properties, PropertyValue, boolean, number, text};
use crate::traits::{Behavior, FlowControllable, StepContext};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resistor {
    pub comp_from: String,
    pub comp_to: String,
    /// Forward resistance (mmHg·s/L)
    pub r_for: f64,
    /// Backward resistance (mmHg·s/L)
    pub r_back: f64,
    /// Nonlinear resistance coefficient
    pub r_k: f64,
    pub no_flow: bool,
    pub no_back_flow: bool,
    /// One-shot pressure offset on the inlet (mmHg)
    pub p1_ext: f64,
    /// One-shot pressure offset on the outlet (mmHg)
    pub p2_ext: f64,
    /// Flow (L/s)
    pub flow: f64,
    pub sensitivity: f64,
    pub ans_activity_factor: f64,
    #[serde(flatten)]
    pub r_factors: FactorSet,
    #[serde(flatten)]
    pub r_k_factors: FactorSet,
    #[serde(rename = "_r_for")]
    pub r_for_eff: f64,
    #[serde(rename = "_r_back")]
    pub r_back_eff: f64,
    #[serde(rename = "_r_k")]
    pub r_k_eff: f64,
}

impl Default for Resistor {
    fn default() -> Self {
        Self::with_factors(
            FactorSet::new().with("r_factor", Scaling::Unit),
            FactorSet::new().with("r_k_factor", Scaling::Unit),
        )
    }
}

impl Resistor {
    fn with_factors(r_factors: FactorSet, r_k_factors: FactorSet) -> Self {
        Self {
            comp_from: String::new(),
            comp_to: String::new(),
            r_for: 1.0,
            r_back: 1.0,
            r_k: 0.0,
            no_flow: false,
            no_back_flow: false,
            p1_ext: 0.0,
            p2_ext: 0.0,
            flow: 0.0,
            sensitivity: 1.0,
            ans_activity_factor: 1.0,
            r_factors,
            r_k_factors,
            r_for_eff: 0.0,
            r_back_eff: 0.0,
            r_k_eff: 0.0,
        }
    }

    /// Blood vessel resistor: circulatory, autonomic, mobility and drug
    /// factors weighted by `sensitivity`.
    pub fn blood() -> Self {
        Self::with_factors(
            FactorSet::new()
                .with("r_factor", Scaling::Unit)
                .with("r_circ_factor", Scaling::Sensitivity)
                .with("r_ans_factor", Scaling::ActivitySensitivity)
                .with("r_mob_factor", Scaling::Sensitivity)
                .with("r_drug_factor", Scaling::Sensitivity),
            FactorSet::new()
                .with("r_k_factor", Scaling::Unit)
                .with("r_k_circ_factor", Scaling::Sensitivity)
                .with("r_k_ans_factor", Scaling::ActivitySensitivity)
                .with("r_mob_factor", Scaling::Sensitivity)
                .with("r_drug_factor", Scaling::Sensitivity),
        )
    }

    /// Resistor from `from` to `to` with equal forward and backward resistance.
    pub fn between(from: &str, to: &str, r: f64) -> Self {
        Self {
            comp_from: from.to_string(),
            comp_to: to.to_string(),
            r_for: r,
            r_back: r,
            ..Self::default()
        }
    }

    pub fn update_resistances(&mut self) {
        let w = FactorWeights {
            activity: self.ans_activity_factor,
            sensitivity: self.sensitivity,
        };
        self.r_k_eff = self.r_k_factors.apply(self.r_k, w);
        let turbulence = self.r_k_eff * self.flow * self.flow;
        self.r_for_eff = self.r_factors.apply(self.r_for, w) + turbulence;
        self.r_back_eff = self.r_factors.apply(self.r_back, w) + turbulence;
    }

    fn field(&self, key: &str) -> Option<PropertyValue> {
        let v = match key {
            "comp_from" => return Some(PropertyValue::Text(self.comp_from.clone())),
            "comp_to" => return Some(PropertyValue::Text(self.comp_to.clone())),
            "no_flow" => return Some(PropertyValue::Bool(self.no_flow)),
            "no_back_flow" => return Some(PropertyValue::Bool(self.no_back_flow)),
            "r_for" => self.r_for,
            "r_back" => self.r_back,
            "r_k" => self.r_k,
            "p1_ext" => self.p1_ext,
            "p2_ext" => self.p2_ext,
            "flow" => self.flow,
            "sensitivity" => self.sensitivity,
            "ans_activity_factor" => self.ans_activity_factor,
            "_r_for" => self.r_for_eff,
            "_r_back" => self.r_back_eff,
            "_r_k" => self.r_k_eff,
            _ => return get_factor(&[&self.r_factors, &self.r_k_factors], key).map(PropertyValue::Number),
        };
        Some(PropertyValue::Number(v))
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut f64> {
        Some(match key {
            "r_for" => &mut self.r_for,
            "r_back" => &mut self.r_back,
            "r_k" => &mut self.r_k,
            "p1_ext" => &mut self.p1_ext,
            "p2_ext" => &mut self.p2_ext,
            "flow" => &mut self.flow,
            "sensitivity" => &mut self.sensitivity,
            "ans_activity_factor" => &mut self.ans_activity_factor,
            _ => return None,
        })
    }
}

impl Properties for Resistor {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        if sub.is_some() {
            return None;
        }
        self.field(key)
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
            "comp_from" => self.comp_from = text(key, value)?,
            "comp_to" => self.comp_to = text(key, value)?,
            "no_flow" => self.no_flow = boolean(key, value)?,
            "no_back_flow" => self.no_back_flow = boolean(key, value)?,
            _ => {
                if let Some(slot) = self.field_mut(key) {
                    *slot = number(key, value)?;
                } else if get_factor(&[&self.r_factors, &self.r_k_factors], key).is_some() {
                    let v = number(key, value)?;
                    set_factor(&mut [&mut self.r_factors, &mut self.r_k_factors], key, v);
                } else {
                    return Err(ComponentError::unknown(key));
                }
            }
        }
        Ok(())
    }
}

impl Behavior for Resistor {
    fn step(&mut self, ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        let dt = ctx.dt;
        let (from, to) = ctx.compartments(
            (self.comp_from.as_str(), "comp_from"),
            (self.comp_to.as_str(), "comp_to"),
        )?;

        self.update_resistances();

        let p1 = from.pressure() + self.p1_ext;
        let p2 = to.pressure() + self.p2_ext;
        self.p1_ext = 0.0;
        self.p2_ext = 0.0;

        self.flow = 0.0;
        if self.no_flow {
            return Ok(());
        }

        // the nonlinear drop enters through r_k·flow² in the resistances
        if p1 >= p2 {
            let Some(flow) = pressure_flow(p1 - p2, self.r_for_eff) else {
                return Ok(());
            };
            self.flow = flow;
            let dvol = self.flow * dt;
            let not_removed = from.volume_out(dvol);
            to.volume_in(dvol - not_removed, &*from);
        } else if !self.no_back_flow {
            let Some(flow) = pressure_flow(p1 - p2, self.r_back_eff) else {
                return Ok(());
            };
            self.flow = flow;
            let dvol = -self.flow * dt;
            let not_removed = to.volume_out(dvol);
            from.volume_in(dvol - not_removed, &*to);
        }
        Ok(())
    }

    fn call(&mut self, function: &str, args: &[PropertyValue]) -> ComponentResult<()> {
        match function {
            "open" => self.set_no_flow(false),
            "close" => self.set_no_flow(true),
            "set_no_back_flow" => {
                let flag = args.first().ok_or(ComponentError::InvalidArg {
                    what: "set_no_back_flow needs a bool argument",
                })?;
                self.set_no_back_flow(boolean(function, flag)?);
            }
            _ => {
                return Err(ComponentError::UnknownFunction {
                    function: function.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl FlowControllable for Resistor {
    fn flow(&self) -> f64 {
        self.flow
    }

    fn no_flow(&self) -> bool {
        self.no_flow
    }

    fn set_no_flow(&mut self, no_flow: bool) {
        self.no_flow = no_flow;
    }

    fn no_back_flow(&self) -> bool {
        self.no_back_flow
    }

    fn set_no_back_flow(&mut self, no_back_flow: bool) {
        self.no_back_flow = no_back_flow;
    }
}
