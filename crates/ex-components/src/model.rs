//! Closed set of component kinds and dispatch over them.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::blood::{BloodCapacitance, BloodTimeVaryingElastance};
use crate::capacitance::Capacitance;
use crate::container::Container;
use crate::diffusor::{BloodDiffusor, GasDiffusor};
use crate::error::{ComponentError, ComponentResult};
use crate::gas::GasCapacitance;
use crate::gas_exchanger::GasExchanger;
use crate::property::{Properties, PropertyValue};
use crate::resistor::Resistor;
use crate::time_varying::TimeVaryingElastance;
use crate::traits::{Behavior, Compartment, FlowControllable, StepContext};

/// Registered component kinds, named as they appear in `model_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Capacitance,
    TimeVaryingElastance,
    BloodCapacitance,
    BloodTimeVaryingElastance,
    GasCapacitance,
    Resistor,
    BloodResistor,
    BloodDiffusor,
    GasDiffusor,
    GasExchanger,
    Container,
}

impl ModelKind {
    pub const ALL: [ModelKind; 11] = [
        ModelKind::Capacitance,
        ModelKind::TimeVaryingElastance,
        ModelKind::BloodCapacitance,
        ModelKind::BloodTimeVaryingElastance,
        ModelKind::GasCapacitance,
        ModelKind::Resistor,
        ModelKind::BloodResistor,
        ModelKind::BloodDiffusor,
        ModelKind::GasDiffusor,
        ModelKind::GasExchanger,
        ModelKind::Container,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Capacitance => "Capacitance",
            ModelKind::TimeVaryingElastance => "TimeVaryingElastance",
            ModelKind::BloodCapacitance => "BloodCapacitance",
            ModelKind::BloodTimeVaryingElastance => "BloodTimeVaryingElastance",
            ModelKind::GasCapacitance => "GasCapacitance",
            ModelKind::Resistor => "Resistor",
            ModelKind::BloodResistor => "BloodResistor",
            ModelKind::BloodDiffusor => "BloodDiffusor",
            ModelKind::GasDiffusor => "GasDiffusor",
            ModelKind::GasExchanger => "GasExchanger",
            ModelKind::Container => "Container",
        }
    }

    /// A fresh component of this kind with default parameters.
    pub fn instantiate(self) -> Model {
        match self {
            ModelKind::Capacitance => Model::Capacitance(Capacitance::default()),
            ModelKind::TimeVaryingElastance => {
                Model::TimeVaryingElastance(TimeVaryingElastance::default())
            }
            ModelKind::BloodCapacitance => Model::BloodCapacitance(BloodCapacitance::default()),
            ModelKind::BloodTimeVaryingElastance => {
                Model::BloodTimeVaryingElastance(BloodTimeVaryingElastance::default())
            }
            ModelKind::GasCapacitance => Model::GasCapacitance(GasCapacitance::default()),
            ModelKind::Resistor => Model::Resistor(Resistor::default()),
            ModelKind::BloodResistor => Model::Resistor(Resistor::blood()),
            ModelKind::BloodDiffusor => Model::BloodDiffusor(BloodDiffusor::default()),
            ModelKind::GasDiffusor => Model::GasDiffusor(GasDiffusor::default()),
            ModelKind::GasExchanger => Model::GasExchanger(GasExchanger::default()),
            ModelKind::Container => Model::Container(Container::default()),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ComponentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ComponentError::UnknownModelType {
                model_type: s.to_string(),
            })
    }
}

/// A component instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Model {
    Capacitance(Capacitance),
    TimeVaryingElastance(TimeVaryingElastance),
    BloodCapacitance(BloodCapacitance),
    BloodTimeVaryingElastance(BloodTimeVaryingElastance),
    GasCapacitance(GasCapacitance),
    Resistor(Resistor),
    BloodDiffusor(BloodDiffusor),
    GasDiffusor(GasDiffusor),
    GasExchanger(GasExchanger),
    Container(Container),
}

macro_rules! dispatch {
    ($model:expr, $inner:ident => $body:expr) => {
        match $model {
            Model::Capacitance($inner) => $body,
            Model::TimeVaryingElastance($inner) => $body,
            Model::BloodCapacitance($inner) => $body,
            Model::BloodTimeVaryingElastance($inner) => $body,
            Model::GasCapacitance($inner) => $body,
            Model::Resistor($inner) => $body,
            Model::BloodDiffusor($inner) => $body,
            Model::GasDiffusor($inner) => $body,
            Model::GasExchanger($inner) => $body,
            Model::Container($inner) => $body,
        }
    };
}

impl Model {
    /// The volume-holding view, for compartments.
    pub fn as_compartment(&self) -> Option<&dyn Compartment> {
        match self {
            Model::Capacitance(c) => Some(c),
            Model::TimeVaryingElastance(c) => Some(c),
            Model::BloodCapacitance(c) => Some(c),
            Model::BloodTimeVaryingElastance(c) => Some(c),
            Model::GasCapacitance(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_compartment_mut(&mut self) -> Option<&mut dyn Compartment> {
        match self {
            Model::Capacitance(c) => Some(c),
            Model::TimeVaryingElastance(c) => Some(c),
            Model::BloodCapacitance(c) => Some(c),
            Model::BloodTimeVaryingElastance(c) => Some(c),
            Model::GasCapacitance(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_flow_controllable(&self) -> Option<&dyn FlowControllable> {
        match self {
            Model::Resistor(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_flow_controllable_mut(&mut self) -> Option<&mut dyn FlowControllable> {
        match self {
            Model::Resistor(r) => Some(r),
            _ => None,
        }
    }
}

impl Properties for Model {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue> {
        dispatch!(self, m => m.property(key, sub))
    }

    fn set_property(
        &mut self,
        key: &str,
        sub: Option<&str>,
        value: &PropertyValue,
    ) -> ComponentResult<()> {
        dispatch!(self, m => m.set_property(key, sub, value))
    }
}

impl Behavior for Model {
    fn step(&mut self, ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        dispatch!(self, m => m.step(ctx))
    }

    fn call(&mut self, function: &str, args: &[PropertyValue]) -> ComponentResult<()> {
        dispatch!(self, m => m.call(function, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.to_string().parse::<ModelKind>(), Ok(kind));
        }
        assert!(matches!(
            "Ventilator".parse::<ModelKind>(),
            Err(ComponentError::UnknownModelType { .. })
        ));
    }

    #[test]
    fn capabilities_follow_kind() {
        let mut cap = ModelKind::GasCapacitance.instantiate();
        assert!(cap.as_compartment().is_some());
        assert!(cap.as_flow_controllable_mut().is_none());
        let mut r = ModelKind::BloodResistor.instantiate();
        assert!(r.as_compartment().is_none());
        r.as_flow_controllable_mut().unwrap().set_no_flow(true);
        assert_eq!(r.property("no_flow", None), Some(PropertyValue::Bool(true)));
        assert!(r.property("r_circ_factor", None).is_some());
        assert!(ModelKind::Resistor.instantiate().property("r_circ_factor", None).is_none());
    }

    #[test]
    fn unknown_function_is_reported() {
        let mut m = ModelKind::Container.instantiate();
        assert!(matches!(
            m.call("open", &[]),
            Err(ComponentError::UnknownFunction { .. })
        ));
    }
}
