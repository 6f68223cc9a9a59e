//! Core traits for component models.

use crate::blood::BloodContent;
use crate::error::{ComponentError, ComponentResult};
use crate::gas::GasContent;
use crate::model::Model;
use crate::property::{Properties, PropertyValue};

/// Name-based view of the rest of the graph during one component's step.
///
/// The component being stepped is never reachable through its own network.
pub trait Network {
    fn model(&self, name: &str) -> Option<&Model>;

    fn model_mut(&mut self, name: &str) -> Option<&mut Model>;

    /// Two distinct components at once. `None` if either is missing or both
    /// names are the same.
    fn pair_mut(&mut self, first: &str, second: &str) -> Option<(&mut Model, &mut Model)>;
}

/// Everything a component may touch while it steps.
pub struct StepContext<'a> {
    /// Fixed timestep (s)
    pub dt: f64,
    /// Simulation time at the start of the step (s)
    pub time: f64,
    pub network: &'a mut dyn Network,
}

impl StepContext<'_> {
    /// Resolve two compartments by name, reporting which reference failed.
    pub fn compartments(
        &mut self,
        first: (&str, &'static str),
        second: (&str, &'static str),
    ) -> ComponentResult<(&mut dyn Compartment, &mut dyn Compartment)> {
        for (name, role) in [first, second] {
            match self.network.model(name) {
                None => return Err(ComponentError::missing(name, role)),
                Some(m) if m.as_compartment().is_none() => {
                    return Err(ComponentError::WrongContent {
                        name: name.to_string(),
                        role,
                        content: "volume",
                    });
                }
                Some(_) => {}
            }
        }
        let (a, b) = self
            .network
            .pair_mut(first.0, second.0)
            .ok_or(ComponentError::InvalidArg {
                what: "a link cannot connect a component to itself",
            })?;
        match (a.as_compartment_mut(), b.as_compartment_mut()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(ComponentError::InvalidArg {
                what: "linked components must hold volume",
            }),
        }
    }
}

/// Per-step behavior shared by every component kind.
pub trait Behavior: Properties {
    /// Advance one fixed timestep.
    fn step(&mut self, ctx: &mut StepContext<'_>) -> ComponentResult<()>;

    /// Invoke a named function with positional arguments.
    fn call(&mut self, function: &str, _args: &[PropertyValue]) -> ComponentResult<()> {
        Err(ComponentError::UnknownFunction {
            function: function.to_string(),
        })
    }
}

/// A volume-holding compartment that resistors move volume between.
pub trait Compartment {
    /// Volume (L)
    fn volume(&self) -> f64;

    /// Pressure from the last step (mmHg)
    fn pressure(&self) -> f64;

    /// Add `dvol` liters coming from `source`, blending carried content.
    fn volume_in(&mut self, dvol: f64, source: &dyn Compartment);

    /// Remove `dvol` liters. Returns the part that could not be removed.
    fn volume_out(&mut self, dvol: f64) -> f64;

    /// Add a one-shot external pressure consumed by the next pressure update.
    fn add_external_pressure(&mut self, pres: f64);

    fn blood(&self) -> Option<&BloodContent> {
        None
    }

    fn blood_mut(&mut self) -> Option<&mut BloodContent> {
        None
    }

    fn gas(&self) -> Option<&GasContent> {
        None
    }

    fn gas_mut(&mut self) -> Option<&mut GasContent> {
        None
    }
}

/// Components whose flow can be switched on and off.
pub trait FlowControllable {
    fn flow(&self) -> f64;

    fn no_flow(&self) -> bool;

    fn set_no_flow(&mut self, no_flow: bool);

    fn no_back_flow(&self) -> bool;

    fn set_no_back_flow(&mut self, no_back_flow: bool);
}
