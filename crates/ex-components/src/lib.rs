//! ex-components: per-step behaviors of the simulation components.
//!
//! Components refer to each other by name. While one component steps it sees
//! the rest of the graph through [`Network`], so links can move volume and
//! content between two other components without shared ownership.
//!
//! - compartments: [`Capacitance`], [`TimeVaryingElastance`] and their blood
//!   and gas variants
//! - links: [`Resistor`], [`BloodDiffusor`], [`GasDiffusor`], [`GasExchanger`]
//! - aggregation: [`Container`]
//! - [`Model`] / [`ModelKind`]: the closed registry used by the graph

pub mod blood;
pub mod capacitance;
pub mod common;
pub mod container;
pub mod diffusor;
pub mod error;
pub mod factors;
pub mod gas;
pub mod gas_exchanger;
pub mod model;
pub mod property;
pub mod resistor;
pub mod time_varying;
pub mod traits;

#[cfg(test)]
mod testing;

pub use blood::{BloodCapacitance, BloodContent, BloodTimeVaryingElastance};
pub use capacitance::Capacitance;
pub use container::Container;
pub use diffusor::{BloodDiffusor, GasDiffusor};
pub use error::{ComponentError, ComponentResult};
pub use factors::{Factor, FactorSet, FactorWeights, Scaling};
pub use gas::{GasCapacitance, GasContent};
pub use gas_exchanger::GasExchanger;
pub use model::{Model, ModelKind};
pub use property::{Properties, PropertyValue};
pub use resistor::Resistor;
pub use time_varying::TimeVaryingElastance;
pub use traits::{Behavior, Compartment, FlowControllable, Network, StepContext};
