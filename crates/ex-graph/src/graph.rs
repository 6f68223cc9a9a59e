//! Component arena with a name-indexed handle map.

use std::collections::HashMap;

use ex_components::{
    Behavior, ComponentError, Model, ModelKind, Network, Properties, PropertyValue, StepContext,
};
use ex_core::ComponentId;
use serde_json::{Map, Value};

use crate::error::{GraphError, GraphResult};
use crate::path::PropertyPath;

/// One registered component and its graph-level flags.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub kind: ModelKind,
    pub description: String,
    pub is_enabled: bool,
    /// All properties applied without error.
    pub is_initialized: bool,
    /// Owning entry for declared sub-components.
    pub parent: Option<ComponentId>,
    /// Names of the sub-components this entry owns.
    pub components: Vec<String>,
    /// Empty only while the component is being stepped.
    pub(crate) model: Option<Model>,
}

impl Entry {
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }
}

/// The model graph: every component in registration order, addressable by
/// name. Registration order is step order.
#[derive(Debug, Clone)]
pub struct ModelGraph {
    pub name: String,
    pub description: String,
    /// Integration timestep (s)
    pub modeling_stepsize: f64,
    /// Body weight (kg)
    pub weight: Option<f64>,
    /// Top-level definition parameters the kernel does not interpret.
    pub extra: Map<String, Value>,
    pub(crate) entries: Vec<Entry>,
    pub(crate) index: HashMap<String, ComponentId>,
    pub(crate) initialized: bool,
}

impl Default for ModelGraph {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            modeling_stepsize: ex_definition::DEFAULT_MODELING_STEPSIZE,
            weight: None,
            extra: Map::new(),
            entries: Vec::new(),
            index: HashMap::new(),
            initialized: false,
        }
    }
}

impl ModelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// True after a build without errors.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn id(&self, name: &str) -> Option<ComponentId> {
        self.index.get(name).copied()
    }

    /// Handles in registration order.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        (0..self.entries.len()).filter_map(ComponentId::from_index)
    }

    pub fn entry(&self, id: ComponentId) -> Option<&Entry> {
        self.entries.get(id.index())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    fn entry_by_name(&self, name: &str) -> GraphResult<&Entry> {
        self.id(name)
            .and_then(|id| self.entries.get(id.index()))
            .ok_or_else(|| GraphError::UnknownModel {
                name: name.to_string(),
            })
    }

    fn entry_by_name_mut(&mut self, name: &str) -> GraphResult<&mut Entry> {
        let id = self.id(name).ok_or_else(|| GraphError::UnknownModel {
            name: name.to_string(),
        })?;
        self.entries
            .get_mut(id.index())
            .ok_or_else(|| GraphError::UnknownModel {
                name: name.to_string(),
            })
    }

    fn model_of_mut(&mut self, name: &str) -> GraphResult<&mut Model> {
        self.entry_by_name_mut(name)?
            .model
            .as_mut()
            .ok_or_else(|| GraphError::Busy {
                name: name.to_string(),
            })
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.entry_by_name(name).is_ok_and(|e| e.is_enabled)
    }

    /// Enabled and initialized: the component takes part in stepping.
    pub fn is_active(&self, id: ComponentId) -> bool {
        self.entry(id)
            .is_some_and(|e| e.is_enabled && e.is_initialized)
    }

    /// Current value at `path`.
    pub fn resolve(&self, path: &PropertyPath) -> GraphResult<PropertyValue> {
        let entry = self.entry_by_name(&path.model)?;
        let unknown = || GraphError::UnknownProperty {
            path: path.to_string(),
        };
        match (path.property.as_str(), &path.sub) {
            ("is_enabled", None) => Ok(PropertyValue::Bool(entry.is_enabled)),
            ("model_type", None) => Ok(PropertyValue::Text(entry.kind.to_string())),
            (property, sub) => entry
                .model
                .as_ref()
                .and_then(|m| m.property(property, sub.as_deref()))
                .ok_or_else(unknown),
        }
    }

    /// Parse and resolve a dotted path.
    pub fn resolve_str(&self, path: &str) -> GraphResult<PropertyValue> {
        self.resolve(&path.parse()?)
    }

    /// Numeric value at `path`.
    pub fn number(&self, path: &PropertyPath) -> GraphResult<f64> {
        match self.resolve(path)? {
            PropertyValue::Number(v) => Ok(v),
            other => Err(GraphError::component(
                &path.model,
                ComponentError::TypeMismatch {
                    property: path.property.clone(),
                    expected: "number",
                    found: other.type_name(),
                },
            )),
        }
    }

    pub fn set(&mut self, path: &PropertyPath, value: &PropertyValue) -> GraphResult<()> {
        if path.property == "is_enabled" && path.sub.is_none() {
            let entry = self.entry_by_name_mut(&path.model)?;
            entry.is_enabled = value.as_bool().ok_or_else(|| {
                GraphError::component(
                    &path.model,
                    ComponentError::TypeMismatch {
                        property: path.property.clone(),
                        expected: "bool",
                        found: value.type_name(),
                    },
                )
            })?;
            return Ok(());
        }
        self.model_of_mut(&path.model)?
            .set_property(&path.property, path.sub.as_deref(), value)
            .map_err(|e| GraphError::component(&path.model, e))
    }

    /// Invoke `function` on the named model.
    ///
    /// `enable`/`disable` act on the graph entry and `open`/`close` on any
    /// flow-controllable component; everything else goes to the model.
    pub fn call(&mut self, model: &str, function: &str, args: &[PropertyValue]) -> GraphResult<()> {
        match function {
            "enable" | "disable" => {
                self.entry_by_name_mut(model)?.is_enabled = function == "enable";
                Ok(())
            }
            "open" | "close" => {
                let flow = self
                    .model_of_mut(model)?
                    .as_flow_controllable_mut()
                    .ok_or_else(|| GraphError::NotFlowControllable {
                        name: model.to_string(),
                    })?;
                flow.set_no_flow(function == "close");
                Ok(())
            }
            _ => self
                .model_of_mut(model)?
                .call(function, args)
                .map_err(|e| GraphError::component(model, e)),
        }
    }

    /// Advance one component by `dt`, letting it reach the others by name.
    pub fn step_component(&mut self, id: ComponentId, dt: f64, time: f64) -> GraphResult<()> {
        let slot = id.index();
        let entry = self.entries.get_mut(slot).ok_or(GraphError::NotInitialized)?;
        let name = entry.name.clone();
        let mut model = entry.model.take().ok_or_else(|| GraphError::Busy {
            name: name.clone(),
        })?;
        let result = {
            let mut ctx = StepContext {
                dt,
                time,
                network: self,
            };
            model.step(&mut ctx)
        };
        self.entries[slot].model = Some(model);
        result.map_err(|e| GraphError::component(&name, e))
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn register(&mut self, entry: Entry) -> Option<ComponentId> {
        let id = ComponentId::from_index(self.entries.len())?;
        self.index.insert(entry.name.clone(), id);
        self.entries.push(entry);
        Some(id)
    }

    pub(crate) fn entry_mut(&mut self, id: ComponentId) -> Option<&mut Entry> {
        self.entries.get_mut(id.index())
    }

    fn slot_of(&self, name: &str) -> Option<usize> {
        self.id(name).map(ComponentId::index)
    }
}

impl Network for ModelGraph {
    fn model(&self, name: &str) -> Option<&Model> {
        self.slot_of(name)
            .and_then(|i| self.entries.get(i))
            .and_then(|e| e.model.as_ref())
    }

    fn model_mut(&mut self, name: &str) -> Option<&mut Model> {
        let i = self.slot_of(name)?;
        self.entries.get_mut(i).and_then(|e| e.model.as_mut())
    }

    fn pair_mut(&mut self, first: &str, second: &str) -> Option<(&mut Model, &mut Model)> {
        let (i, j) = (self.slot_of(first)?, self.slot_of(second)?);
        if i == j {
            return None;
        }
        let (lo, hi) = (i.min(j), i.max(j));
        let (left, right) = self.entries.split_at_mut(hi);
        let a = left.get_mut(lo)?.model.as_mut()?;
        let b = right.first_mut()?.model.as_mut()?;
        Some(if i < j { (a, b) } else { (b, a) })
    }
}

/// Names of every registered component kind.
pub fn model_types() -> Vec<&'static str> {
    ModelKind::ALL.iter().map(|k| k.as_str()).collect()
}
