//! Whole-graph snapshots.
//!
//! `state` is the full picture including internal effective values (keys
//! starting with `_`). `saved_definition` is definition-shaped: only what a
//! rebuild needs, with internal values stripped.

use ex_definition::{Definition, META_KEYS, ModelDef, ModelMap};
use serde_json::{Map, Value};

use crate::graph::{Entry, ModelGraph};

fn model_fields(entry: &Entry) -> Map<String, Value> {
    match entry.model().map(serde_json::to_value) {
        Some(Ok(Value::Object(fields))) => fields,
        _ => Map::new(),
    }
}

impl ModelGraph {
    /// Every component with all its fields, keyed by name in step order.
    pub fn state(&self) -> Value {
        let mut models = Map::new();
        for entry in &self.entries {
            let mut obj = Map::new();
            obj.insert("name".into(), entry.name.clone().into());
            obj.insert("model_type".into(), entry.kind.as_str().into());
            obj.insert("description".into(), entry.description.clone().into());
            obj.insert("is_enabled".into(), entry.is_enabled.into());
            obj.insert("is_initialized".into(), entry.is_initialized.into());
            obj.insert("components".into(), entry.components.clone().into());
            obj.extend(model_fields(entry));
            models.insert(entry.name.clone(), Value::Object(obj));
        }
        Value::Object(models)
    }

    /// Definition that rebuilds the current state.
    pub fn saved_definition(&self) -> Definition {
        let mut models = ModelMap::new();
        for entry in self.entries.iter().filter(|e| e.parent.is_none()) {
            models.insert(entry.name.clone(), self.saved_entry(entry));
        }
        Definition {
            name: self.name.clone(),
            description: self.description.clone(),
            modeling_stepsize: self.modeling_stepsize,
            weight: self.weight,
            models,
            extra: self.extra.clone(),
        }
    }

    fn saved_entry(&self, entry: &Entry) -> ModelDef {
        let mut def = ModelDef::new(entry.kind.as_str());
        def.description = entry.description.clone();
        def.is_enabled = entry.is_enabled;
        def.properties = model_fields(entry)
            .into_iter()
            .filter(|(k, _)| !k.starts_with('_') && !META_KEYS.contains(&k.as_str()))
            .collect();
        for child in &entry.components {
            if let Some(child_entry) = self.id(child).and_then(|id| self.entry(id)) {
                def.components
                    .insert(child.clone(), self.saved_entry(child_entry));
            }
        }
        def
    }
}
