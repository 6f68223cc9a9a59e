//! Graph build from a definition.
//!
//! Two passes: every entry (and, recursively, its declared sub-components) is
//! instantiated and registered first; properties are applied only when every
//! `model_type` was known. Errors are collected, never returned early, so one
//! build reports all of them.

use ex_components::{ComponentError, ModelKind, Properties, PropertyValue};
use ex_core::ComponentId;
use ex_definition::{Definition, META_KEYS, ModelDef, ModelMap};
use thiserror::Error;
use tracing::{info, warn};

use crate::graph::{Entry, ModelGraph};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("{model_type} model not found (for '{name}')")]
    UnknownModelType { name: String, model_type: String },

    #[error("Duplicate model name '{name}'")]
    DuplicateName { name: String },

    #[error("Too many models to register '{name}'")]
    ArenaFull { name: String },

    #[error("{name} ({model_type}) configuration error in '{key}': {source}")]
    Property {
        name: String,
        model_type: String,
        key: String,
        #[source]
        source: ComponentError,
    },

    #[error("{name}: '{key}' holds a value no property accepts")]
    UnsupportedValue { name: String, key: String },
}

/// Outcome of one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    /// Registered components.
    pub models: usize,
    pub errors: Vec<BuildError>,
}

impl BuildReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ModelGraph {
    /// Build a fresh graph from `definition`.
    pub fn from_definition(definition: &Definition) -> (Self, BuildReport) {
        let mut graph = Self::new();
        let report = graph.build(definition);
        (graph, report)
    }

    /// Replace the whole graph with one built from `definition`.
    ///
    /// Any error leaves the graph uninitialized.
    pub fn build(&mut self, definition: &Definition) -> BuildReport {
        self.clear();
        self.name = definition.name.clone();
        self.description = definition.description.clone();
        self.modeling_stepsize = definition.modeling_stepsize;
        self.weight = definition.weight;
        self.extra = definition.extra.clone();

        let mut report = BuildReport::default();
        self.register_all(&definition.models, None, &mut report);
        report.models = self.len();

        if report.is_ok() {
            for (name, def) in definition.flatten() {
                if let Some(id) = self.id(name) {
                    self.initialize(id, def, &mut report);
                }
            }
        }

        self.initialized = report.is_ok();
        if self.initialized {
            info!(models = report.models, "model build successful");
        } else {
            for err in &report.errors {
                warn!(%err, "model build error");
            }
            warn!(errors = report.errors.len(), "model build failed");
        }
        report
    }

    fn register_all(
        &mut self,
        models: &ModelMap,
        parent: Option<ComponentId>,
        report: &mut BuildReport,
    ) {
        for (name, def) in models.iter() {
            let kind = match def.model_type.parse::<ModelKind>() {
                Ok(kind) => kind,
                Err(_) => {
                    report.errors.push(BuildError::UnknownModelType {
                        name: name.to_string(),
                        model_type: def.model_type.clone(),
                    });
                    continue;
                }
            };
            if self.id(name).is_some() {
                report.errors.push(BuildError::DuplicateName {
                    name: name.to_string(),
                });
                continue;
            }
            let entry = Entry {
                name: name.to_string(),
                kind,
                description: def.description.clone(),
                is_enabled: def.is_enabled,
                is_initialized: false,
                parent,
                components: def.components.iter().map(|(n, _)| n.to_string()).collect(),
                model: Some(kind.instantiate()),
            };
            let Some(id) = self.register(entry) else {
                report.errors.push(BuildError::ArenaFull {
                    name: name.to_string(),
                });
                continue;
            };
            self.register_all(&def.components, Some(id), report);
        }
    }

    fn initialize(&mut self, id: ComponentId, def: &ModelDef, report: &mut BuildReport) {
        let Some(entry) = self.entry_mut(id) else {
            return;
        };
        let errors_before = report.errors.len();
        let Some(model) = entry.model.as_mut() else {
            return;
        };
        for (key, value) in &def.properties {
            if META_KEYS.contains(&key.as_str()) {
                continue;
            }
            let Ok(value) = serde_json::from_value::<PropertyValue>(value.clone()) else {
                report.errors.push(BuildError::UnsupportedValue {
                    name: entry.name.clone(),
                    key: key.clone(),
                });
                continue;
            };
            if let Err(source) = model.set_property(key, None, &value) {
                report.errors.push(BuildError::Property {
                    name: entry.name.clone(),
                    model_type: entry.kind.to_string(),
                    key: key.clone(),
                    source,
                });
            }
        }
        entry.is_initialized = report.errors.len() == errors_before;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ex_components::Network;

    fn definition() -> Definition {
        let mut def = Definition::default();
        def.models.insert("A", ModelDef::new("Capacitance").with("vol", 1.0).with("el_base", 1.0));
        def.models.insert("B", ModelDef::new("Capacitance").with("el_base", 1.0));
        def.models.insert(
            "R",
            ModelDef::new("Resistor")
                .with("comp_from", "A")
                .with("comp_to", "B"),
        );
        def
    }

    #[test]
    fn builds_in_definition_order() {
        let (graph, report) = ModelGraph::from_definition(&definition());
        assert!(report.is_ok(), "{:?}", report.errors);
        assert!(graph.is_initialized());
        assert_eq!(graph.names().collect::<Vec<_>>(), ["A", "B", "R"]);
        assert!(graph.model("R").is_some());
    }

    #[test]
    fn unknown_types_are_all_reported() {
        let mut def = definition();
        def.models.insert("V", ModelDef::new("Ventilator"));
        def.models.insert("E", ModelDef::new("Ecls"));
        let (graph, report) = ModelGraph::from_definition(&def);
        assert_eq!(report.errors.len(), 2);
        assert!(!graph.is_initialized());
        // properties are never applied after a registration failure
        assert!(graph.entries().iter().all(|e| !e.is_initialized));
    }

    #[test]
    fn property_errors_fail_the_build() {
        let mut def = definition();
        def.models.insert("C", ModelDef::new("Capacitance").with("vol", "lots").with("colour", 1.0));
        let (graph, report) = ModelGraph::from_definition(&def);
        assert_eq!(report.errors.len(), 2);
        assert!(!graph.is_initialized());
        let c = graph.entry(graph.id("C").unwrap()).unwrap();
        assert!(!c.is_initialized);
        let a = graph.entry(graph.id("A").unwrap()).unwrap();
        assert!(a.is_initialized);
    }

    #[test]
    fn sub_components_register_after_their_parent() {
        let mut def = definition();
        def.models.insert(
            "PERI",
            ModelDef::new("Container")
                .with("contained_components", serde_json::json!(["INNER"]))
                .with_component("INNER", ModelDef::new("Capacitance").with("vol", 0.1)),
        );
        let (graph, report) = ModelGraph::from_definition(&def);
        assert!(report.is_ok(), "{:?}", report.errors);
        assert_eq!(graph.names().collect::<Vec<_>>(), ["A", "B", "R", "PERI", "INNER"]);
        let peri = graph.id("PERI").unwrap();
        let inner = graph.entry(graph.id("INNER").unwrap()).unwrap();
        assert_eq!(inner.parent, Some(peri));
        assert_eq!(graph.entry(peri).unwrap().components, ["INNER"]);
    }

    #[test]
    fn rebuild_clears_previous_graph() {
        let (mut graph, _) = ModelGraph::from_definition(&definition());
        let mut def = Definition::default();
        def.models.insert("X", ModelDef::new("Capacitance"));
        let report = graph.build(&def);
        assert_eq!(report.models, 1);
        assert!(graph.id("A").is_none());
    }

    #[test]
    fn disabled_entries_build_but_stay_disabled() {
        let mut def = definition();
        let mut off = ModelDef::new("Capacitance");
        off.is_enabled = false;
        def.models.insert("OFF", off);
        let (graph, report) = ModelGraph::from_definition(&def);
        assert!(report.is_ok());
        assert!(!graph.is_enabled("OFF"));
        assert!(!graph.is_active(graph.id("OFF").unwrap()));
    }
}
