//! Definition schema.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Integration timestep used when a definition does not set one (s).
pub const DEFAULT_MODELING_STEPSIZE: f64 = 0.0005;

/// Keys of a model entry that describe the entry rather than set a property.
pub const META_KEYS: [&str; 6] = [
    "model_type",
    "name",
    "description",
    "is_enabled",
    "components",
    "model_interface",
];

fn default_stepsize() -> f64 {
    DEFAULT_MODELING_STEPSIZE
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Definition {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default = "default_stepsize")]
    pub modeling_stepsize: f64,
    /// Body weight (kg)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub models: ModelMap,
    /// Any other top-level parameters, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Definition {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            modeling_stepsize: DEFAULT_MODELING_STEPSIZE,
            weight: None,
            models: ModelMap::default(),
            extra: Map::new(),
        }
    }
}

impl Definition {
    /// Every entry in registration order, parents before their components.
    pub fn flatten(&self) -> Vec<(&str, &ModelDef)> {
        let mut out = Vec::new();
        self.models.collect_into(&mut out);
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDef {
    pub model_type: String,
    /// Optional copy of the map key; must match it when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub is_enabled: bool,
    /// Sub-components owned by this entry, registered under their own keys.
    #[serde(default, skip_serializing_if = "ModelMap::is_empty")]
    pub components: ModelMap,
    /// Property values applied after the sub-components were built.
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl ModelDef {
    pub fn new(model_type: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            name: None,
            description: String::new(),
            is_enabled: true,
            components: ModelMap::default(),
            properties: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_component(mut self, name: impl Into<String>, def: ModelDef) -> Self {
        self.components.insert(name, def);
        self
    }
}

/// Ordered map of model entries keyed by instance name.
///
/// Keeps document order and, unlike a plain map, keeps duplicate keys so that
/// validation can report them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelMap {
    entries: Vec<(String, ModelDef)>,
}

impl ModelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ModelDef> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ModelDef> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }

    /// Replace the entry with this name, or append a new one.
    pub fn insert(&mut self, name: impl Into<String>, def: ModelDef) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = def,
            None => self.entries.push((name, def)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelDef)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<(&'a str, &'a ModelDef)>) {
        for (name, def) in &self.entries {
            out.push((name.as_str(), def));
            def.components.collect_into(out);
        }
    }
}

impl<S: Into<String>> FromIterator<(S, ModelDef)> for ModelMap {
    fn from_iter<I: IntoIterator<Item = (S, ModelDef)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, d)| (n.into(), d)).collect(),
        }
    }
}

impl Serialize for ModelMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, def) in &self.entries {
            map.serialize_entry(name, def)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ModelMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ModelMapVisitor;

        impl<'de> Visitor<'de> for ModelMapVisitor {
            type Value = ModelMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of model name to model entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ModelMap, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, def)) = access.next_entry::<String, ModelDef>()? {
                    entries.push((name, def));
                }
                Ok(ModelMap { entries })
            }
        }

        deserializer.deserialize_map(ModelMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "name": "neonate",
        "weight": 3.5,
        "ncc_atrial": 0,
        "models": {
            "LV": {"model_type": "BloodTimeVaryingElastance", "el_min": 5.0},
            "PERICARDIUM": {
                "model_type": "Container",
                "contained_components": ["LV"],
                "components": {
                    "PERI_FLUID": {"model_type": "Capacitance", "vol": 0.001}
                }
            },
            "AA": {"model_type": "BloodCapacitance", "is_enabled": false}
        }
    }"#;

    #[test]
    fn parses_models_in_document_order() {
        let def: Definition = serde_json::from_str(DOC).unwrap();
        let names: Vec<_> = def.models.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["LV", "PERICARDIUM", "AA"]);
        assert_eq!(def.modeling_stepsize, DEFAULT_MODELING_STEPSIZE);
        assert_eq!(def.weight, Some(3.5));
        assert!(def.extra.contains_key("ncc_atrial"));
        assert!(!def.models.get("AA").unwrap().is_enabled);
    }

    #[test]
    fn flatten_lists_parents_before_components() {
        let def: Definition = serde_json::from_str(DOC).unwrap();
        let names: Vec<_> = def.flatten().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["LV", "PERICARDIUM", "PERI_FLUID", "AA"]);
    }

    #[test]
    fn properties_exclude_meta_keys() {
        let def: Definition = serde_json::from_str(DOC).unwrap();
        let peri = def.models.get("PERICARDIUM").unwrap();
        assert!(peri.properties.contains_key("contained_components"));
        assert!(!peri.properties.contains_key("components"));
        assert!(!peri.properties.contains_key("model_type"));
    }

    #[test]
    fn duplicate_keys_survive_parsing() {
        let doc = r#"{"models": {"A": {"model_type": "Capacitance"}, "A": {"model_type": "Resistor"}}}"#;
        let def: Definition = serde_json::from_str(doc).unwrap();
        assert_eq!(def.models.len(), 2);
    }

    #[test]
    fn builder_serializes_flat_entries() {
        let def = ModelDef::new("Resistor")
            .with("comp_from", "A")
            .with("r_for", 10.0);
        let v = serde_json::to_value(&def).unwrap();
        assert_eq!(v["model_type"], "Resistor");
        assert_eq!(v["r_for"], 10.0);
        assert!(v.get("is_enabled").is_none());
        assert!(v.get("components").is_none());
    }
}
