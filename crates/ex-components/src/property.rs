//! Typed property values and name-based property access.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ComponentError, ComponentResult};

/// A dynamically addressed property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
    Table(BTreeMap<String, f64>),
}

impl PropertyValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Number(_) => "number",
            PropertyValue::Text(_) => "text",
            PropertyValue::List(_) => "list",
            PropertyValue::Table(_) => "table",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Number(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

/// Name-based access to a component's state.
///
/// `sub` addresses one entry of a table-valued property, e.g. `solutes.na`.
pub trait Properties {
    fn property(&self, key: &str, sub: Option<&str>) -> Option<PropertyValue>;

    fn set_property(
        &mut self,
        key: &str,
        sub: Option<&str>,
        value: &PropertyValue,
    ) -> ComponentResult<()>;
}

fn mismatch(key: &str, expected: &'static str, value: &PropertyValue) -> ComponentError {
    ComponentError::TypeMismatch {
        property: key.to_string(),
        expected,
        found: value.type_name(),
    }
}

pub(crate) fn number(key: &str, value: &PropertyValue) -> ComponentResult<f64> {
    value.as_number().ok_or_else(|| mismatch(key, "number", value))
}

pub(crate) fn boolean(key: &str, value: &PropertyValue) -> ComponentResult<bool> {
    value.as_bool().ok_or_else(|| mismatch(key, "bool", value))
}

pub(crate) fn text(key: &str, value: &PropertyValue) -> ComponentResult<String> {
    value
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| mismatch(key, "text", value))
}

pub(crate) fn list(key: &str, value: &PropertyValue) -> ComponentResult<Vec<String>> {
    match value {
        PropertyValue::List(v) => Ok(v.clone()),
        _ => Err(mismatch(key, "list", value)),
    }
}

/// Read a table property, or one entry of it when `sub` is given.
pub(crate) fn table_get(table: &BTreeMap<String, f64>, sub: Option<&str>) -> Option<PropertyValue> {
    match sub {
        None => Some(PropertyValue::Table(table.clone())),
        Some(entry) => table.get(entry).copied().map(PropertyValue::Number),
    }
}

/// Replace a table property, or set one entry of it when `sub` is given.
pub(crate) fn table_set(
    table: &mut BTreeMap<String, f64>,
    key: &str,
    sub: Option<&str>,
    value: &PropertyValue,
) -> ComponentResult<()> {
    match (sub, value) {
        (Some(entry), _) => {
            table.insert(entry.to_string(), number(key, value)?);
        }
        (None, PropertyValue::Table(t)) => *table = t.clone(),
        (None, other) => return Err(mismatch(key, "table", other)),
    }
    Ok(())
}

/// Try `first`; fall through to `second` only when `first` does not know the key.
pub(crate) fn chain_set(
    first: ComponentResult<()>,
    second: impl FnOnce() -> ComponentResult<()>,
) -> ComponentResult<()> {
    match first {
        Err(ComponentError::UnknownProperty { .. }) => second(),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_json_shapes() {
        let v: PropertyValue = serde_json::from_str("1").unwrap();
        assert_eq!(v, PropertyValue::Number(1.0));
        let v: PropertyValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, PropertyValue::Bool(true));
        let v: PropertyValue = serde_json::from_str("[\"LA\", \"LV\"]").unwrap();
        assert_eq!(v, PropertyValue::List(vec!["LA".into(), "LV".into()]));
        let v: PropertyValue = serde_json::from_str("{\"na\": 138}").unwrap();
        assert!(matches!(v, PropertyValue::Table(_)));
    }

    #[test]
    fn table_entry_round_trip() {
        let mut table = BTreeMap::new();
        table_set(&mut table, "solutes", Some("na"), &138.0.into()).unwrap();
        assert_eq!(table_get(&table, Some("na")), Some(PropertyValue::Number(138.0)));
        assert_eq!(table_get(&table, Some("k")), None);
        assert!(table_set(&mut table, "solutes", None, &1.0.into()).is_err());
    }

    #[test]
    fn number_rejects_bool() {
        let err = number("vol", &PropertyValue::Bool(true)).unwrap_err();
        assert!(matches!(err, ComponentError::TypeMismatch { expected: "number", .. }));
    }
}
