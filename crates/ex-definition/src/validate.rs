//! Structural validation of definitions.
//!
//! Only the shape is checked here. Whether a `model_type` is registered is a
//! build-time question answered by the graph.

use std::collections::HashSet;

use crate::schema::{Definition, ModelMap};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate model name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Model '{key}' declares name '{name}'")]
    NameMismatch { key: String, name: String },

    #[error("Model '{name}' has an empty model_type")]
    MissingModelType { name: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

pub fn validate_definition(definition: &Definition) -> Result<(), ValidationError> {
    let dt = definition.modeling_stepsize;
    if !dt.is_finite() || dt <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "modeling_stepsize".to_string(),
            value: dt.to_string(),
            reason: "must be positive and finite".to_string(),
        });
    }

    if let Some(weight) = definition.weight
        && (!weight.is_finite() || weight <= 0.0)
    {
        return Err(ValidationError::InvalidValue {
            field: "weight".to_string(),
            value: weight.to_string(),
            reason: "must be positive and finite".to_string(),
        });
    }

    // sub-components share one namespace with top-level models
    let mut seen = HashSet::new();
    validate_models(&definition.models, "models", &mut seen)
}

fn validate_models<'a>(
    models: &'a ModelMap,
    context: &str,
    seen: &mut HashSet<&'a str>,
) -> Result<(), ValidationError> {
    for (key, def) in models.iter() {
        if !seen.insert(key) {
            return Err(ValidationError::DuplicateName {
                name: key.to_string(),
                context: context.to_string(),
            });
        }
        if let Some(name) = &def.name
            && name != key
        {
            return Err(ValidationError::NameMismatch {
                key: key.to_string(),
                name: name.clone(),
            });
        }
        if def.model_type.trim().is_empty() {
            return Err(ValidationError::MissingModelType {
                name: key.to_string(),
            });
        }
        if !def.components.is_empty() {
            validate_models(&def.components, &format!("components of '{key}'"), seen)?;
        }
    }
    Ok(())
}
