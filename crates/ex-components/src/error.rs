//! Error types for component operations.

use ex_chem::ChemError;
use thiserror::Error;

/// Errors that can occur during component calculations and property access.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Unknown property '{property}'")]
    UnknownProperty { property: String },

    #[error("Property '{property}' expects {expected}, got {found}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Referenced component '{name}' ({role}) not found")]
    MissingReference { name: String, role: &'static str },

    #[error("Component '{name}' ({role}) holds no {content}")]
    WrongContent {
        name: String,
        role: &'static str,
        content: &'static str,
    },

    #[error("Unknown model type '{model_type}'")]
    UnknownModelType { model_type: String },

    #[error("Unknown function '{function}'")]
    UnknownFunction { function: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Equilibrium solver: {0}")]
    Chem(#[from] ChemError),
}

pub type ComponentResult<T> = Result<T, ComponentError>;

impl ComponentError {
    pub(crate) fn unknown(property: &str) -> Self {
        ComponentError::UnknownProperty {
            property: property.to_string(),
        }
    }

    pub(crate) fn missing(name: &str, role: &'static str) -> Self {
        ComponentError::MissingReference {
            name: name.to_string(),
            role,
        }
    }

    pub(crate) fn wrong_content(name: &str, role: &'static str, content: &'static str) -> Self {
        ComponentError::WrongContent {
            name: name.to_string(),
            role,
            content,
        }
    }
}
