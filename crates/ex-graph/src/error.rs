//! Graph-specific error types.

use ex_components::ComponentError;
use thiserror::Error;

/// Errors from resolving, mutating or stepping a built graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Model '{name}' not found")]
    UnknownModel { name: String },

    #[error("Property '{path}' not found")]
    UnknownProperty { path: String },

    #[error("Invalid property path '{path}'")]
    InvalidPath { path: String },

    #[error("Model '{name}' has no flow to control")]
    NotFlowControllable { name: String },

    #[error("Model '{name}' is being stepped")]
    Busy { name: String },

    #[error("Model graph is not initialized")]
    NotInitialized,

    #[error("{name}: {source}")]
    Component {
        name: String,
        #[source]
        source: ComponentError,
    },
}

pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    pub(crate) fn component(name: &str, source: ComponentError) -> Self {
        GraphError::Component {
            name: name.to_string(),
            source,
        }
    }
}
