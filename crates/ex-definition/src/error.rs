use crate::validate::ValidationError;

pub type DefinitionResult<T> = Result<T, DefinitionError>;

#[derive(thiserror::Error, Debug)]
pub enum DefinitionError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
