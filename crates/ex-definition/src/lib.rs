//! ex-definition: model definition documents and their validation.
//!
//! A definition is the declarative input to a graph build: top-level
//! simulation parameters plus an ordered `models` map whose entries may nest
//! further `components`.

pub mod error;
pub mod schema;
pub mod validate;

pub use error::{DefinitionError, DefinitionResult};
pub use schema::*;
pub use validate::{ValidationError, validate_definition};

use std::path::Path;

pub fn from_json_str(content: &str) -> DefinitionResult<Definition> {
    let definition: Definition = serde_json::from_str(content)?;
    validate_definition(&definition)?;
    Ok(definition)
}

pub fn from_value(value: serde_json::Value) -> DefinitionResult<Definition> {
    let definition: Definition = serde_json::from_value(value)?;
    validate_definition(&definition)?;
    Ok(definition)
}

pub fn load_json(path: &Path) -> DefinitionResult<Definition> {
    let content = std::fs::read_to_string(path)?;
    from_json_str(&content)
}

pub fn save_json(path: &Path, definition: &Definition) -> DefinitionResult<()> {
    validate_definition(definition)?;
    let content = serde_json::to_string_pretty(definition)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_yaml(path: &Path) -> DefinitionResult<Definition> {
    let content = std::fs::read_to_string(path)?;
    let definition: Definition = serde_yaml::from_str(&content)?;
    validate_definition(&definition)?;
    Ok(definition)
}

pub fn save_yaml(path: &Path, definition: &Definition) -> DefinitionResult<()> {
    validate_definition(definition)?;
    let content = serde_yaml::to_string(definition)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension: `.yaml`/`.yml` as YAML, everything else as JSON.
pub fn load(path: &Path) -> DefinitionResult<Definition> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => load_yaml(path),
        _ => load_json(path),
    }
}
