//! Definition-shaped exports of a running model.

use std::path::Path;

use ex_definition::Definition;
use ex_sim::Engine;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// A snapshot that can be fed straight back into a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    /// RFC 3339 wall-clock time of the save.
    pub saved_at: String,
    /// Model time at the save (s).
    pub model_time: f64,
    pub definition: Definition,
}

impl SavedState {
    pub fn capture(engine: &Engine) -> Self {
        Self {
            saved_at: chrono::Utc::now().to_rfc3339(),
            model_time: engine.time(),
            definition: engine.saved_definition(),
        }
    }

    pub fn to_value(&self) -> AppResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn write_json(&self, path: &Path) -> AppResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
