//! Error types for the host boundary.

use ex_definition::DefinitionError;
use ex_sim::SimError;

/// Errors surfaced to a host, either as a `status` response or as a
/// returned value from the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Malformed request: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Unknown request method '{method}'")]
    UnknownMethod { method: String },

    #[error("Unknown request '{method} {message}'")]
    UnknownMessage { method: String, message: String },

    #[error("Invalid payload for '{message}': {source}")]
    Payload {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Model definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Simulation: {0}")]
    Sim(#[from] SimError),

    #[error("Could not watch: {paths}")]
    WatchRejected { paths: String },

    #[error("Model is not initialized")]
    NotInitialized,

    #[error("Model build failed with {count} error(s)")]
    BuildFailed { count: usize },

    #[error("Engine worker has stopped")]
    WorkerGone,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ex-app operations.
pub type AppResult<T> = Result<T, AppError>;
