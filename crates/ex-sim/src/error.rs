//! Error types for engine, scheduler and collector operations.

use ex_core::CoreError;
use ex_graph::GraphError;
use thiserror::Error;
use uuid::Uuid;

/// Errors encountered while driving a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Model is not initialized")]
    NotInitialized,

    #[error("Invalid function reference '{reference}', expected 'model.function'")]
    InvalidFunction { reference: String },

    #[error("No task with id {id}")]
    UnknownTask { id: Uuid },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type SimResult<T> = Result<T, SimError>;
