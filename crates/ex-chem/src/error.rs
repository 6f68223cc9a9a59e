//! Error types for equilibrium solving.

use ex_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChemError {
    #[error("Root not bracketed in [{lower}, {upper}] (f={f_lower}, {f_upper})")]
    NotBracketed {
        lower: f64,
        upper: f64,
        f_lower: f64,
        f_upper: f64,
    },

    #[error("Root finder did not converge in {iterations} iterations (last x={x})")]
    MaxIterations { iterations: usize, x: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ChemResult<T> = Result<T, ChemError>;
