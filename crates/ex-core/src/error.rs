use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Failures of the shared numeric helpers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
