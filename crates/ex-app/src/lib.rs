//! Host boundary for the simulation kernel.
//!
//! This crate sits between a frontend (CLI, UI, network layer) and the
//! engine. Hosts exchange tagged messages with a [`Session`], either directly
//! or through the threaded real-time [`Driver`].

pub mod driver;
pub mod error;
pub mod protocol;
pub mod saved_state;
pub mod session;

pub use driver::Driver;
pub use error::{AppError, AppResult};
pub use protocol::{Envelope, FunctionCall, Request, Response, ResponseKind};
pub use saved_state::SavedState;
pub use session::{DriverConfig, Session};
