//! ex-core: stable foundation for the explain simulation kernel.
//!
//! Contains:
//! - units (physical constants and uom temperature conversion)
//! - numeric (Real + finite checks + step counting)
//! - ids (compact arena handles for components)
//! - timing (wall-clock timers for batch runs)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use timing::{Timer, TimingSummary};
pub use units::*;
