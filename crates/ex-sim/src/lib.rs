//! ex-sim: driving a built model through time.
//!
//! Provides:
//! - [`Engine`], the fixed-step loop over a [`ModelGraph`](ex_graph::ModelGraph)
//! - [`TaskScheduler`] for delayed and ramped property changes
//! - [`DataCollector`] for fast and slow watch-lists
//! - [`IntervalClock`], the sub-clock shared by both

pub mod clock;
pub mod collector;
pub mod engine;
pub mod error;
pub mod scheduler;

pub use clock::IntervalClock;
pub use collector::{DataCollector, Sample, Watch};
pub use engine::{Engine, EngineConfig};
pub use error::{SimError, SimResult};
pub use scheduler::{Task, TaskAction, TaskRequest, TaskScheduler};
