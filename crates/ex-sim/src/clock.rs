//! Interval clocks driven by the modeling step.
//!
//! Tasks and samples run on coarser grids than the model itself. A clock
//! accumulates step sizes and fires once the accumulated time reaches its
//! interval, then restarts from zero.

use serde::{Deserialize, Serialize};

/// Slack absorbing float noise when accumulated steps hit the interval.
const INTERVAL_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalClock {
    /// Firing interval in seconds.
    pub interval: f64,
    /// Time accumulated since the last firing.
    pub elapsed: f64,
}

impl IntervalClock {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            elapsed: 0.0,
        }
    }

    /// Whether the clock fires on this step. Always advances by `dt`.
    pub fn tick(&mut self, dt: f64) -> bool {
        let due = self.elapsed + INTERVAL_EPS >= self.interval;
        if due {
            self.elapsed = 0.0;
        }
        self.elapsed += dt;
        due
    }

    /// Change the interval. Accumulated time is kept.
    pub fn set_interval(&mut self, interval: f64) {
        self.interval = interval;
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}
