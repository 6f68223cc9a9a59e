//! Lightweight wall-clock timing for batch calculations.

use std::time::Instant;

/// A simple timer that measures elapsed time.
#[derive(Debug)]
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Elapsed time in seconds without stopping the timer.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer and return a summary spread over `steps` iterations.
    pub fn stop(self, steps: usize) -> TimingSummary {
        let total_s = self.elapsed_s();
        let per_step_s = if steps > 0 {
            total_s / steps as f64
        } else {
            0.0
        };
        TimingSummary {
            label: self.label,
            steps,
            total_s,
            per_step_s,
        }
    }
}

/// Wall time spent on a run of fixed steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSummary {
    pub label: &'static str,
    pub steps: usize,
    pub total_s: f64,
    pub per_step_s: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_steps_reports_zero_per_step() {
        let summary = Timer::start("empty").stop(0);
        assert_eq!(summary.steps, 0);
        assert_eq!(summary.per_step_s, 0.0);
        assert_eq!(summary.label, "empty");
    }

    #[test]
    fn per_step_is_total_over_steps() {
        let summary = Timer::start("run").stop(4);
        assert!((summary.per_step_s * 4.0 - summary.total_s).abs() < 1e-12);
    }
}
