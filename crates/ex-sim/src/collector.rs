//! Watch-lists sampled at a fast and a slow rate.
//!
//! The fast list feeds waveforms, the slow list feeds trends. Each list has
//! its own interval clock and buffer. Buffers are handed out by
//! [`DataCollector::drain`] and [`DataCollector::drain_slow`], which empty
//! them, so every sample is delivered at most once.

use std::collections::BTreeMap;

use ex_components::PropertyValue;
use ex_core::round_to;
use ex_graph::{ModelGraph, PropertyPath};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::IntervalClock;
use crate::error::{SimError, SimResult};

pub const DEFAULT_SAMPLE_INTERVAL: f64 = 0.005;
pub const DEFAULT_SAMPLE_INTERVAL_SLOW: f64 = 1.0;

/// Decimals kept on sample timestamps.
const TIME_DECIMALS: i32 = 4;

/// One snapshot of a watch-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    #[serde(flatten)]
    pub values: BTreeMap<String, PropertyValue>,
}

impl Sample {
    pub fn get(&self, label: &str) -> Option<&PropertyValue> {
        self.values.get(label)
    }

    pub fn number(&self, label: &str) -> Option<f64> {
        self.get(label).and_then(PropertyValue::as_number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Watch {
    pub label: String,
    pub path: PropertyPath,
}

#[derive(Debug, Clone)]
struct WatchList {
    clock: IntervalClock,
    entries: Vec<Watch>,
    buffer: Vec<Sample>,
}

impl WatchList {
    fn new(interval: f64) -> Self {
        Self {
            clock: IntervalClock::new(interval),
            entries: Vec::new(),
            buffer: Vec::new(),
        }
    }

    fn register(&mut self, graph: &ModelGraph, path: &str) -> SimResult<bool> {
        self.buffer.clear();
        let parsed: PropertyPath = path.parse()?;
        graph.resolve(&parsed)?;
        let label = parsed.to_string();
        if self.entries.iter().any(|w| w.label == label) {
            debug!(%label, "already watched");
            return Ok(false);
        }
        self.entries.push(Watch {
            label,
            path: parsed,
        });
        Ok(true)
    }

    fn unregister(&mut self, label: &str) -> bool {
        self.buffer.clear();
        let before = self.entries.len();
        self.entries.retain(|w| w.label != label);
        self.entries.len() != before
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.buffer.clear();
    }

    fn collect(&mut self, graph: &ModelGraph, time: f64, dt: f64) {
        if !self.clock.tick(dt) {
            return;
        }
        let values = self
            .entries
            .iter()
            .filter_map(|w| graph.resolve(&w.path).ok().map(|v| (w.label.clone(), v)))
            .collect();
        self.buffer.push(Sample {
            time: round_to(time, TIME_DECIMALS),
            values,
        });
    }

    fn prune(&mut self, graph: &ModelGraph) -> usize {
        let before = self.entries.len();
        self.entries.retain(|w| graph.is_enabled(&w.path.model));
        before - self.entries.len()
    }
}

/// Samples watched properties into drainable buffers.
#[derive(Debug, Clone)]
pub struct DataCollector {
    fast: WatchList,
    slow: WatchList,
}

impl Default for DataCollector {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL, DEFAULT_SAMPLE_INTERVAL_SLOW)
    }
}

impl DataCollector {
    pub fn new(interval: f64, interval_slow: f64) -> Self {
        Self {
            fast: WatchList::new(interval),
            slow: WatchList::new(interval_slow),
        }
    }

    /// Add `path` to the fast list. `Ok(false)` if it was already watched.
    ///
    /// The fast buffer is cleared either way.
    pub fn register(&mut self, graph: &ModelGraph, path: &str) -> SimResult<bool> {
        self.fast.register(graph, path)
    }

    pub fn register_slow(&mut self, graph: &ModelGraph, path: &str) -> SimResult<bool> {
        self.slow.register(graph, path)
    }

    pub fn unregister(&mut self, label: &str) -> bool {
        self.fast.unregister(label)
    }

    pub fn unregister_slow(&mut self, label: &str) -> bool {
        self.slow.unregister(label)
    }

    pub fn clear_watchlist(&mut self) {
        self.fast.clear();
    }

    pub fn clear_watchlist_slow(&mut self) {
        self.slow.clear();
    }

    pub fn watchlist(&self) -> &[Watch] {
        &self.fast.entries
    }

    pub fn watchlist_slow(&self) -> &[Watch] {
        &self.slow.entries
    }

    pub fn sample_interval(&self) -> f64 {
        self.fast.clock.interval
    }

    pub fn sample_interval_slow(&self) -> f64 {
        self.slow.clock.interval
    }

    pub fn set_sample_interval(&mut self, interval: f64) -> SimResult<()> {
        self.fast.clock.set_interval(checked_interval(interval)?);
        Ok(())
    }

    pub fn set_sample_interval_slow(&mut self, interval: f64) -> SimResult<()> {
        self.slow.clock.set_interval(checked_interval(interval)?);
        Ok(())
    }

    /// Called once per modeling step, before the clock advances.
    pub fn collect(&mut self, graph: &ModelGraph, time: f64, dt: f64) {
        self.fast.collect(graph, time, dt);
        self.slow.collect(graph, time, dt);
    }

    pub fn drain(&mut self) -> Vec<Sample> {
        std::mem::take(&mut self.fast.buffer)
    }

    pub fn drain_slow(&mut self) -> Vec<Sample> {
        std::mem::take(&mut self.slow.buffer)
    }

    pub fn pending(&self) -> usize {
        self.fast.buffer.len()
    }

    pub fn pending_slow(&self) -> usize {
        self.slow.buffer.len()
    }

    /// Drop watches on components that have been disabled. Returns how many
    /// entries were removed from both lists together.
    pub fn prune(&mut self, graph: &ModelGraph) -> usize {
        self.fast.prune(graph) + self.slow.prune(graph)
    }
}

fn checked_interval(interval: f64) -> SimResult<f64> {
    if interval > 0.0 && interval.is_finite() {
        Ok(interval)
    } else {
        Err(SimError::InvalidArg {
            what: "sample interval must be positive and finite",
        })
    }
}
