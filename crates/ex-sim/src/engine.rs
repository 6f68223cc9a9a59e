//! The stepping engine: one graph, one scheduler, one collector, one clock.

use std::collections::BTreeSet;

use ex_components::PropertyValue;
use ex_core::{ComponentId, Timer, TimingSummary, steps_for};
use ex_definition::{DEFAULT_MODELING_STEPSIZE, Definition};
use ex_graph::{BuildReport, ModelGraph, PropertyPath};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collector::{DEFAULT_SAMPLE_INTERVAL, DEFAULT_SAMPLE_INTERVAL_SLOW, DataCollector, Sample};
use crate::error::{SimError, SimResult};
use crate::scheduler::{DEFAULT_TASK_INTERVAL, TaskRequest, TaskScheduler};

/// Intervals of the engine's sub-clocks, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub task_interval: f64,
    pub sample_interval: f64,
    pub sample_interval_slow: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            task_interval: DEFAULT_TASK_INTERVAL,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            sample_interval_slow: DEFAULT_SAMPLE_INTERVAL_SLOW,
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    graph: ModelGraph,
    scheduler: TaskScheduler,
    collector: DataCollector,
    config: EngineConfig,
    time: f64,
    steps: u64,
    step_failures: u64,
    failing: BTreeSet<ComponentId>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// An engine holding an empty, uninitialized graph.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            graph: ModelGraph::new(),
            scheduler: TaskScheduler::new(config.task_interval),
            collector: DataCollector::new(config.sample_interval, config.sample_interval_slow),
            config,
            time: 0.0,
            steps: 0,
            step_failures: 0,
            failing: BTreeSet::new(),
        }
    }

    pub fn from_definition(definition: &Definition, config: EngineConfig) -> (Self, BuildReport) {
        let mut engine = Self::new(config);
        let report = engine.build(definition);
        (engine, report)
    }

    /// Replace the model. Tasks, watch-lists and the clock start over.
    pub fn build(&mut self, definition: &Definition) -> BuildReport {
        let report = self.graph.build(definition);
        self.scheduler = TaskScheduler::new(self.config.task_interval);
        self.collector = DataCollector::new(
            self.config.sample_interval,
            self.config.sample_interval_slow,
        );
        self.time = 0.0;
        self.steps = 0;
        self.step_failures = 0;
        self.failing.clear();
        report
    }

    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut ModelGraph {
        &mut self.graph
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn collector(&self) -> &DataCollector {
        &self.collector
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.graph.is_initialized()
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Component steps that returned an error since the last build.
    pub fn step_failures(&self) -> u64 {
        self.step_failures
    }

    pub fn dt(&self) -> f64 {
        if self.graph.modeling_stepsize > 0.0 {
            self.graph.modeling_stepsize
        } else {
            DEFAULT_MODELING_STEPSIZE
        }
    }

    /// Advance the model by one modeling step.
    ///
    /// A component whose step fails is logged and skipped; the rest of the
    /// graph still advances.
    pub fn step(&mut self) -> SimResult<()> {
        if !self.graph.is_initialized() {
            return Err(SimError::NotInitialized);
        }
        let dt = self.dt();
        let ids: Vec<ComponentId> = self.graph.ids().collect();
        for id in ids {
            if !self.graph.is_active(id) {
                continue;
            }
            match self.graph.step_component(id, dt, self.time) {
                Ok(()) => {
                    if self.failing.remove(&id) {
                        debug!(component = id.index(), "component recovered");
                    }
                }
                Err(e) => {
                    self.step_failures += 1;
                    if self.failing.insert(id) {
                        warn!(time = self.time, error = %e, "component step failed");
                    }
                }
            }
        }
        self.collector.collect(&self.graph, self.time, dt);
        self.scheduler.run(&mut self.graph, dt);
        self.time += dt;
        self.steps += 1;
        Ok(())
    }

    /// Run `seconds` of model time without yielding.
    pub fn calculate(&mut self, seconds: f64) -> SimResult<TimingSummary> {
        if !self.graph.is_initialized() {
            return Err(SimError::NotInitialized);
        }
        let steps = steps_for(seconds, self.dt())?;
        let timer = Timer::start("calculate");
        for _ in 0..steps {
            self.step()?;
        }
        let summary = timer.stop(steps);
        info!(
            seconds,
            steps,
            per_step_ms = summary.per_step_s * 1e3,
            "calculation ready"
        );
        Ok(summary)
    }

    pub fn get_property(&self, path: &str) -> SimResult<PropertyValue> {
        Ok(self.graph.resolve_str(path)?)
    }

    pub fn set_property(&mut self, request: &TaskRequest) -> SimResult<Option<Uuid>> {
        self.scheduler.add_task(&self.graph, request)
    }

    /// Set `path` to `value` in the next scheduler tick.
    pub fn set_value(
        &mut self,
        path: &str,
        value: impl Into<PropertyValue>,
    ) -> SimResult<Option<Uuid>> {
        let path: PropertyPath = path.parse()?;
        self.set_property(&TaskRequest::new(&path, value))
    }

    pub fn call_function(
        &mut self,
        reference: &str,
        args: Vec<PropertyValue>,
        at: f64,
    ) -> SimResult<Uuid> {
        self.scheduler
            .add_function_call(&self.graph, reference, args, at)
    }

    pub fn remove_task(&mut self, id: Uuid) -> SimResult<()> {
        self.scheduler.remove_task(id)
    }

    pub fn remove_all_tasks(&mut self) {
        self.scheduler.remove_all_tasks();
    }

    pub fn watch(&mut self, path: &str) -> SimResult<bool> {
        self.collector.register(&self.graph, path)
    }

    pub fn watch_slow(&mut self, path: &str) -> SimResult<bool> {
        self.collector.register_slow(&self.graph, path)
    }

    pub fn unwatch(&mut self, label: &str) -> bool {
        self.collector.unregister(label)
    }

    pub fn unwatch_slow(&mut self, label: &str) -> bool {
        self.collector.unregister_slow(label)
    }

    pub fn clear_watchlist(&mut self) {
        self.collector.clear_watchlist();
    }

    pub fn clear_watchlist_slow(&mut self) {
        self.collector.clear_watchlist_slow();
    }

    pub fn set_sample_interval(&mut self, interval: f64) -> SimResult<()> {
        self.collector.set_sample_interval(interval)?;
        self.config.sample_interval = interval;
        Ok(())
    }

    pub fn set_sample_interval_slow(&mut self, interval: f64) -> SimResult<()> {
        self.collector.set_sample_interval_slow(interval)?;
        self.config.sample_interval_slow = interval;
        Ok(())
    }

    pub fn drain(&mut self) -> Vec<Sample> {
        self.collector.drain()
    }

    pub fn drain_slow(&mut self) -> Vec<Sample> {
        self.collector.drain_slow()
    }

    pub fn prune(&mut self) -> usize {
        self.collector.prune(&self.graph)
    }

    pub fn state(&self) -> serde_json::Value {
        self.graph.state()
    }

    pub fn saved_definition(&self) -> Definition {
        self.graph.saved_definition()
    }
}
