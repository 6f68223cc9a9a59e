//! Time-delayed property mutations and deferred function calls.
//!
//! Tasks are evaluated on the scheduler's own interval, coarser than the
//! modeling step. A numeric task with a positive ramp duration walks its
//! target property towards the goal in equal increments, one per scheduler
//! tick. Everything else is applied in a single tick once its start delay
//! has elapsed.

use ex_components::PropertyValue;
use ex_graph::{ModelGraph, PropertyPath};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::IntervalClock;
use crate::error::{SimError, SimResult};

/// Default scheduler interval in seconds.
pub const DEFAULT_TASK_INTERVAL: f64 = 0.015;

/// Relative slack on the final ramp increment.
const RAMP_REL_TOL: f64 = 1e-9;

/// Absolute slack on the final ramp increment, in units of the operand scale.
const RAMP_ULPS: f64 = 16.0;

/// A property-set request as it arrives from a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub model: String,
    pub prop1: String,
    #[serde(default)]
    pub prop2: Option<String>,
    /// Target value.
    pub t: PropertyValue,
    /// Ramp duration in seconds; zero sets the value in one tick.
    #[serde(default)]
    pub it: f64,
    /// Start delay in seconds.
    #[serde(default)]
    pub at: f64,
}

impl TaskRequest {
    pub fn new(path: &PropertyPath, target: impl Into<PropertyValue>) -> Self {
        Self {
            model: path.model.clone(),
            prop1: path.property.clone(),
            prop2: path.sub.clone(),
            t: target.into(),
            it: 0.0,
            at: 0.0,
        }
    }

    pub fn ramp(mut self, it: f64) -> Self {
        self.it = it;
        self
    }

    pub fn delay(mut self, at: f64) -> Self {
        self.at = at;
        self
    }

    pub fn path(&self) -> PropertyPath {
        let path = PropertyPath::new(&self.model, &self.prop1);
        match &self.prop2 {
            Some(sub) => path.with_sub(sub),
            None => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskAction {
    /// Walk a numeric property from `start` to `target` in `step` increments.
    Ramp {
        path: PropertyPath,
        start: f64,
        target: f64,
        step: f64,
        ticks: u64,
    },
    /// Write a value once.
    Set {
        path: PropertyPath,
        value: PropertyValue,
    },
    /// Invoke a model function once.
    Call {
        model: String,
        function: String,
        args: Vec<PropertyValue>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub action: TaskAction,
    /// Remaining start delay in seconds.
    pub at: f64,
    pub running: bool,
}

impl Task {
    /// Value the ramp has written so far.
    pub fn current(&self) -> Option<f64> {
        match &self.action {
            TaskAction::Ramp {
                start, step, ticks, ..
            } => Some(start + *ticks as f64 * step),
            _ => None,
        }
    }
}

enum Progress {
    Pending,
    Running,
    Done,
}

#[derive(Debug, Clone)]
pub struct TaskScheduler {
    clock: IntervalClock,
    tasks: Vec<Task>,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TASK_INTERVAL)
    }
}

impl TaskScheduler {
    pub fn new(interval: f64) -> Self {
        Self {
            clock: IntervalClock::new(interval),
            tasks: Vec::new(),
        }
    }

    pub fn interval(&self) -> f64 {
        self.clock.interval
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Schedule a property change.
    ///
    /// Returns `Ok(None)` when the ramp would not move the value.
    pub fn add_task(&mut self, graph: &ModelGraph, request: &TaskRequest) -> SimResult<Option<Uuid>> {
        if !(request.it.is_finite() && request.at.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "task timing must be finite",
            });
        }
        let path = request.path();
        let current = graph.resolve(&path)?;
        let action = match (&current, &request.t) {
            (PropertyValue::Number(start), PropertyValue::Number(target)) if request.it > 0.0 => {
                let step = (target - start) / (request.it / self.interval());
                if step == 0.0 || !step.is_finite() {
                    debug!(%path, "ramp without change discarded");
                    return Ok(None);
                }
                TaskAction::Ramp {
                    path,
                    start: *start,
                    target: *target,
                    step,
                    ticks: 0,
                }
            }
            _ => TaskAction::Set {
                path,
                value: request.t.clone(),
            },
        };
        Ok(Some(self.push(action, request.at)))
    }

    /// Schedule `reference` (`model.function`) to be called after `at` seconds.
    pub fn add_function_call(
        &mut self,
        graph: &ModelGraph,
        reference: &str,
        args: Vec<PropertyValue>,
        at: f64,
    ) -> SimResult<Uuid> {
        let invalid = || SimError::InvalidFunction {
            reference: reference.to_string(),
        };
        let (model, function) = reference.split_once('.').ok_or_else(invalid)?;
        if model.is_empty() || function.is_empty() {
            return Err(invalid());
        }
        if graph.id(model).is_none() {
            return Err(ex_graph::GraphError::UnknownModel {
                name: model.to_string(),
            }
            .into());
        }
        let action = TaskAction::Call {
            model: model.to_string(),
            function: function.to_string(),
            args,
        };
        Ok(self.push(action, at))
    }

    fn push(&mut self, action: TaskAction, at: f64) -> Uuid {
        let id = Uuid::new_v4();
        self.tasks.push(Task {
            id,
            action,
            at: at.max(0.0),
            running: false,
        });
        id
    }

    pub fn remove_task(&mut self, id: Uuid) -> SimResult<()> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Err(SimError::UnknownTask { id });
        }
        Ok(())
    }

    pub fn remove_all_tasks(&mut self) {
        self.tasks.clear();
    }

    /// Advance the scheduler clock by one modeling step of `dt` seconds and
    /// process every task if the scheduler interval has elapsed.
    pub fn run(&mut self, graph: &mut ModelGraph, dt: f64) {
        if self.clock.tick(dt) {
            self.tick(graph);
        }
    }

    /// Process every task once, regardless of the clock.
    pub fn tick(&mut self, graph: &mut ModelGraph) {
        let interval = self.interval();
        self.tasks.retain_mut(|task| match advance(task, graph, interval) {
            Ok(Progress::Done) => false,
            Ok(Progress::Pending | Progress::Running) => true,
            Err(e) => {
                warn!(task = %task.id, error = %e, "task failed and was dropped");
                false
            }
        });
    }
}

fn advance(task: &mut Task, graph: &mut ModelGraph, interval: f64) -> SimResult<Progress> {
    if !task.running {
        if task.at >= interval {
            task.at -= interval;
            return Ok(Progress::Pending);
        }
        task.at = 0.0;
        match &task.action {
            TaskAction::Set { path, value } => {
                graph.set(path, value)?;
                return Ok(Progress::Done);
            }
            TaskAction::Call {
                model,
                function,
                args,
            } => {
                graph.call(model, function, args)?;
                return Ok(Progress::Done);
            }
            TaskAction::Ramp { .. } => task.running = true,
        }
    }

    let TaskAction::Ramp {
        path,
        start,
        target,
        step,
        ticks,
    } = &mut task.action
    else {
        return Ok(Progress::Done);
    };
    let current = *start + *ticks as f64 * *step;
    let remaining = (*target - current).abs();
    let slack = RAMP_REL_TOL * step.abs() + RAMP_ULPS * f64::EPSILON * (start.abs() + target.abs());
    if remaining <= step.abs() + slack {
        graph.set(path, &PropertyValue::Number(*target))?;
        return Ok(Progress::Done);
    }
    *ticks += 1;
    graph.set(path, &PropertyValue::Number(*start + *ticks as f64 * *step))?;
    Ok(Progress::Running)
}
