//! Request handling against one engine, independent of threads and timers.

use ex_core::steps_for;
use ex_graph::model_types;
use ex_sim::{Engine, EngineConfig, Sample};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::protocol::{Request, Response, ResponseKind};
use crate::saved_state::SavedState;

/// Real-time pacing of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Wall-clock period of one burst of model steps (s).
    pub rt_interval: f64,
    /// Period of the slow stream (s).
    pub rt_slow_interval: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            rt_interval: 0.015,
            rt_slow_interval: 1.0,
        }
    }
}

/// One engine plus the real-time bookkeeping around it.
#[derive(Debug)]
pub struct Session {
    engine: Engine,
    config: DriverConfig,
    running: bool,
    slow_elapsed: f64,
}

impl Session {
    pub fn new(engine_config: EngineConfig, config: DriverConfig) -> Self {
        Self {
            engine: Engine::new(engine_config),
            config,
            running: false,
            slow_elapsed: 0.0,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Parse and handle one raw request. Malformed input yields a status error.
    pub fn handle_json(&mut self, raw: &str) -> Vec<Response> {
        match Request::from_json(raw) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!(error = %e, "rejected request");
                vec![Response::error(&e)]
            }
        }
    }

    pub fn handle(&mut self, request: Request) -> Vec<Response> {
        let mut out = Vec::new();
        if let Err(e) = self.dispatch(request, &mut out) {
            warn!(error = %e, "request failed");
            out.push(Response::error(&e));
        }
        out
    }

    fn dispatch(&mut self, request: Request, out: &mut Vec<Response>) -> AppResult<()> {
        match request {
            Request::Build(definition) => self.build(&definition, out),
            Request::Start => {
                self.require_initialized()?;
                self.running = true;
                self.slow_elapsed = 0.0;
                info!("realtime model started");
                out.push(Response::signal(ResponseKind::RtStart));
                out.push(Response::status("realtime model started"));
            }
            Request::Stop => {
                if self.engine.is_initialized() {
                    self.running = false;
                    info!("realtime model stopped");
                    out.push(Response::signal(ResponseKind::RtStop));
                    out.push(Response::status("realtime model stopped"));
                }
            }
            Request::Calculate(seconds) => self.calculate(seconds, out)?,
            Request::Watch(paths) => self.watch(&paths, false)?,
            Request::WatchSlow(paths) => self.watch(&paths, true)?,
            Request::Unwatch(labels) if labels.is_empty() => self.engine.clear_watchlist(),
            Request::Unwatch(labels) => {
                for label in &labels {
                    self.engine.unwatch(label);
                }
            }
            Request::UnwatchSlow(labels) if labels.is_empty() => {
                self.engine.clear_watchlist_slow()
            }
            Request::UnwatchSlow(labels) => {
                for label in &labels {
                    self.engine.unwatch_slow(label);
                }
            }
            Request::Data => {
                let samples = self.engine.drain();
                out.push(samples_response(ResponseKind::Data, &samples)?);
            }
            Request::DataSlow => {
                let samples = self.engine.drain_slow();
                out.push(samples_response(ResponseKind::DataSlow, &samples)?);
            }
            Request::State => out.push(Response::new(ResponseKind::State, self.engine.state())),
            Request::Property(path) => {
                let value = self.engine.get_property(&path)?;
                out.push(Response::new(
                    ResponseKind::PropValue,
                    json!({ "prop": path, "value": value }),
                ));
            }
            Request::ModelTypes => {
                out.push(Response::new(ResponseKind::ModelTypes, json!(model_types())));
            }
            Request::SetProperty(task) => {
                self.require_initialized()?;
                self.engine.set_property(&task)?;
            }
            Request::CallFunction(call) => {
                self.require_initialized()?;
                self.engine.call_function(&call.func, call.args, call.at)?;
            }
            Request::RemoveTask(id) => self.engine.remove_task(id)?,
            Request::RemoveAllTasks => self.engine.remove_all_tasks(),
            Request::SampleInterval(interval) => self.engine.set_sample_interval(interval)?,
            Request::SampleIntervalSlow(interval) => {
                self.engine.set_sample_interval_slow(interval)?
            }
            Request::Save => {
                self.require_initialized()?;
                let saved = SavedState::capture(&self.engine);
                out.push(Response::new(ResponseKind::SavedState, saved.to_value()?));
            }
            Request::Shutdown => {
                self.running = false;
            }
        }
        Ok(())
    }

    fn require_initialized(&self) -> AppResult<()> {
        if self.engine.is_initialized() {
            Ok(())
        } else {
            Err(AppError::NotInitialized)
        }
    }

    /// Register every valid path, then report the rejected ones together.
    fn watch(&mut self, paths: &[String], slow: bool) -> AppResult<()> {
        self.require_initialized()?;
        let rejected: Vec<&str> = paths
            .iter()
            .filter_map(|path| {
                let result = if slow {
                    self.engine.watch_slow(path)
                } else {
                    self.engine.watch(path)
                };
                let e = result.err()?;
                debug!(%path, error = %e, "watch path rejected");
                Some(path.as_str())
            })
            .collect();
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(AppError::WatchRejected {
                paths: rejected.join(", "),
            })
        }
    }

    fn build(&mut self, definition: &ex_definition::Definition, out: &mut Vec<Response>) {
        self.running = false;
        let report = self.engine.build(definition);
        for error in &report.errors {
            out.push(Response::status(format!("ERROR: {error}")));
        }
        if report.is_ok() {
            info!(models = report.models, "model build successful");
            out.push(Response::signal(ResponseKind::ModelReady));
            out.push(Response::status("model build successful"));
        } else {
            warn!(errors = report.errors.len(), "model build failed");
            out.push(Response::new(
                ResponseKind::BuildFailed,
                json!(report.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>()),
            ));
            out.push(Response::status("ERROR: model build failed"));
        }
    }

    fn calculate(&mut self, seconds: f64, out: &mut Vec<Response>) -> AppResult<()> {
        self.require_initialized()?;
        let steps = steps_for(seconds, self.engine.dt()).map_err(ex_sim::SimError::from)?;
        out.push(Response::status(format!(
            "calculating {seconds} sec. in {steps} steps."
        )));
        let summary = self.engine.calculate(seconds)?;
        out.push(Response::status(format!(
            "calculation ready in {:.1} ms with a model step time of {:.4} ms",
            summary.total_s * 1e3,
            summary.per_step_s * 1e3
        )));
        let fast = self.engine.drain();
        out.push(samples_response(ResponseKind::Data, &fast)?);
        let slow = self.engine.drain_slow();
        out.push(samples_response(ResponseKind::DataSlow, &slow)?);
        out.push(Response::new(ResponseKind::State, self.engine.state()));
        self.engine.prune();
        Ok(())
    }

    /// Run one real-time burst: `rt_interval` worth of model steps, then
    /// stream the fast buffer and, when due, the slow one.
    pub fn burst(&mut self) -> AppResult<Vec<Response>> {
        if !self.running {
            return Ok(Vec::new());
        }
        let steps = steps_for(self.config.rt_interval, self.engine.dt())
            .map_err(ex_sim::SimError::from)?;
        for _ in 0..steps {
            self.engine.step()?;
        }
        let mut out = Vec::with_capacity(2);
        let fast = self.engine.drain();
        out.push(samples_response(ResponseKind::Rtf, &fast)?);
        if self.slow_elapsed > self.config.rt_slow_interval {
            self.slow_elapsed = 0.0;
            let slow = self.engine.drain_slow();
            out.push(samples_response(ResponseKind::Rts, &slow)?);
        }
        self.slow_elapsed += self.config.rt_interval;
        Ok(out)
    }
}

fn samples_response(kind: ResponseKind, samples: &[Sample]) -> AppResult<Response> {
    let payload: Value = serde_json::to_value(samples)?;
    Ok(Response::new(kind, payload))
}
