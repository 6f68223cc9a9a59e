//! Real-time driver: a worker thread that owns the engine.
//!
//! The host talks to the worker only through channels. Requests are handled
//! in arrival order; while the model runs in real time the worker wakes every
//! `rt_interval` of wall time for one burst of model steps and streams the
//! collected samples back. Stopping only prevents the next burst.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ex_sim::EngineConfig;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::protocol::{Request, Response};
use crate::session::{DriverConfig, Session};

pub struct Driver {
    requests: Sender<Request>,
    responses: Receiver<Response>,
    status: Sender<Response>,
    handle: Option<JoinHandle<()>>,
}

impl Driver {
    pub fn spawn(engine_config: EngineConfig, config: DriverConfig) -> Self {
        let (request_tx, request_rx) = channel();
        let (response_tx, response_rx) = channel();
        let status = response_tx.clone();

        let handle = thread::spawn(move || {
            let session = Session::new(engine_config, config);
            run_worker(session, &request_rx, &response_tx);
            debug!("engine worker finished");
        });

        Self {
            requests: request_tx,
            responses: response_rx,
            status,
            handle: Some(handle),
        }
    }

    pub fn send(&self, request: Request) -> AppResult<()> {
        self.requests.send(request).map_err(|_| AppError::WorkerGone)
    }

    /// Send a raw envelope. A malformed one is answered with a status error
    /// on the response stream instead of reaching the worker.
    pub fn send_json(&self, raw: &str) -> AppResult<()> {
        match Request::from_json(raw) {
            Ok(request) => self.send(request),
            Err(e) => {
                warn!(error = %e, "rejected request");
                self.status
                    .send(Response::error(&e))
                    .map_err(|_| AppError::WorkerGone)
            }
        }
    }

    /// Wait up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Response> {
        self.responses.recv_timeout(timeout).ok()
    }

    /// Every response that is ready now.
    pub fn try_iter(&self) -> impl Iterator<Item = Response> + '_ {
        self.responses.try_iter()
    }

    /// Ask the worker to finish and wait for it.
    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        let _ = self.requests.send(Request::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("engine worker panicked");
            }
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn run_worker(mut session: Session, requests: &Receiver<Request>, responses: &Sender<Response>) {
    let interval = Duration::from_secs_f64(session.config().rt_interval.max(1e-4));
    let mut next_burst: Option<Instant> = None;

    loop {
        let received = match next_burst {
            Some(at) => requests
                .recv_timeout(at.saturating_duration_since(Instant::now()))
                .map_err(|e| match e {
                    RecvTimeoutError::Timeout => TryRecvError::Empty,
                    RecvTimeoutError::Disconnected => TryRecvError::Disconnected,
                }),
            None => requests.recv().map_err(|_| TryRecvError::Disconnected),
        };

        match received {
            Ok(Request::Shutdown) => break,
            Ok(request) => {
                if !deliver(responses, session.handle(request)) {
                    break;
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        next_burst = match (session.is_running(), next_burst) {
            (false, _) => None,
            (true, None) => {
                info!(interval_s = interval.as_secs_f64(), "realtime bursts scheduled");
                Some(Instant::now() + interval)
            }
            (true, Some(at)) if Instant::now() >= at => {
                let out = match session.burst() {
                    Ok(out) => out,
                    Err(e) => {
                        warn!(error = %e, "realtime burst failed");
                        vec![Response::error(&e)]
                    }
                };
                if !deliver(responses, out) {
                    break;
                }
                Some(at + interval)
            }
            (true, pending) => pending,
        };
    }
}

/// False once the host has gone away.
fn deliver(responses: &Sender<Response>, out: Vec<Response>) -> bool {
    out.into_iter().all(|r| responses.send(r).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResponseKind;
    use ex_definition::{Definition, ModelDef};

    fn definition() -> Definition {
        let mut def = Definition {
            modeling_stepsize: 0.005,
            ..Definition::default()
        };
        def.models.insert("A", ModelDef::new("Capacitance").with("vol", 1.0));
        def
    }

    fn wait_for(driver: &Driver, kind: ResponseKind) -> Option<Response> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(r) = driver.recv_timeout(Duration::from_millis(50)) {
                if r.kind == kind {
                    return Some(r);
                }
            }
        }
        None
    }

    #[test]
    fn realtime_run_streams_fast_data() {
        let driver = Driver::spawn(EngineConfig::default(), DriverConfig::default());
        driver.send(Request::Build(Box::new(definition()))).unwrap();
        assert!(wait_for(&driver, ResponseKind::ModelReady).is_some());
        driver.send(Request::Watch(vec!["A.vol".into()])).unwrap();
        driver.send(Request::Start).unwrap();
        assert!(wait_for(&driver, ResponseKind::RtStart).is_some());
        let rtf = wait_for(&driver, ResponseKind::Rtf).unwrap();
        assert!(rtf.payload.is_array());
        driver.send(Request::Stop).unwrap();
        assert!(wait_for(&driver, ResponseKind::RtStop).is_some());
        driver.shutdown();
    }

    #[test]
    fn malformed_json_is_answered_not_fatal() {
        let driver = Driver::spawn(EngineConfig::default(), DriverConfig::default());
        driver.send_json("][").unwrap();
        let status = wait_for(&driver, ResponseKind::Status).unwrap();
        assert!(status.is_error());
        driver
            .send_json(r#"{"type":"GET","message":"model_types"}"#)
            .unwrap();
        let types = wait_for(&driver, ResponseKind::ModelTypes).unwrap();
        assert!(types.payload.as_array().is_some_and(|a| !a.is_empty()));
    }
}
