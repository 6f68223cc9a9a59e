//! Request and response messages exchanged with a host.
//!
//! Every message is an envelope `{type, message, payload}`. Requests use an
//! HTTP-like verb as `type` and name the target in `message`; responses use
//! the response kind as `type`. Structured payloads may arrive either as
//! JSON values or as JSON text.

use ex_components::PropertyValue;
use ex_definition::Definition;
use ex_sim::TaskRequest;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Raw request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub method: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(method: &str, message: &str, payload: Value) -> Self {
        Self {
            method: method.to_string(),
            message: message.to_string(),
            payload,
        }
    }
}

/// A deferred function call: `func` is `model.function`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub func: String,
    #[serde(default)]
    pub args: Vec<PropertyValue>,
    #[serde(default)]
    pub at: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Build(Box<Definition>),
    Start,
    Stop,
    Calculate(f64),
    Watch(Vec<String>),
    WatchSlow(Vec<String>),
    /// Remove the listed labels, or everything when empty.
    Unwatch(Vec<String>),
    UnwatchSlow(Vec<String>),
    Data,
    DataSlow,
    State,
    Property(String),
    ModelTypes,
    SetProperty(TaskRequest),
    CallFunction(FunctionCall),
    RemoveTask(Uuid),
    RemoveAllTasks,
    SampleInterval(f64),
    SampleIntervalSlow(f64),
    Save,
    Shutdown,
}

impl Request {
    pub fn from_json(raw: &str) -> AppResult<Self> {
        let envelope: Envelope = serde_json::from_str(raw).map_err(AppError::Malformed)?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> AppResult<Self> {
        let Envelope {
            method,
            message,
            payload,
        } = envelope;
        let unknown = |method: &str, message: &str| AppError::UnknownMessage {
            method: method.to_string(),
            message: message.to_string(),
        };
        let request = match method.as_str() {
            "GET" => match message.as_str() {
                "state" => Request::State,
                "data" => Request::Data,
                "data_slow" => Request::DataSlow,
                "property" | "property_value" => Request::Property(decode(&message, payload)?),
                "model_types" => Request::ModelTypes,
                _ => return Err(unknown(&method, &message)),
            },
            "PUT" => match message.as_str() {
                "sample_interval" => Request::SampleInterval(decode(&message, payload)?),
                "sample_interval_slow" => Request::SampleIntervalSlow(decode(&message, payload)?),
                "property_value" | "set_property" => {
                    Request::SetProperty(decode(&message, payload)?)
                }
                _ => return Err(unknown(&method, &message)),
            },
            "POST" => match message.as_str() {
                "build" => Request::Build(Box::new(definition(payload)?)),
                "start" => Request::Start,
                "stop" => Request::Stop,
                "calc" => Request::Calculate(decode(&message, payload)?),
                "call" | "call_function" => Request::CallFunction(decode(&message, payload)?),
                "watch" => Request::Watch(paths(&message, payload)?),
                "watch_slow" => Request::WatchSlow(paths(&message, payload)?),
                "save" => Request::Save,
                "shutdown" => Request::Shutdown,
                _ => return Err(unknown(&method, &message)),
            },
            "DELETE" => match message.as_str() {
                "watchlist" | "unwatch" => Request::Unwatch(paths(&message, payload)?),
                "watchlist_slow" | "unwatch_slow" => Request::UnwatchSlow(paths(&message, payload)?),
                "task" | "remove_task" => Request::RemoveTask(decode(&message, payload)?),
                "tasks" | "remove_all_tasks" => Request::RemoveAllTasks,
                _ => return Err(unknown(&method, &message)),
            },
            _ => return Err(AppError::UnknownMethod { method }),
        };
        Ok(request)
    }
}

fn decode<T: DeserializeOwned>(message: &str, payload: Value) -> AppResult<T> {
    let payload_error = |source| AppError::Payload {
        message: message.to_string(),
        source,
    };
    match serde_json::from_value::<T>(payload.clone()) {
        Ok(v) => Ok(v),
        Err(first) => match payload {
            Value::String(text) => serde_json::from_str(&text).map_err(payload_error),
            _ => Err(payload_error(first)),
        },
    }
}

/// A single path, a list of paths, or nothing.
fn paths(message: &str, payload: Value) -> AppResult<Vec<String>> {
    match payload {
        Value::Null => Ok(Vec::new()),
        Value::String(path) if !path.trim_start().starts_with('[') => Ok(vec![path]),
        other => decode(message, other),
    }
}

fn definition(payload: Value) -> AppResult<Definition> {
    let definition = match payload {
        Value::String(text) => ex_definition::from_json_str(&text)?,
        other => ex_definition::from_value(other)?,
    };
    Ok(definition)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Status,
    ModelReady,
    BuildFailed,
    RtStart,
    RtStop,
    Data,
    DataSlow,
    Rtf,
    Rts,
    State,
    SavedState,
    PropValue,
    ModelTypes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub payload: Value,
}

impl Response {
    pub fn new(kind: ResponseKind, payload: Value) -> Self {
        Self {
            kind,
            message: String::new(),
            payload,
        }
    }

    pub fn signal(kind: ResponseKind) -> Self {
        Self::new(kind, Value::Array(Vec::new()))
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Status,
            message: message.into(),
            payload: Value::Array(Vec::new()),
        }
    }

    pub fn error(err: &AppError) -> Self {
        Self::status(format!("ERROR: {err}"))
    }

    pub fn is_error(&self) -> bool {
        self.kind == ResponseKind::Status && self.message.starts_with("ERROR")
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
