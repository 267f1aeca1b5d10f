// src/protocol.rs

//! Host side of the driver stdout protocol.
//!
//! A driver writes one JSON value per line, normally an object. Each
//! non-blank line is decoded into a [`ProgressObject`], handed to the
//! caller's progress callback, and remembered as the candidate result of the
//! invocation.

use std::fmt;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const STATUS_NODATA: &str = "nodata";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_CANCELED: &str = "canceled";
pub const STATUS_TERMINATED: &str = "terminated";
pub const REASON_UNKNOWN: &str = "unknown";

/// One decoded stdout line, and also the shape of the final result.
///
/// Recognized keys are `status`, `message`, `progress` and `reason`; any
/// other key is passed through untouched. A driver may also print a bare
/// non-object value (an array, a number...); it is carried as-is and simply
/// has none of the recognized keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressObject(Value);

impl Default for ProgressObject {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObject {
    pub fn new() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// `{"status": <status>}`
    pub fn with_status(status: &str) -> Self {
        let mut obj = Self::new();
        obj.insert("status", Value::from(status));
        obj
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set `key`. A non-object value is first replaced by an empty object.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }
        match &mut self.0 {
            Value::Object(map) => map.insert(key.to_string(), value.into()),
            _ => None,
        }
    }

    /// True when the value carries nothing (`null`, `{}`, `0`...).
    pub fn is_empty(&self) -> bool {
        !is_truthy(&self.0)
    }

    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    pub fn status(&self) -> Option<&str> {
        self.get("status").and_then(Value::as_str)
    }

    pub fn message(&self) -> Option<&str> {
        self.get("message").and_then(Value::as_str)
    }

    pub fn reason(&self) -> Option<&str> {
        self.get("reason").and_then(Value::as_str)
    }

    pub fn progress(&self) -> Option<f64> {
        self.get("progress").and_then(Value::as_f64)
    }

    /// True when `key` is missing or holds an empty/falsy JSON value.
    pub fn is_unset(&self, key: &str) -> bool {
        self.get(key).is_none_or(|v| !is_truthy(v))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Map<String, Value>> for ProgressObject {
    fn from(map: Map<String, Value>) -> Self {
        Self(Value::Object(map))
    }
}

impl From<Value> for ProgressObject {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for ProgressObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Outcome of decoding a single stdout line.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Blank line, or a JSON value that carries nothing (`null`, `{}`, `0`...).
    Skip,
    Progress(ProgressObject),
}

/// Decode one raw stdout line.
///
/// Fails only when the line is not exactly one JSON value; the returned
/// string says why.
pub fn decode_line(raw: &str) -> std::result::Result<Decoded, String> {
    let line = raw.trim();
    if line.is_empty() {
        return Ok(Decoded::Skip);
    }

    let value: Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    if !is_truthy(&value) {
        return Ok(Decoded::Skip);
    }
    Ok(Decoded::Progress(ProgressObject(value)))
}

/// Feeds decoded lines to the progress callback and keeps the last object.
///
/// The dispatcher itself never stops: a callback asking to abort is reported
/// back to the caller, which decides how to wind the driver down.
#[derive(Debug, Default)]
pub struct LineDispatcher {
    last: Option<ProgressObject>,
    delivered: usize,
}

/// What happened to one line handed to [`LineDispatcher::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Skipped,
    Delivered,
    AbortRequested,
}

impl LineDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch<F>(
        &mut self,
        raw: &str,
        on_progress: &mut F,
    ) -> std::result::Result<Dispatch, String>
    where
        F: FnMut(&ProgressObject) -> ControlFlow<()>,
    {
        let obj = match decode_line(raw)? {
            Decoded::Skip => return Ok(Dispatch::Skipped),
            Decoded::Progress(obj) => obj,
        };

        let flow = on_progress(&obj);
        self.delivered += 1;
        self.last = Some(obj);

        Ok(match flow {
            ControlFlow::Continue(()) => Dispatch::Delivered,
            ControlFlow::Break(()) => Dispatch::AbortRequested,
        })
    }

    pub fn last(&self) -> Option<&ProgressObject> {
        self.last.as_ref()
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn into_candidate(self) -> Option<ProgressObject> {
        self.last
    }
}

/// JSON "truthiness": null, false, zero, and empty strings/arrays/objects are
/// all considered empty.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
