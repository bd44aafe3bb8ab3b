//! The envelope — the unit of work flowing through the pipeline.
//!
//! An [`Envelope`] carries an opaque string identifier (for tracing, not
//! ordering) and a heterogeneous keyed payload. Stages communicate only
//! through envelopes: a source creates one per accepted input, each stage
//! mutates it in place, and exactly one stage owns it at any time.
//!
//! Payload access comes in two flavors:
//!
//! - **Strict** (`get_*`): returns [`PipelineError::KeyNotFound`] or
//!   [`PipelineError::TypeMismatch`] so callers can distinguish "no data"
//!   from "wrong shape of data".
//! - **Lenient** (`as_*` via [`Value`], or `try_get_*`): returns `None` on
//!   any miss, for stages that treat absent data as skippable.

use crate::error::{PipelineError, Result};
use ndarray::ArrayD;
use std::collections::HashMap;

/// One value in an envelope's payload.
///
/// The variant set is closed: stages agree on these kinds and nothing else
/// crosses a stage boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer value (counters, class indices, dimensions).
    Int(i32),
    /// Single-precision float (scores, confidences).
    Float(f32),
    /// Double-precision float (timestamps, accumulated metrics).
    Double(f64),
    /// Text (labels, file paths).
    Text(String),
    /// Raw image/tensor buffer (sensor frames, feature maps).
    Tensor(ArrayD<f32>),
    /// Opaque byte sequence (encoded frames, serialized blobs).
    Bytes(Vec<u8>),
}

/// Discriminant of a [`Value`], used in type-mismatch diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Double,
    Text,
    Tensor,
    Bytes,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Text => "text",
            ValueKind::Tensor => "tensor",
            ValueKind::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Text(_) => ValueKind::Text,
            Value::Tensor(_) => ValueKind::Tensor,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&ArrayD<f32>> {
        match self {
            Value::Tensor(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<ArrayD<f32>> for Value {
    fn from(v: ArrayD<f32>) -> Self {
        Value::Tensor(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// The typed, heterogeneous key/value carrier passed between stages.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    /// Unique identifier, stable for the envelope's lifetime.
    id: String,
    /// Payload. Keys are unique; insertion order is irrelevant.
    data: HashMap<String, Value>,
}

impl Envelope {
    /// Create an empty envelope with an empty id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty envelope with the given id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: HashMap::new(),
        }
    }

    /// The envelope's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the envelope's identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Insert a value, overwriting any existing value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Whether the payload contains `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Number of payload entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Strict untyped retrieval.
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.data.get(key).ok_or_else(|| PipelineError::KeyNotFound {
            key: key.to_string(),
        })
    }

    /// Lenient untyped retrieval.
    pub fn try_get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Remove and return the value under `key`, if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Clear the entire payload. The id is untouched.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    // --- Strict typed retrieval ---

    pub fn get_int(&self, key: &str) -> Result<i32> {
        let value = self.get(key)?;
        value.as_int().ok_or_else(|| PipelineError::TypeMismatch {
            key: key.to_string(),
            expected: ValueKind::Int,
            found: value.kind(),
        })
    }

    pub fn get_float(&self, key: &str) -> Result<f32> {
        let value = self.get(key)?;
        value.as_float().ok_or_else(|| PipelineError::TypeMismatch {
            key: key.to_string(),
            expected: ValueKind::Float,
            found: value.kind(),
        })
    }

    pub fn get_double(&self, key: &str) -> Result<f64> {
        let value = self.get(key)?;
        value.as_double().ok_or_else(|| PipelineError::TypeMismatch {
            key: key.to_string(),
            expected: ValueKind::Double,
            found: value.kind(),
        })
    }

    pub fn get_text(&self, key: &str) -> Result<&str> {
        let value = self.get(key)?;
        value.as_text().ok_or_else(|| PipelineError::TypeMismatch {
            key: key.to_string(),
            expected: ValueKind::Text,
            found: value.kind(),
        })
    }

    pub fn get_tensor(&self, key: &str) -> Result<&ArrayD<f32>> {
        let value = self.get(key)?;
        value.as_tensor().ok_or_else(|| PipelineError::TypeMismatch {
            key: key.to_string(),
            expected: ValueKind::Tensor,
            found: value.kind(),
        })
    }

    pub fn get_bytes(&self, key: &str) -> Result<&[u8]> {
        let value = self.get(key)?;
        value.as_bytes().ok_or_else(|| PipelineError::TypeMismatch {
            key: key.to_string(),
            expected: ValueKind::Bytes,
            found: value.kind(),
        })
    }

    // --- Lenient typed retrieval ---

    pub fn try_get_int(&self, key: &str) -> Option<i32> {
        self.try_get(key)?.as_int()
    }

    pub fn try_get_float(&self, key: &str) -> Option<f32> {
        self.try_get(key)?.as_float()
    }

    pub fn try_get_double(&self, key: &str) -> Option<f64> {
        self.try_get(key)?.as_double()
    }

    pub fn try_get_text(&self, key: &str) -> Option<&str> {
        self.try_get(key)?.as_text()
    }

    pub fn try_get_tensor(&self, key: &str) -> Option<&ArrayD<f32>> {
        self.try_get(key)?.as_tensor()
    }

    pub fn try_get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.try_get(key)?.as_bytes()
    }
}
