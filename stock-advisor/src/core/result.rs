//! Values produced by stage executors.

use super::StageStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The value an executor produced for a stage.
///
/// Executors are free to return prose, a structured record, or anything
/// else that serializes to JSON. The resolver only ever sees these three
/// shapes. Serializes as the plain JSON it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum StageValue {
    /// Plain text.
    Text(String),
    /// A structured record with named fields.
    Record(Map<String, Value>),
    /// Any other JSON value.
    Opaque(Value),
}

impl Default for StageValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl StageValue {
    /// Creates a text value.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Classifies an arbitrary JSON value.
    ///
    /// Strings become text and objects become records.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            Value::Object(map) => Self::Record(map),
            other => Self::Opaque(other),
        }
    }

    /// Returns true if there is nothing to show for this value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Record(map) => map.is_empty(),
            Self::Opaque(Value::Null) => true,
            Self::Opaque(Value::String(s)) => s.is_empty(),
            Self::Opaque(Value::Array(items)) => items.is_empty(),
            Self::Opaque(Value::Object(map)) => map.is_empty(),
            Self::Opaque(_) => false,
        }
    }

    /// Returns the named field of a record-like value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Record(map) | Self::Opaque(Value::Object(map)) => map.get(name),
            _ => None,
        }
    }

    /// Converts the value back into JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Record(map) => Value::Object(map.clone()),
            Self::Opaque(value) => value.clone(),
        }
    }
}

impl fmt::Display for StageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Opaque(Value::String(s)) => f.write_str(s),
            Self::Record(map) => write!(f, "{}", Value::Object(map.clone())),
            Self::Opaque(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for StageValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StageValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for StageValue {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

impl From<StageValue> for Value {
    fn from(value: StageValue) -> Self {
        match value {
            StageValue::Text(s) => Self::String(s),
            StageValue::Record(map) => Self::Object(map),
            StageValue::Opaque(value) => value,
        }
    }
}

/// A stage's value together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// The stage that produced the value.
    pub stage: String,
    /// The produced value.
    pub value: StageValue,
    /// Whether the executor succeeded.
    #[serde(default)]
    pub status: StageStatus,
    /// Failure description for degraded results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    /// Creates a successful result.
    #[must_use]
    pub fn new(stage: impl Into<String>, value: impl Into<StageValue>) -> Self {
        Self {
            stage: stage.into(),
            value: value.into(),
            status: StageStatus::Ok,
            error: None,
        }
    }

    /// Creates a degraded result with an empty value.
    #[must_use]
    pub fn degraded(stage: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            value: StageValue::default(),
            status: StageStatus::Degraded,
            error: Some(error.into()),
        }
    }

    /// Returns true if the executor produced its own value.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
