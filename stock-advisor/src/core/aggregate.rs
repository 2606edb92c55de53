//! The aggregate result of one pipeline run.

use super::{StageResult, StageValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// One positional entry of a sequence-shaped aggregate.
///
/// An object carrying `output` or `raw` reads as [`TaskOutput::Wrapped`];
/// anything else is a bare value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum TaskOutput {
    /// An entry that wraps the stage value in named fields.
    Wrapped(StageRecord),
    /// A bare value.
    Bare(StageValue),
}

impl From<Value> for TaskOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key("output") || map.contains_key("raw") => {
                Self::Wrapped(StageRecord::from_map(map))
            }
            other => Self::Bare(StageValue::from_json(other)),
        }
    }
}

impl From<TaskOutput> for Value {
    fn from(item: TaskOutput) -> Self {
        match item {
            TaskOutput::Wrapped(record) => record.to_json(),
            TaskOutput::Bare(value) => value.into(),
        }
    }
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wrapped(record) => write!(f, "{}", record.to_json()),
            Self::Bare(value) => write!(f, "{value}"),
        }
    }
}

/// A wrapped per-stage record exposing `output` and/or `raw`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageRecord {
    /// Name of the producing stage, when the producer reports it.
    pub name: Option<String>,
    /// The stage's processed output.
    pub output: Option<StageValue>,
    /// The stage's raw text.
    pub raw: Option<String>,
    /// Other fields the producer attached, kept for display.
    pub extra: Map<String, Value>,
}

impl StageRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stage name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the output field.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<StageValue>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Sets the raw field.
    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Reads a producer's record. Null fields count as absent and a
    /// non-string `raw` keeps its JSON text.
    fn from_map(mut map: Map<String, Value>) -> Self {
        let output = map
            .remove("output")
            .filter(|v| !v.is_null())
            .map(StageValue::from_json);
        let raw = match map.remove("raw") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        let name = match map.remove("name") {
            Some(Value::String(s)) => Some(s),
            Some(other) => {
                map.insert("name".to_string(), other);
                None
            }
            None => None,
        };
        Self {
            name,
            output,
            raw,
            extra: map,
        }
    }

    fn to_json(&self) -> Value {
        let mut map = self.extra.clone();
        if let Some(ref name) = self.name {
            map.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(ref output) = self.output {
            map.insert("output".to_string(), output.to_json());
        }
        if let Some(ref raw) = self.raw {
            map.insert("raw".to_string(), Value::String(raw.clone()));
        }
        Value::Object(map)
    }
}

/// Every stage output of a run, in one of the two shapes producers emit.
///
/// The runner in this crate always produces [`AggregateRunResult::ByName`];
/// `ByPosition` exists for producers that report per-stage records in
/// declaration order. On the wire a JSON object is name-keyed, an array is
/// positional and null is an empty run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum AggregateRunResult {
    /// Outputs keyed by stage name.
    ByName(BTreeMap<String, StageValue>),
    /// Outputs aligned with declared stage order.
    ByPosition(Vec<TaskOutput>),
}

impl Default for AggregateRunResult {
    fn default() -> Self {
        Self::ByName(BTreeMap::new())
    }
}

impl TryFrom<Value> for AggregateRunResult {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::ByName(
                map.into_iter()
                    .map(|(name, value)| (name, StageValue::from_json(value)))
                    .collect(),
            )),
            Value::Array(items) => Ok(Self::ByPosition(items.into_iter().map(TaskOutput::from).collect())),
            Value::Null => Ok(Self::default()),
            other => Err(format!("run result must be an object or an array, got {other}")),
        }
    }
}

impl From<AggregateRunResult> for Value {
    fn from(aggregate: AggregateRunResult) -> Self {
        aggregate.to_json()
    }
}

impl AggregateRunResult {
    /// Builds a name-keyed aggregate from completed stage results.
    #[must_use]
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a StageResult>) -> Self {
        Self::ByName(
            results
                .into_iter()
                .map(|r| (r.stage.clone(), r.value.clone()))
                .collect(),
        )
    }

    /// Returns the number of stage entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::ByName(map) => map.len(),
            Self::ByPosition(items) => items.len(),
        }
    }

    /// Returns true if the aggregate holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts the aggregate to JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::ByName(map) => Value::Object(
                map.iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
            Self::ByPosition(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        TaskOutput::Wrapped(record) => record.to_json(),
                        TaskOutput::Bare(value) => value.to_json(),
                    })
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for AggregateRunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "{}", self.to_json())
    }
}
