//! Completed dependency outputs handed to a dependent stage.

use crate::core::{StageResult, StageValue};
use std::collections::BTreeMap;

/// An immutable view of the completed outputs a stage depends on.
///
/// Empty for stages without dependencies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamContext {
    outputs: BTreeMap<String, StageValue>,
}

impl UpstreamContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the named dependencies from completed results.
    ///
    /// Dependencies without a completed result are left out.
    #[must_use]
    pub fn from_completed<'a>(
        dependencies: impl IntoIterator<Item = &'a String>,
        completed: &BTreeMap<String, StageResult>,
    ) -> Self {
        let outputs = dependencies
            .into_iter()
            .filter_map(|dep| completed.get(dep).map(|r| (dep.clone(), r.value.clone())))
            .collect();
        Self { outputs }
    }

    /// Adds an output. Used by executors and tests that build context by hand.
    #[must_use]
    pub fn with_output(mut self, stage: impl Into<String>, value: impl Into<StageValue>) -> Self {
        self.outputs.insert(stage.into(), value.into());
        self
    }

    /// Gets the output of a dependency.
    #[must_use]
    pub fn get(&self, stage: &str) -> Option<&StageValue> {
        self.outputs.get(stage)
    }

    /// Checks if output exists for a stage.
    #[must_use]
    pub fn contains(&self, stage: &str) -> bool {
        self.outputs.contains_key(stage)
    }

    /// Returns the dependency names in sorted order.
    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Iterates over dependency outputs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageValue)> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of dependency outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Returns true if there are no dependency outputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Converts to a JSON object keyed by stage name.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.outputs
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}
