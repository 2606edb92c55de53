//! Stage specifications.

use serde::{Deserialize, Serialize};

/// The expected shape of a stage's structured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Schema name, e.g. "InvestmentDecision".
    pub name: String,
    /// Fields a well-formed output carries.
    pub required_fields: Vec<String>,
}

impl OutputSchema {
    /// Creates a new schema.
    #[must_use]
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            required_fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the required fields absent from a record.
    #[must_use]
    pub fn missing_fields(&self, record: &serde_json::Map<String, serde_json::Value>) -> Vec<String> {
        self.required_fields
            .iter()
            .filter(|field| record.get(field.as_str()).map_or(true, serde_json::Value::is_null))
            .cloned()
            .collect()
    }
}

/// Specification for a single stage in a pipeline.
///
/// Immutable once declared into a [`super::StageGraph`], which assigns the
/// ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// Position in declaration order.
    pub ordinal: usize,
    /// Names of stages this stage depends on, in declaration order.
    pub dependencies: Vec<String>,
    /// Expected output shape, if the stage produces a structured record.
    pub output_schema: Option<OutputSchema>,
}

impl StageSpec {
    /// Creates a new stage specification.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordinal: 0,
            dependencies: Vec::new(),
            output_schema: None,
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies.clear();
        for dep in deps {
            self = self.with_dependency(dep);
        }
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        let dep = dep.into();
        if !self.dependencies.contains(&dep) {
            self.dependencies.push(dep);
        }
        self
    }

    /// Sets the expected output schema.
    #[must_use]
    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Returns true if the stage can run alongside other stages of the first tier.
    #[must_use]
    pub fn is_concurrent(&self) -> bool {
        self.dependencies.is_empty()
    }
}
