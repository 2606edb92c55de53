//! Error types for the advisor core.
//!
//! Only graph-definition and timeout errors ever reach a caller. Executor and
//! decode failures are absorbed into degraded results by the resolver and
//! the decoder.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// The main error type for advisor operations.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// The pipeline definition is invalid.
    #[error("{0}")]
    GraphDefinition(#[from] GraphDefinitionError),

    /// The run exceeded its wall-clock budget.
    #[error("{0}")]
    Timeout(#[from] TimeoutOutcome),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl AdvisorError {
    /// Returns true if this error is a run timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Metadata about a definition error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "GRAPH-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised while declaring stages into a graph.
///
/// Always raised at definition time, never while serving a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphDefinitionError {
    /// Adding the stage would close a dependency cycle.
    #[error("Cycle detected in pipeline: {}", path.join(" -> "))]
    CyclicDependency {
        /// The stages forming the cycle, first stage repeated at the end.
        path: Vec<String>,
    },

    /// A dependency names a stage that has not been declared yet.
    #[error("Stage '{stage}' depends on unknown stage '{dependency}'")]
    UnknownDependency {
        /// The stage being declared.
        stage: String,
        /// The missing dependency.
        dependency: String,
    },

    /// A stage with the same name was already declared.
    #[error("Stage '{stage}' is declared more than once")]
    DuplicateStage {
        /// The duplicated stage name.
        stage: String,
    },

    /// The graph has no stages.
    #[error("Pipeline has no stages")]
    Empty,
}

impl GraphDefinitionError {
    /// Creates a cyclic dependency error.
    #[must_use]
    pub fn cycle(path: Vec<String>) -> Self {
        Self::CyclicDependency { path }
    }

    /// Creates an unknown dependency error.
    #[must_use]
    pub fn unknown_dependency(stage: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::UnknownDependency {
            stage: stage.into(),
            dependency: dependency.into(),
        }
    }

    /// Returns diagnostic info with a stable code and a fix hint.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        match self {
            Self::CyclicDependency { path } => ContractErrorInfo::new(
                "GRAPH-CYCLE",
                format!("Pipeline contains a dependency cycle: {}", path.join(" -> ")),
            )
            .with_fix_hint("Remove one of the dependencies in the cycle to break it."),
            Self::UnknownDependency { stage, dependency } => ContractErrorInfo::new(
                "GRAPH-MISSING-DEP",
                format!("Dependency '{dependency}' not found"),
            )
            .with_fix_hint("Declare the dependency before the stage that depends on it.")
            .with_context_entry("stage", stage.clone()),
            Self::DuplicateStage { stage } => {
                ContractErrorInfo::new("GRAPH-DUPLICATE", format!("Stage '{stage}' already exists"))
                    .with_fix_hint("Give every stage a unique name.")
            }
            Self::Empty => ContractErrorInfo::new("GRAPH-EMPTY", "Cannot run an empty pipeline")
                .with_fix_hint("Declare at least one stage before running."),
        }
    }
}

/// A run exceeded its wall-clock budget and was abandoned.
///
/// No partial aggregate is attached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Analysis exceeded its time budget of {}s while waiting on tier {tier}", budget.as_secs_f64())]
pub struct TimeoutOutcome {
    /// The budget that was exceeded.
    pub budget: Duration,
    /// The tier that was still running when the deadline passed.
    pub tier: usize,
    /// Stages that had not completed.
    pub pending: Vec<String>,
}

impl TimeoutOutcome {
    /// Creates a new timeout outcome.
    #[must_use]
    pub fn new(budget: Duration, tier: usize, pending: Vec<String>) -> Self {
        Self {
            budget,
            tier,
            pending,
        }
    }
}

/// Failure reported by a stage executor.
///
/// The runner never propagates these; they degrade into an empty stage
/// result.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The executor ran but reported a failure.
    #[error("Stage '{stage}' failed: {reason}")]
    Failed {
        /// The stage name.
        stage: String,
        /// The reason for failure.
        reason: String,
    },

    /// The executor returned something that cannot be used.
    #[error("Stage '{stage}' returned an unusable value: {reason}")]
    Unusable {
        /// The stage name.
        stage: String,
        /// What was wrong with the value.
        reason: String,
    },

    /// Any other error raised by the collaborator.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExecutorError {
    /// Creates an execution failed error.
    #[must_use]
    pub fn failed(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unusable value error.
    #[must_use]
    pub fn unusable(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unusable {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// A variable holds a value that cannot be parsed.
    #[error("Invalid value for {key}: {value}")]
    Invalid {
        /// The variable name.
        key: String,
        /// The raw value.
        value: String,
    },
}
