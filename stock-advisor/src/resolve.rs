//! Extracting one stage's output from an aggregate run result.
//!
//! Resolution never fails. A stage that cannot be found degrades to the
//! whole aggregate rendered as text, which is empty for an empty aggregate.

use crate::config::DisplayBudgets;
use crate::core::{AggregateRunResult, StageValue, TaskOutput};
use crate::pipeline::AdvisorStage;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Suffix appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// The name-keyed entry for the stage.
    Named,
    /// The `output` field of the positional entry.
    PositionOutput,
    /// The `raw` field of the positional entry.
    PositionRaw,
    /// The positional entry itself.
    PositionElement,
}

/// Why resolution fell back to the whole aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No entry exists for the stage.
    NotFound,
    /// The entry exists but is empty.
    EmptyOutput,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("stage not found in aggregate"),
            Self::EmptyOutput => f.write_str("stage output is empty"),
        }
    }
}

/// The outcome of resolving one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The stage's own output was found.
    Resolved {
        /// The value.
        value: StageValue,
        /// Which rule matched.
        source: ResolutionSource,
    },
    /// The stage could not be isolated; the value is the whole aggregate.
    Fallback {
        /// The aggregate rendered as text.
        value: StageValue,
        /// Why the stage could not be isolated.
        reason: FallbackReason,
    },
}

impl Resolution {
    /// Returns the resolved value.
    #[must_use]
    pub fn value(&self) -> &StageValue {
        match self {
            Self::Resolved { value, .. } | Self::Fallback { value, .. } => value,
        }
    }

    /// Consumes the resolution, returning the value.
    #[must_use]
    pub fn into_value(self) -> StageValue {
        match self {
            Self::Resolved { value, .. } | Self::Fallback { value, .. } => value,
        }
    }

    /// Returns the value as text.
    #[must_use]
    pub fn text(&self) -> String {
        self.value().to_string()
    }

    /// Returns true if the stage's own output was found.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Resolves stage outputs and applies display budgets.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultResolver {
    budgets: DisplayBudgets,
}

impl ResultResolver {
    /// Creates a resolver with the given display budgets.
    #[must_use]
    pub fn new(budgets: DisplayBudgets) -> Self {
        Self { budgets }
    }

    /// Resolves one stage from the aggregate. First match wins:
    ///
    /// 1. a name-keyed aggregate's non-empty entry for `stage_name`
    /// 2. a positional aggregate's entry at `ordinal`: its `output`, else its
    ///    `raw`, else the entry itself
    /// 3. the whole aggregate as text
    #[must_use]
    pub fn resolve(&self, aggregate: &AggregateRunResult, stage_name: &str, ordinal: usize) -> Resolution {
        let found = match aggregate {
            AggregateRunResult::ByName(map) => map
                .get(stage_name)
                .map(|value| (value.clone(), ResolutionSource::Named)),
            AggregateRunResult::ByPosition(items) => items.get(ordinal).map(positional),
        };

        let reason = match found {
            Some((value, source)) if !value.is_empty() => {
                return Resolution::Resolved { value, source };
            }
            Some(_) => FallbackReason::EmptyOutput,
            None => FallbackReason::NotFound,
        };

        debug!(stage = %stage_name, ordinal, reason = %reason, "Falling back to the whole aggregate");
        Resolution::Fallback {
            value: StageValue::text(aggregate.to_string()),
            reason,
        }
    }

    /// Resolves an advisor stage.
    #[must_use]
    pub fn resolve_stage(&self, aggregate: &AggregateRunResult, stage: AdvisorStage) -> Resolution {
        self.resolve(aggregate, stage.name(), stage.ordinal())
    }

    /// Resolves an advisor stage and truncates it to its display budget.
    #[must_use]
    pub fn display_text(&self, aggregate: &AggregateRunResult, stage: AdvisorStage) -> String {
        self.display(&self.resolve_stage(aggregate, stage), stage)
    }

    /// Truncates an existing resolution to `stage`'s display budget.
    #[must_use]
    pub fn display(&self, resolution: &Resolution, stage: AdvisorStage) -> String {
        truncate_display(&resolution.text(), self.budgets.for_stage(stage))
    }
}

fn positional(item: &TaskOutput) -> (StageValue, ResolutionSource) {
    match item {
        TaskOutput::Wrapped(record) => {
            if let Some(output) = &record.output {
                (output.clone(), ResolutionSource::PositionOutput)
            } else if let Some(raw) = &record.raw {
                (StageValue::text(raw.clone()), ResolutionSource::PositionRaw)
            } else {
                (StageValue::text(item.to_string()), ResolutionSource::PositionElement)
            }
        }
        TaskOutput::Bare(value) => (value.clone(), ResolutionSource::PositionElement),
    }
}

/// Bounds text to `limit` characters for display.
///
/// Text at or under the limit is returned unchanged; longer text keeps its
/// first `limit` characters followed by [`ELLIPSIS`]. Counts Unicode scalar
/// values, so multi-byte characters are never split. Applying it twice gives
/// the same result as applying it once.
#[must_use]
pub fn truncate_display(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        None => text.to_string(),
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len());
            out.push_str(&text[..cut]);
            out.push_str(ELLIPSIS);
            out
        }
    }
}
