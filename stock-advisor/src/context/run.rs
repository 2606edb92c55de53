//! Record of one pipeline execution.

use super::Subject;
use crate::core::{AggregateRunResult, StageResult};
use crate::errors::TimeoutOutcome;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every stage finished within budget.
    Completed(BTreeMap<String, StageResult>),
    /// The budget ran out; nothing is salvaged.
    TimedOut(TimeoutOutcome),
}

/// One execution of the stage graph for one subject.
///
/// Created per request and dropped afterwards; nothing outlives it.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// The subject with its date pinned.
    pub subject: Subject,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock budget, if any.
    pub budget: Option<Duration>,
    /// Total execution time in milliseconds.
    pub duration_ms: f64,
    /// The final outcome.
    pub outcome: RunOutcome,
}

impl PipelineRun {
    /// Returns the pinned analysis date.
    #[must_use]
    pub fn as_of_date(&self) -> NaiveDate {
        self.subject.effective_date()
    }

    /// Returns true if the run finished within budget.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed(_))
    }

    /// Returns the per-stage results of a completed run.
    #[must_use]
    pub fn results(&self) -> Option<&BTreeMap<String, StageResult>> {
        match &self.outcome {
            RunOutcome::Completed(results) => Some(results),
            RunOutcome::TimedOut(_) => None,
        }
    }

    /// Returns the names of stages whose executor failed.
    #[must_use]
    pub fn degraded_stages(&self) -> Vec<&str> {
        self.results()
            .map(|results| {
                results
                    .values()
                    .filter(|r| !r.is_success())
                    .map(|r| r.stage.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Converts into the aggregate, or the timeout that ended the run.
    ///
    /// # Errors
    ///
    /// Returns the [`TimeoutOutcome`] if the run exceeded its budget.
    pub fn into_aggregate(self) -> Result<AggregateRunResult, TimeoutOutcome> {
        match self.outcome {
            RunOutcome::Completed(results) => Ok(AggregateRunResult::from_results(results.values())),
            RunOutcome::TimedOut(timeout) => Err(timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with(outcome: RunOutcome) -> PipelineRun {
        PipelineRun {
            run_id: Uuid::new_v4(),
            subject: Subject::new("HPG").pinned(),
            started_at: Utc::now(),
            budget: Some(Duration::from_secs(60)),
            duration_ms: 1.0,
            outcome,
        }
    }

    #[test]
    fn test_completed_run_yields_aggregate() {
        let mut results = BTreeMap::new();
        results.insert("a".to_string(), StageResult::new("a", "x"));
        results.insert("b".to_string(), StageResult::degraded("b", "down"));
        let run = run_with(RunOutcome::Completed(results));

        assert!(run.is_completed());
        assert_eq!(run.degraded_stages(), vec!["b"]);
        assert_eq!(run.into_aggregate().unwrap().len(), 2);
    }

    #[test]
    fn test_timed_out_run_has_no_aggregate() {
        let timeout = TimeoutOutcome::new(Duration::from_secs(1), 0, vec!["a".to_string()]);
        let run = run_with(RunOutcome::TimedOut(timeout.clone()));

        assert!(run.results().is_none());
        assert_eq!(run.into_aggregate().unwrap_err(), timeout);
    }
}
