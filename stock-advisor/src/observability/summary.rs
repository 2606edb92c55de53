//! Wide run summaries.

use crate::context::{PipelineRun, RunOutcome};
use crate::core::StageStatus;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-stage line of a [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    /// Stage name.
    pub stage: String,
    /// Final status.
    pub status: StageStatus,
    /// Failure text for degraded stages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything worth knowing about a finished run, in one payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Run id.
    pub run_id: String,
    /// Pipeline name.
    pub pipeline: String,
    /// Ticker symbol.
    pub subject: String,
    /// Pinned analysis date.
    pub as_of_date: String,
    /// "completed" or "timeout".
    pub status: &'static str,
    /// Wall-clock duration.
    pub duration_ms: f64,
    /// Budget in seconds, if bounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_secs: Option<f64>,
    /// Number of stages per status.
    pub stage_counts: BTreeMap<String, usize>,
    /// Stage details in name order; empty for timed-out runs.
    pub stages: Vec<StageSummary>,
    /// Stages still running when the budget ran out.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<String>,
}

impl RunSummary {
    /// Summarises a run.
    #[must_use]
    pub fn from_run(run: &PipelineRun, pipeline: &str) -> Self {
        let (status, stages, pending) = match &run.outcome {
            RunOutcome::Completed(results) => {
                let stages = results
                    .values()
                    .map(|r| StageSummary {
                        stage: r.stage.clone(),
                        status: r.status,
                        error: r.error.clone(),
                    })
                    .collect();
                ("completed", stages, Vec::new())
            }
            RunOutcome::TimedOut(timeout) => ("timeout", Vec::new(), timeout.pending.clone()),
        };

        let mut stage_counts = BTreeMap::new();
        for stage in &stages {
            *stage_counts.entry(stage.status.to_string()).or_insert(0) += 1;
        }

        Self {
            run_id: run.run_id.to_string(),
            pipeline: pipeline.to_string(),
            subject: run.subject.identifier.clone(),
            as_of_date: run.as_of_date().to_string(),
            status,
            duration_ms: run.duration_ms,
            budget_secs: run.budget.map(|b| b.as_secs_f64()),
            stage_counts,
            stages,
            pending,
        }
    }

    /// Converts to a JSON event payload.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Subject;
    use crate::core::StageResult;
    use crate::errors::TimeoutOutcome;
    use chrono::{NaiveDate, Utc};
    use std::time::Duration;
    use uuid::Uuid;

    fn run(outcome: RunOutcome) -> PipelineRun {
        PipelineRun {
            run_id: Uuid::new_v4(),
            subject: Subject::new("HPG").with_date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()),
            started_at: Utc::now(),
            budget: Some(Duration::from_secs(60)),
            duration_ms: 12.5,
            outcome,
        }
    }

    #[test]
    fn test_completed_summary_counts_statuses() {
        let mut results = BTreeMap::new();
        results.insert("a".to_string(), StageResult::new("a", "x"));
        results.insert("b".to_string(), StageResult::new("b", "y"));
        results.insert("c".to_string(), StageResult::degraded("c", "quota"));

        let summary = RunSummary::from_run(&run(RunOutcome::Completed(results)), "stock_advisor");
        let payload = summary.to_json();

        assert_eq!(payload["status"], "completed");
        assert_eq!(payload["as_of_date"], "2025-01-10");
        assert_eq!(payload["stage_counts"]["ok"], 2);
        assert_eq!(payload["stage_counts"]["degraded"], 1);
        assert_eq!(payload["stages"][2]["error"], "quota");
        assert!(payload.get("pending").is_none());
    }

    #[test]
    fn test_timeout_summary_lists_pending() {
        let timeout = TimeoutOutcome::new(Duration::from_secs(60), 1, vec!["d".to_string()]);
        let summary = RunSummary::from_run(&run(RunOutcome::TimedOut(timeout)), "stock_advisor");

        assert_eq!(summary.status, "timeout");
        assert!(summary.stages.is_empty());
        assert_eq!(summary.pending, vec!["d".to_string()]);
        assert_eq!(summary.budget_secs, Some(60.0));
    }
}
