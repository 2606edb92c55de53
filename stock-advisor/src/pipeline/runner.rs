//! Tiered execution of a stage graph under a wall-clock budget.
//!
//! Every stage of a tier runs as its own task. The runner waits for the whole
//! tier or the deadline, whichever comes first, then moves to the next tier
//! with whatever budget remains.

use super::{StageGraph, StageSpec};
use crate::context::{PipelineRun, RunOutcome, Subject, UpstreamContext};
use crate::core::{AggregateRunResult, StageResult};
use crate::errors::TimeoutOutcome;
use crate::events::{
    EventSink, NoOpEventSink, RUN_COMPLETED, RUN_STARTED, RUN_SUMMARY, RUN_TIMEOUT,
    STAGE_COMPLETED, STAGE_FAILED, STAGE_STARTED,
};
use crate::observability::RunSummary;
use crate::stages::StageExecutor;
use chrono::Utc;
use futures::FutureExt;
use serde_json::json;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Executes a [`StageGraph`] tier by tier.
///
/// The runner holds no per-run state and can be shared between requests.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    sink: Arc<dyn EventSink>,
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRunner {
    /// Creates a runner that discards lifecycle events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the sink that receives lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runs the graph and returns the aggregate result.
    ///
    /// # Errors
    ///
    /// Returns [`TimeoutOutcome`] if the budget runs out before every stage
    /// completes. No partial aggregate is returned in that case.
    pub async fn run(
        &self,
        graph: &StageGraph,
        subject: &Subject,
        executor: Arc<dyn StageExecutor>,
        budget: Option<Duration>,
    ) -> Result<AggregateRunResult, TimeoutOutcome> {
        self.execute(graph, subject, executor, budget)
            .await
            .into_aggregate()
    }

    /// Runs the graph and returns the full run record.
    pub async fn execute(
        &self,
        graph: &StageGraph,
        subject: &Subject,
        executor: Arc<dyn StageExecutor>,
        budget: Option<Duration>,
    ) -> PipelineRun {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        // A budget too large to represent as an instant never expires.
        let deadline = budget.and_then(|b| tokio::time::Instant::now().checked_add(b));
        let subject = Arc::new(subject.pinned());

        info!(
            run_id = %run_id,
            pipeline = %graph.name(),
            subject = %subject,
            budget_secs = budget.map(|b| b.as_secs_f64()),
            "Starting pipeline run"
        );
        self.sink.emit(
            RUN_STARTED,
            Some(json!({
                "run_id": run_id.to_string(),
                "pipeline": graph.name(),
                "subject": subject.identifier,
            })),
        );

        let mut completed: BTreeMap<String, StageResult> = BTreeMap::new();

        for (tier_index, tier) in graph.topology().into_iter().enumerate() {
            let tier_result = self
                .run_tier(run_id, &tier, &subject, &executor, &completed, deadline)
                .await;

            match tier_result {
                Ok(results) => {
                    for result in results {
                        completed.insert(result.stage.clone(), result);
                    }
                }
                Err(pending) => {
                    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
                    let timeout =
                        TimeoutOutcome::new(budget.unwrap_or_default(), tier_index, pending);
                    warn!(
                        run_id = %run_id,
                        tier = tier_index,
                        pending = ?timeout.pending,
                        duration_ms,
                        "Pipeline run exceeded its budget"
                    );
                    self.sink.emit(
                        RUN_TIMEOUT,
                        Some(json!({
                            "run_id": run_id.to_string(),
                            "tier": tier_index,
                            "pending": &timeout.pending,
                            "duration_ms": duration_ms,
                        })),
                    );
                    let run = PipelineRun {
                        run_id,
                        subject: Subject::clone(&subject),
                        started_at,
                        budget,
                        duration_ms,
                        outcome: RunOutcome::TimedOut(timeout),
                    };
                    self.emit_summary(&run, graph);
                    return run;
                }
            }
        }

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(run_id = %run_id, stages = completed.len(), duration_ms, "Pipeline run completed");
        self.sink.emit(
            RUN_COMPLETED,
            Some(json!({
                "run_id": run_id.to_string(),
                "stages": completed.len(),
                "duration_ms": duration_ms,
            })),
        );

        let run = PipelineRun {
            run_id,
            subject: Subject::clone(&subject),
            started_at,
            budget,
            duration_ms,
            outcome: RunOutcome::Completed(completed),
        };
        self.emit_summary(&run, graph);
        run
    }

    fn emit_summary(&self, run: &PipelineRun, graph: &StageGraph) {
        let summary = RunSummary::from_run(run, graph.name());
        self.sink.emit(RUN_SUMMARY, Some(summary.to_json()));
    }

    /// Runs one tier to completion.
    ///
    /// Returns the names of unfinished stages if the deadline passes first;
    /// their tasks are aborted before returning.
    async fn run_tier(
        &self,
        run_id: Uuid,
        tier: &[&StageSpec],
        subject: &Arc<Subject>,
        executor: &Arc<dyn StageExecutor>,
        completed: &BTreeMap<String, StageResult>,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<Vec<StageResult>, Vec<String>> {
        let mut tasks = JoinSet::new();
        for spec in tier {
            let upstream = UpstreamContext::from_completed(&spec.dependencies, completed);
            tasks.spawn(run_stage(
                run_id,
                spec.name.clone(),
                Arc::clone(subject),
                upstream,
                Arc::clone(executor),
                Arc::clone(&self.sink),
            ));
        }

        let mut pending: Vec<String> = tier.iter().map(|s| s.name.clone()).collect();
        let mut results = Vec::with_capacity(tier.len());

        while !tasks.is_empty() {
            let next = match deadline {
                Some(deadline) => {
                    let waited = tokio::time::timeout_at(deadline, tasks.join_next()).await;
                    match waited {
                        Ok(next) => next,
                        Err(_) => {
                            tasks.abort_all();
                            return Err(pending);
                        }
                    }
                }
                None => tasks.join_next().await,
            };

            match next {
                Some(Ok(result)) => {
                    pending.retain(|name| name != &result.stage);
                    results.push(result);
                }
                Some(Err(join_error)) => {
                    warn!(run_id = %run_id, error = %join_error, "Stage task ended abnormally");
                }
                None => break,
            }
        }

        // A task that vanished without reporting still owes the tier a result.
        for name in pending {
            results.push(StageResult::degraded(name, "stage task ended without a result"));
        }

        Ok(results)
    }
}

/// Calls the executor for one stage, absorbing failures and panics.
async fn run_stage(
    run_id: Uuid,
    stage: String,
    subject: Arc<Subject>,
    upstream: UpstreamContext,
    executor: Arc<dyn StageExecutor>,
    sink: Arc<dyn EventSink>,
) -> StageResult {
    sink.emit(
        STAGE_STARTED,
        Some(json!({
            "run_id": run_id.to_string(),
            "stage": &stage,
            "upstream": upstream.stages().collect::<Vec<_>>(),
        })),
    );

    let stage_start = Instant::now();
    let call = AssertUnwindSafe(executor.execute(&stage, &subject, &upstream))
        .catch_unwind()
        .await;
    let duration_ms = stage_start.elapsed().as_secs_f64() * 1000.0;

    let error = match call {
        Ok(Ok(mut result)) => {
            // Provenance is the stage we dispatched, whatever the executor claims.
            result.stage.clone_from(&stage);
            debug!(run_id = %run_id, stage = %stage, duration_ms, "Stage completed");
            sink.emit(
                STAGE_COMPLETED,
                Some(json!({
                    "run_id": run_id.to_string(),
                    "stage": &stage,
                    "duration_ms": duration_ms,
                })),
            );
            return result;
        }
        Ok(Err(error)) => error.to_string(),
        Err(_) => "stage executor panicked".to_string(),
    };

    warn!(
        run_id = %run_id,
        stage = %stage,
        error = %error,
        duration_ms,
        "Stage executor failed; continuing with an empty result"
    );
    sink.emit(
        STAGE_FAILED,
        Some(json!({
            "run_id": run_id.to_string(),
            "stage": &stage,
            "error": &error,
            "duration_ms": duration_ms,
        })),
    );
    StageResult::degraded(stage, error)
}
