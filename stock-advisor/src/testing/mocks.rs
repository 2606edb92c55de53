//! Scripted stage executors for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::context::{Subject, UpstreamContext};
use crate::core::{StageResult, StageValue};
use crate::errors::ExecutorError;
use crate::stages::StageExecutor;

#[derive(Debug, Clone)]
enum Reply {
    Value(StageValue),
    Fail(String),
    Panic,
}

#[derive(Debug, Clone)]
struct Script {
    reply: Reply,
    delay: Option<Duration>,
}

/// One recorded executor call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// The dispatched stage.
    pub stage: String,
    /// The subject the stage saw.
    pub subject: Subject,
    /// The upstream outputs the stage saw.
    pub upstream: UpstreamContext,
}

/// An executor that replies from a per-stage script and records every call.
///
/// Stages without a script fail with [`ExecutorError::Failed`].
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedExecutor {
    /// Creates an executor with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(mut self, stage: impl Into<String>, reply: Reply, delay: Option<Duration>) -> Self {
        self.scripts.insert(stage.into(), Script { reply, delay });
        self
    }

    /// Replies to `stage` with a value.
    #[must_use]
    pub fn with_result(self, stage: impl Into<String>, value: impl Into<StageValue>) -> Self {
        self.script(stage, Reply::Value(value.into()), None)
    }

    /// Replies to `stage` with a value after sleeping for `delay`.
    #[must_use]
    pub fn with_delayed_result(
        self,
        stage: impl Into<String>,
        value: impl Into<StageValue>,
        delay: Duration,
    ) -> Self {
        self.script(stage, Reply::Value(value.into()), Some(delay))
    }

    /// Fails `stage` with the given reason.
    #[must_use]
    pub fn with_failure(self, stage: impl Into<String>, reason: impl Into<String>) -> Self {
        self.script(stage, Reply::Fail(reason.into()), None)
    }

    /// Panics when `stage` is executed.
    #[must_use]
    pub fn with_panic(self, stage: impl Into<String>) -> Self {
        self.script(stage, Reply::Panic, None)
    }

    /// Returns every recorded call in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the upstream context of the first call to `stage`.
    #[must_use]
    pub fn upstream_for(&self, stage: &str) -> Option<UpstreamContext> {
        self.calls
            .lock()
            .iter()
            .find(|call| call.stage == stage)
            .map(|call| call.upstream.clone())
    }

    /// Clears recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl StageExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        stage: &str,
        subject: &Subject,
        upstream: &UpstreamContext,
    ) -> Result<StageResult, ExecutorError> {
        self.calls.lock().push(RecordedCall {
            stage: stage.to_string(),
            subject: subject.clone(),
            upstream: upstream.clone(),
        });

        let Some(script) = self.scripts.get(stage) else {
            return Err(ExecutorError::failed(stage, "no scripted reply"));
        };

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }

        match &script.reply {
            Reply::Value(value) => Ok(StageResult::new(stage, value.clone())),
            Reply::Fail(reason) => Err(ExecutorError::failed(stage, reason.clone())),
            Reply::Panic => panic!("scripted panic in stage '{stage}'"),
        }
    }
}
