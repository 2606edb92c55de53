//! The stage executor boundary.
//!
//! How a stage computes its answer (model calls, web search, market data)
//! lives behind [`StageExecutor`]. The runner only ever calls `execute`.

use crate::context::{Subject, UpstreamContext};
use crate::core::StageResult;
use crate::errors::ExecutorError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Runs a single stage for a subject.
///
/// Implementations are shared across concurrent runs and must not keep
/// per-run state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageExecutor: Send + Sync + Debug {
    /// Executes one stage.
    ///
    /// # Arguments
    ///
    /// * `stage` - The stage name
    /// * `subject` - The subject, with its date already pinned
    /// * `upstream` - Completed outputs of the stage's dependencies
    async fn execute(
        &self,
        stage: &str,
        subject: &Subject,
        upstream: &UpstreamContext,
    ) -> Result<StageResult, ExecutorError>;
}

/// A function-based executor.
pub struct FnExecutor<F>
where
    F: Fn(&str, &Subject, &UpstreamContext) -> Result<StageResult, ExecutorError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&str, &Subject, &UpstreamContext) -> Result<StageResult, ExecutorError> + Send + Sync,
{
    /// Creates a new function-based executor.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnExecutor<F>
where
    F: Fn(&str, &Subject, &UpstreamContext) -> Result<StageResult, ExecutorError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnExecutor")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<F> StageExecutor for FnExecutor<F>
where
    F: Fn(&str, &Subject, &UpstreamContext) -> Result<StageResult, ExecutorError> + Send + Sync,
{
    async fn execute(
        &self,
        stage: &str,
        subject: &Subject,
        upstream: &UpstreamContext,
    ) -> Result<StageResult, ExecutorError> {
        (self.func)(stage, subject, upstream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_executor() {
        let executor = FnExecutor::new("echo", |stage, subject, _upstream| {
            Ok(StageResult::new(stage, format!("{} analysed", subject.identifier)))
        });

        let result = executor
            .execute("news_collecting", &Subject::new("HPG"), &UpstreamContext::new())
            .await
            .unwrap();

        assert_eq!(result.stage, "news_collecting");
        assert_eq!(result.value.to_string(), "HPG analysed");
    }

    #[tokio::test]
    async fn test_fn_executor_propagates_failure() {
        let executor = FnExecutor::new("broken", |stage, _subject, _upstream| {
            Err(ExecutorError::failed(stage, "quota exceeded"))
        });

        let err = executor
            .execute("technical_analysis", &Subject::new("HPG"), &UpstreamContext::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("quota exceeded"));
    }
}
