//! The advisor service: one operation per analysis facet plus the composite.
//!
//! Every operation runs the whole pipeline for its subject so the facets it
//! returns are consistent with a full run.

use crate::config::AdvisorConfig;
use crate::context::{today, PipelineRun, Subject};
use crate::core::AggregateRunResult;
use crate::decision::{DecisionRecord, DATE_FORMAT};
use crate::errors::AdvisorError;
use crate::events::EventSink;
use crate::pipeline::{advisor_graph, AdvisorStage, PipelineRunner, StageGraph};
use crate::response::{
    CompleteAnalysis, FundamentalFacet, HealthStatus, NewsFacet, ResponseAssembler, ServiceInfo,
    TechnicalFacet,
};
use crate::stages::StageExecutor;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Public name of the service.
pub const SERVICE_NAME: &str = "VN Stock Advisor";

/// Runs the advisor pipeline and shapes its output into facet responses.
///
/// Holds no per-request state; share it behind an `Arc`.
#[derive(Debug)]
pub struct AdvisorService {
    config: AdvisorConfig,
    graph: StageGraph,
    runner: PipelineRunner,
    executor: Arc<dyn StageExecutor>,
    assembler: ResponseAssembler,
}

impl AdvisorService {
    /// Creates a service around a stage executor.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::GraphDefinition`] if the pipeline graph cannot
    /// be built.
    pub fn new(executor: Arc<dyn StageExecutor>, config: AdvisorConfig) -> Result<Self, AdvisorError> {
        let graph = advisor_graph()?;
        graph.validate()?;
        let mut assembler = ResponseAssembler::new(&config);
        if let Some(schema) = graph
            .get(AdvisorStage::InvestmentDecision.name())
            .and_then(|spec| spec.output_schema.clone())
        {
            assembler = assembler.with_decision_schema(schema);
        }
        Ok(Self {
            assembler,
            runner: PipelineRunner::new(),
            config,
            graph,
            executor,
        })
    }

    /// Routes run lifecycle events to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.runner = self.runner.with_event_sink(sink);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Returns the pipeline graph.
    #[must_use]
    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    async fn run(
        &self,
        subject: &Subject,
        budget: Option<Duration>,
    ) -> Result<(Subject, AggregateRunResult), AdvisorError> {
        let run: PipelineRun = self
            .runner
            .execute(&self.graph, subject, Arc::clone(&self.executor), budget)
            .await;
        let pinned = run.subject.clone();
        let aggregate = run.into_aggregate()?;
        Ok((pinned, aggregate))
    }

    /// Runs the pipeline and returns the news facet.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Timeout`] if the facet budget is exceeded.
    pub async fn analyze_news(&self, subject: &Subject) -> Result<NewsFacet, AdvisorError> {
        let (subject, aggregate) = self.run(subject, self.config.facet_timeout).await?;
        Ok(self.assembler.news(&subject, &aggregate))
    }

    /// Runs the pipeline and returns the fundamental facet.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Timeout`] if the facet budget is exceeded.
    pub async fn analyze_fundamental(&self, subject: &Subject) -> Result<FundamentalFacet, AdvisorError> {
        let (subject, aggregate) = self.run(subject, self.config.facet_timeout).await?;
        Ok(self.assembler.fundamental(&subject, &aggregate))
    }

    /// Runs the pipeline and returns the technical facet.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Timeout`] if the facet budget is exceeded.
    pub async fn analyze_technical(&self, subject: &Subject) -> Result<TechnicalFacet, AdvisorError> {
        let (subject, aggregate) = self.run(subject, self.config.facet_timeout).await?;
        Ok(self.assembler.technical(&subject, &aggregate))
    }

    /// Runs the pipeline and returns the decision.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Timeout`] if the facet budget is exceeded.
    pub async fn get_decision(&self, subject: &Subject) -> Result<DecisionRecord, AdvisorError> {
        let (subject, aggregate) = self.run(subject, self.config.facet_timeout).await?;
        let decoded = self.assembler.decision(&subject, &aggregate);
        if !decoded.is_parsed() {
            info!(subject = %subject, "Returning fallback decision");
        }
        Ok(decoded.into_record())
    }

    /// Runs the pipeline under the composite budget and returns every facet.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Timeout`] if the budget is exceeded; no facet
    /// is returned in that case.
    pub async fn analyze_complete(&self, subject: &Subject) -> Result<CompleteAnalysis, AdvisorError> {
        let (subject, aggregate) = self.run(subject, Some(self.config.complete_timeout)).await?;
        Ok(self.assembler.complete(&subject, &aggregate))
    }

    /// Reports liveness.
    #[must_use]
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            timestamp: today().format(DATE_FORMAT).to_string(),
        }
    }

    /// Describes the service.
    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            name: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Multi-stage stock analysis: news, fundamentals, technicals and an investment decision"
                .to_string(),
            operations: [
                "analyze_news",
                "analyze_fundamental",
                "analyze_technical",
                "get_decision",
                "analyze_complete",
                "health",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Action;
    use crate::events::{CollectingEventSink, RUN_SUMMARY};
    use crate::testing::{advisor_executor, decision_payload, hpg_subject, ScriptedExecutor};
    use pretty_assertions::assert_eq;

    fn service(executor: ScriptedExecutor) -> AdvisorService {
        AdvisorService::new(Arc::new(executor), AdvisorConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_news_facet() {
        let service = service(advisor_executor("not json"));
        let facet = tokio_test::assert_ok!(service.analyze_news(&hpg_subject()).await);

        assert_eq!(facet.symbol, "HPG");
        assert_eq!(facet.analysis_date, "2025-01-10");
        assert!(facet.news_summary.starts_with("news..."));
    }

    #[tokio::test]
    async fn test_get_decision_copies_well_formed_payload() {
        let service = service(advisor_executor(decision_payload()));
        let record = service.get_decision(&hpg_subject()).await.unwrap();

        assert_eq!(record.decision, Action::Buy);
        assert_eq!(serde_json::to_value(&record).unwrap(), decision_payload());
    }

    #[tokio::test]
    async fn test_decision_without_date_uses_today() {
        let service = service(advisor_executor("not json"));
        let record = service.get_decision(&Subject::new("VNM")).await.unwrap();

        assert_eq!(record.stock_ticker, "VNM");
        assert_eq!(record.today_date, today().format(DATE_FORMAT).to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_times_out() {
        let executor = advisor_executor("not json").with_delayed_result(
            "investment_decision",
            "late",
            Duration::from_secs(120),
        );
        let service = service(executor);

        let err = tokio_test::assert_err!(service.analyze_complete(&hpg_subject()).await);
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_facets_unbounded_by_default() {
        let executor = advisor_executor("not json").with_delayed_result(
            "news_collecting",
            "slow news",
            Duration::from_secs(300),
        );
        let service = service(executor);

        let facet = service.analyze_news(&hpg_subject()).await.unwrap();
        assert_eq!(facet.news_summary, "slow news");
    }

    #[tokio::test]
    async fn test_largest_configured_budget_completes() {
        let config = AdvisorConfig::from_lookup(|key: &str| {
            (key == "ADVISOR_COMPLETE_TIMEOUT_SECS").then(|| u64::MAX.to_string())
        })
        .unwrap();
        let service =
            AdvisorService::new(Arc::new(advisor_executor(decision_payload())), config).unwrap();

        let analysis = tokio_test::assert_ok!(service.analyze_complete(&hpg_subject()).await);
        assert_eq!(analysis.investment_decision.decision, Action::Buy);
    }

    #[tokio::test]
    async fn test_events_routed_to_sink() {
        let sink = Arc::new(CollectingEventSink::new());
        let service = service(advisor_executor("not json")).with_event_sink(sink.clone());

        service.analyze_technical(&hpg_subject()).await.unwrap();
        assert_eq!(sink.events_of_type(RUN_SUMMARY).len(), 1);
    }

    #[test]
    fn test_health_and_info() {
        let service = service(ScriptedExecutor::new());

        assert_eq!(service.health().status, "healthy");
        let info = service.service_info();
        assert_eq!(info.name, SERVICE_NAME);
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert!(info.operations.contains(&"analyze_complete".to_string()));
        assert_eq!(service.graph().stage_count(), 4);
    }
}
