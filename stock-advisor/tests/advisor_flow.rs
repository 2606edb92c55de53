//! End-to-end runs of the advisor pipeline through the public API.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stock_advisor::context::{Subject, UpstreamContext};
use stock_advisor::core::{StageResult, StageValue};
use stock_advisor::decision::Action;
use stock_advisor::errors::{AdvisorError, ExecutorError};
use stock_advisor::events::{CollectingEventSink, RUN_TIMEOUT, STAGE_FAILED};
use stock_advisor::pipeline::{advisor_graph, AdvisorStage, PipelineRunner};
use stock_advisor::stages::StageExecutor;
use stock_advisor::testing::{advisor_executor, decision_payload, hpg_subject, ScriptedExecutor};
use stock_advisor::{config::AdvisorConfig, AdvisorService};

fn scenario_executor() -> ScriptedExecutor {
    ScriptedExecutor::new()
        .with_result("news_collecting", "news...")
        .with_result("fundamental_analysis", json!({"financial": "P/E 9.1, ROE 12%"}))
        .with_result("technical_analysis", json!({"technical": "MA50 breakout"}))
        .with_result("investment_decision", "not json")
}

#[tokio::test]
async fn test_hpg_with_malformed_decision_degrades_to_hold() {
    let service = AdvisorService::new(Arc::new(scenario_executor()), AdvisorConfig::default()).unwrap();
    let analysis = service.analyze_complete(&hpg_subject()).await.unwrap();

    assert_eq!(analysis.symbol, "HPG");
    assert_eq!(analysis.analysis_date, "2025-01-10");
    assert_eq!(analysis.market_analysis.news_summary, "news...");
    assert_eq!(
        analysis.fundamental_analysis.valuation_assessment,
        r#"{"financial":"P/E 9.1, ROE 12%"}"#
    );
    assert_eq!(
        analysis.technical_analysis.trend_analysis,
        r#"{"technical":"MA50 breakout"}"#
    );

    let decision = analysis.investment_decision;
    assert_eq!(decision.stock_ticker, "HPG");
    assert_eq!(decision.today_date, "2025-01-10");
    assert_eq!(decision.decision, Action::Hold);
    assert_eq!(decision.buy_price, 0.0);
    assert_eq!(decision.sell_price, 0.0);
}

#[tokio::test]
async fn test_run_within_budget_returns_four_nonempty_facets() {
    let service = AdvisorService::new(
        Arc::new(advisor_executor(decision_payload())),
        AdvisorConfig::default(),
    )
    .unwrap();
    let analysis = service.analyze_complete(&hpg_subject()).await.unwrap();

    assert!(!analysis.market_analysis.news_summary.is_empty());
    assert!(!analysis.fundamental_analysis.valuation_assessment.is_empty());
    assert!(!analysis.technical_analysis.trend_analysis.is_empty());
    assert_eq!(analysis.investment_decision.decision, Action::Buy);
    assert_eq!(analysis.investment_decision.sell_price, 29800.0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_decision_stage_times_out_without_facets() {
    let sink = Arc::new(CollectingEventSink::new());
    let executor = scenario_executor().with_delayed_result(
        "investment_decision",
        "too late",
        Duration::from_secs(90),
    );
    let service = AdvisorService::new(Arc::new(executor), AdvisorConfig::default())
        .unwrap()
        .with_event_sink(sink.clone());

    let err = service.analyze_complete(&hpg_subject()).await.unwrap_err();

    let AdvisorError::Timeout(timeout) = err else {
        panic!("expected a timeout");
    };
    assert_eq!(timeout.tier, 1);
    assert_eq!(timeout.pending, vec!["investment_decision".to_string()]);
    assert_eq!(timeout.budget, Duration::from_secs(60));
    assert_eq!(sink.events_of_type(RUN_TIMEOUT).len(), 1);
}

#[tokio::test]
async fn test_failing_analysis_stage_does_not_fail_the_request() {
    let sink = Arc::new(CollectingEventSink::new());
    let executor = scenario_executor().with_failure("technical_analysis", "price feed unavailable");
    let service = AdvisorService::new(Arc::new(executor), AdvisorConfig::default())
        .unwrap()
        .with_event_sink(sink.clone());

    let analysis = service.analyze_complete(&hpg_subject()).await.unwrap();

    // The degraded stage resolves to the whole run result.
    assert!(analysis.technical_analysis.trend_analysis.contains("news..."));
    assert_eq!(sink.events_of_type(STAGE_FAILED).len(), 1);
}

/// Builds its decision from what the analysis stages produced.
#[derive(Debug)]
struct ContextAwareExecutor;

#[async_trait]
impl StageExecutor for ContextAwareExecutor {
    async fn execute(
        &self,
        stage: &str,
        subject: &Subject,
        upstream: &UpstreamContext,
    ) -> Result<StageResult, ExecutorError> {
        let value = match AdvisorStage::from_name(stage) {
            Some(AdvisorStage::InvestmentDecision) => {
                if upstream.len() != AdvisorStage::INDEPENDENT.len() {
                    return Err(ExecutorError::unusable(stage, "missing upstream analyses"));
                }
                StageValue::from_json(json!({
                    "stock_ticker": subject.identifier,
                    "decision": "MUA",
                    "macro_reasoning": upstream.get("news_collecting").map(ToString::to_string),
                    "buy_price": "25400",
                }))
            }
            Some(other) => StageValue::text(format!("{other} for {subject}")),
            None => return Err(ExecutorError::failed(stage, "unknown stage")),
        };
        Ok(StageResult::new(stage, value))
    }
}

#[tokio::test]
async fn test_decision_stage_sees_all_independent_outputs() {
    let service = AdvisorService::new(Arc::new(ContextAwareExecutor), AdvisorConfig::default()).unwrap();
    let record = service.get_decision(&hpg_subject()).await.unwrap();

    assert_eq!(record.decision, Action::Buy);
    assert_eq!(record.macro_reasoning, "news_collecting for HPG@2025-01-10");
    assert_eq!(record.buy_price, 25400.0);
    assert_eq!(record.stock_ticker, "HPG");
}

#[tokio::test]
async fn test_runner_aggregate_is_keyed_by_stage_name() {
    let graph = advisor_graph().unwrap();
    let aggregate = PipelineRunner::new()
        .run(&graph, &hpg_subject(), Arc::new(scenario_executor()), None)
        .await
        .unwrap();

    let json = aggregate.to_json();
    for stage in AdvisorStage::ALL {
        assert!(json.get(stage.name()).is_some(), "missing {stage}");
    }
}
