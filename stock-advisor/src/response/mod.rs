//! Composing facet responses from a run's aggregate.
//!
//! Assembly is pure: the same subject and aggregate always produce the same
//! responses.

mod facets;

pub use facets::{
    CompleteAnalysis, FundamentalFacet, HealthStatus, NewsFacet, ServiceInfo, TechnicalFacet,
};

use crate::config::{AdvisorConfig, PlaceholderLabels};
use crate::context::Subject;
use crate::core::{AggregateRunResult, StageValue};
use crate::decision::{DecisionDecoder, Decoded, DATE_FORMAT};
use crate::pipeline::{AdvisorStage, OutputSchema};
use crate::resolve::{Resolution, ResultResolver};
use serde_json::{Map, Value};

/// Builds facet responses.
#[derive(Debug, Clone)]
pub struct ResponseAssembler {
    resolver: ResultResolver,
    decoder: DecisionDecoder,
    labels: PlaceholderLabels,
}

impl Default for ResponseAssembler {
    fn default() -> Self {
        Self::new(&AdvisorConfig::default())
    }
}

impl ResponseAssembler {
    /// Creates an assembler from the service configuration.
    #[must_use]
    pub fn new(config: &AdvisorConfig) -> Self {
        Self {
            resolver: ResultResolver::new(config.display),
            decoder: DecisionDecoder::from_config(config),
            labels: config.labels.clone(),
        }
    }

    /// Checks decision payloads against `schema`.
    #[must_use]
    pub fn with_decision_schema(mut self, schema: OutputSchema) -> Self {
        self.decoder = self.decoder.with_schema(schema);
        self
    }

    /// Builds the news facet.
    #[must_use]
    pub fn news(&self, subject: &Subject, aggregate: &AggregateRunResult) -> NewsFacet {
        self.news_with_impact(subject, aggregate, &self.labels.market_impact)
    }

    fn news_with_impact(
        &self,
        subject: &Subject,
        aggregate: &AggregateRunResult,
        market_impact: &str,
    ) -> NewsFacet {
        NewsFacet {
            symbol: subject.identifier.clone(),
            analysis_date: analysis_date(subject),
            news_summary: self.resolver.display_text(aggregate, AdvisorStage::NewsCollecting),
            market_impact: market_impact.to_string(),
        }
    }

    /// Builds the fundamental facet.
    #[must_use]
    pub fn fundamental(&self, subject: &Subject, aggregate: &AggregateRunResult) -> FundamentalFacet {
        let stage = AdvisorStage::FundamentalAnalysis;
        let resolution = self.resolver.resolve_stage(aggregate, stage);
        FundamentalFacet {
            symbol: subject.identifier.clone(),
            company_name: self.labels.company_name.clone(),
            industry: self.labels.industry.clone(),
            analysis_date: analysis_date(subject),
            financial_ratios: object_field(&resolution, "financial_ratios"),
            quarterly_trends: object_field(&resolution, "quarterly_trends"),
            valuation_assessment: self.resolver.display(&resolution, stage),
            performance_evaluation: self.labels.performance_evaluation.clone(),
        }
    }

    /// Builds the technical facet.
    #[must_use]
    pub fn technical(&self, subject: &Subject, aggregate: &AggregateRunResult) -> TechnicalFacet {
        let stage = AdvisorStage::TechnicalAnalysis;
        let resolution = self.resolver.resolve_stage(aggregate, stage);
        TechnicalFacet {
            symbol: subject.identifier.clone(),
            company_name: self.labels.company_name.clone(),
            industry: self.labels.industry.clone(),
            analysis_date: analysis_date(subject),
            current_price: number_field(&resolution, "current_price"),
            current_volume: number_field(&resolution, "current_volume"),
            technical_indicators: object_field(&resolution, "technical_indicators"),
            support_resistance: object_field(&resolution, "support_resistance"),
            trend_analysis: self.resolver.display(&resolution, stage),
            technical_signals: self.labels.technical_signals.clone(),
        }
    }

    /// Decodes the decision stage.
    #[must_use]
    pub fn decision(&self, subject: &Subject, aggregate: &AggregateRunResult) -> Decoded {
        let resolution = self.resolver.resolve_stage(aggregate, AdvisorStage::InvestmentDecision);
        self.decoder
            .decode_resolution(&resolution, subject, subject.effective_date())
    }

    /// Builds all four facets.
    #[must_use]
    pub fn complete(&self, subject: &Subject, aggregate: &AggregateRunResult) -> CompleteAnalysis {
        CompleteAnalysis {
            symbol: subject.identifier.clone(),
            analysis_date: analysis_date(subject),
            market_analysis: self.news_with_impact(
                subject,
                aggregate,
                &self.labels.market_impact_brief,
            ),
            fundamental_analysis: self.fundamental(subject, aggregate),
            technical_analysis: self.technical(subject, aggregate),
            investment_decision: self.decision(subject, aggregate).into_record(),
        }
    }
}

fn analysis_date(subject: &Subject) -> String {
    subject.effective_date().format(DATE_FORMAT).to_string()
}

/// Reads an object field of a structured stage output.
fn object_field(resolution: &Resolution, name: &str) -> Map<String, Value> {
    match resolution {
        Resolution::Resolved {
            value: StageValue::Record(record),
            ..
        } => record
            .get(name)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        _ => Map::new(),
    }
}

fn number_field(resolution: &Resolution, name: &str) -> f64 {
    match resolution {
        Resolution::Resolved {
            value: StageValue::Record(record),
            ..
        } => record.get(name).and_then(Value::as_f64).unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Action;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn hpg() -> Subject {
        Subject::new("HPG").with_date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
    }

    fn aggregate() -> AggregateRunResult {
        let mut map = BTreeMap::new();
        map.insert("news_collecting".to_string(), StageValue::text("news..."));
        map.insert(
            "fundamental_analysis".to_string(),
            StageValue::from_json(json!({"summary": "P/E thấp", "financial_ratios": {"pe": 9.1}})),
        );
        map.insert(
            "technical_analysis".to_string(),
            StageValue::from_json(json!({"trend": "tăng", "current_price": 25400.0})),
        );
        map.insert("investment_decision".to_string(), StageValue::text("not json"));
        AggregateRunResult::ByName(map)
    }

    #[test]
    fn test_news_facet() {
        let facet = ResponseAssembler::default().news(&hpg(), &aggregate());

        assert_eq!(
            facet,
            NewsFacet {
                symbol: "HPG".to_string(),
                analysis_date: "2025-01-10".to_string(),
                news_summary: "news...".to_string(),
                market_impact: "Phân tích tác động thị trường từ tin tức vĩ mô".to_string(),
            }
        );
    }

    #[test]
    fn test_structured_fields_carried_into_facets() {
        let assembler = ResponseAssembler::default();
        let fundamental = assembler.fundamental(&hpg(), &aggregate());
        let technical = assembler.technical(&hpg(), &aggregate());

        assert_eq!(fundamental.financial_ratios.get("pe"), Some(&json!(9.1)));
        assert!(fundamental.quarterly_trends.is_empty());
        assert!(fundamental.valuation_assessment.contains("P/E thấp"));
        assert_eq!(technical.current_price, 25400.0);
        assert_eq!(technical.current_volume, 0.0);
        assert_eq!(technical.technical_signals, "Tín hiệu kỹ thuật");
    }

    #[test]
    fn test_complete_uses_brief_market_impact() {
        let complete = ResponseAssembler::default().complete(&hpg(), &aggregate());

        assert_eq!(complete.market_analysis.market_impact, "Phân tích tác động thị trường");
        assert_eq!(complete.investment_decision.decision, Action::Hold);
        assert_eq!(complete.investment_decision.today_date, "2025-01-10");
    }

    #[test]
    fn test_long_text_truncated_per_facet() {
        let mut map = BTreeMap::new();
        map.insert("news_collecting".to_string(), StageValue::text("n".repeat(800)));
        map.insert("technical_analysis".to_string(), StageValue::text("t".repeat(800)));
        let aggregate = AggregateRunResult::ByName(map);
        let assembler = ResponseAssembler::default();

        assert_eq!(assembler.news(&hpg(), &aggregate).news_summary.chars().count(), 503);
        assert_eq!(assembler.technical(&hpg(), &aggregate).trend_analysis.chars().count(), 303);
    }

    #[test]
    fn test_positional_record_feeds_text_and_fields() {
        let aggregate: AggregateRunResult = serde_json::from_value(json!([
            "news...",
            {"output": {"financial_ratios": {"roe": 0.12}}, "agent": "fundamental_analyst"},
        ]))
        .unwrap();

        let facet = ResponseAssembler::default().fundamental(&hpg(), &aggregate);
        assert_eq!(facet.financial_ratios.get("roe"), Some(&json!(0.12)));
        assert_eq!(facet.valuation_assessment, r#"{"financial_ratios":{"roe":0.12}}"#);
    }

    #[test]
    fn test_decision_schema_drives_defaults() {
        let mut map = BTreeMap::new();
        map.insert(
            "investment_decision".to_string(),
            StageValue::from_json(json!({"decision": "sell"})),
        );
        let aggregate = AggregateRunResult::ByName(map);
        let assembler = ResponseAssembler::default()
            .with_decision_schema(OutputSchema::new("Minimal", ["decision", "sell_price"]));

        let Decoded::Parsed { record, defaulted } = assembler.decision(&hpg(), &aggregate) else {
            panic!("expected a parsed record");
        };
        assert_eq!(record.decision, Action::Sell);
        assert_eq!(defaulted, vec!["sell_price".to_string()]);
    }

    #[test]
    fn test_missing_stage_gets_aggregate_text() {
        let mut map = BTreeMap::new();
        map.insert("news_collecting".to_string(), StageValue::text("only news"));
        let aggregate = AggregateRunResult::ByName(map);

        let facet = ResponseAssembler::default().fundamental(&hpg(), &aggregate);
        assert_eq!(facet.valuation_assessment, r#"{"news_collecting":"only news"}"#);
        assert!(facet.financial_ratios.is_empty());
    }
}
