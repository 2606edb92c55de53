//! The advisor pipeline: three independent analyses feeding one decision.

use super::{OutputSchema, StageGraph, StageSpec};
use crate::errors::GraphDefinitionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the advisor pipeline.
pub const ADVISOR_PIPELINE: &str = "stock_advisor";

/// Fields of the decision stage's structured output.
pub const DECISION_FIELDS: [&str; 11] = [
    "stock_ticker",
    "full_name",
    "industry",
    "today_date",
    "decision",
    "macro_reasoning",
    "fund_reasoning",
    "tech_reasoning",
    "buy_price",
    "sell_price",
    "overall_score",
];

/// Returns the expected shape of the decision stage's output.
#[must_use]
pub fn decision_schema() -> OutputSchema {
    OutputSchema::new("InvestmentDecision", DECISION_FIELDS)
}

/// The stages of the advisor pipeline, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorStage {
    /// Collects and summarises market news.
    NewsCollecting,
    /// Evaluates financial ratios and valuation.
    FundamentalAnalysis,
    /// Reads price and volume indicators.
    TechnicalAnalysis,
    /// Combines the three analyses into a recommendation.
    InvestmentDecision,
}

impl AdvisorStage {
    /// All stages in declaration order.
    pub const ALL: [Self; 4] = [
        Self::NewsCollecting,
        Self::FundamentalAnalysis,
        Self::TechnicalAnalysis,
        Self::InvestmentDecision,
    ];

    /// The stages without dependencies.
    pub const INDEPENDENT: [Self; 3] = [
        Self::NewsCollecting,
        Self::FundamentalAnalysis,
        Self::TechnicalAnalysis,
    ];

    /// Returns the stage name used in graphs and aggregates.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NewsCollecting => "news_collecting",
            Self::FundamentalAnalysis => "fundamental_analysis",
            Self::TechnicalAnalysis => "technical_analysis",
            Self::InvestmentDecision => "investment_decision",
        }
    }

    /// Returns the declaration position.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.name() == name)
    }

    /// Returns true for the narrative stage whose text gets the larger display budget.
    #[must_use]
    pub const fn is_narrative(self) -> bool {
        matches!(self, Self::NewsCollecting)
    }
}

impl fmt::Display for AdvisorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds the advisor stage graph.
///
/// # Errors
///
/// Never in practice; the declarations are fixed and ordered.
pub fn advisor_graph() -> Result<StageGraph, GraphDefinitionError> {
    let mut graph = StageGraph::new(ADVISOR_PIPELINE);
    for stage in AdvisorStage::INDEPENDENT {
        graph.declare(StageSpec::new(stage.name()))?;
    }
    graph.declare(
        StageSpec::new(AdvisorStage::InvestmentDecision.name())
            .with_dependencies(AdvisorStage::INDEPENDENT.map(AdvisorStage::name))
            .with_output_schema(decision_schema()),
    )?;
    Ok(graph)
}
