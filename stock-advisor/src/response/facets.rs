//! Facet response types.

use crate::decision::DecisionRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// News and market facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsFacet {
    /// Ticker symbol.
    pub symbol: String,
    /// Analysis date, `YYYY-MM-DD`.
    pub analysis_date: String,
    /// Summarised news.
    pub news_summary: String,
    /// Market impact line.
    pub market_impact: String,
}

/// Fundamental analysis facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalFacet {
    /// Ticker symbol.
    pub symbol: String,
    /// Company name.
    pub company_name: String,
    /// Business sector.
    pub industry: String,
    /// Analysis date, `YYYY-MM-DD`.
    pub analysis_date: String,
    /// Financial ratios reported by the stage, if structured.
    pub financial_ratios: Map<String, Value>,
    /// Quarterly trends reported by the stage, if structured.
    pub quarterly_trends: Map<String, Value>,
    /// Valuation text.
    pub valuation_assessment: String,
    /// Performance evaluation line.
    pub performance_evaluation: String,
}

/// Technical analysis facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalFacet {
    /// Ticker symbol.
    pub symbol: String,
    /// Company name.
    pub company_name: String,
    /// Business sector.
    pub industry: String,
    /// Analysis date, `YYYY-MM-DD`.
    pub analysis_date: String,
    /// Last price reported by the stage; zero when unknown.
    pub current_price: f64,
    /// Last volume reported by the stage; zero when unknown.
    pub current_volume: f64,
    /// Indicator values reported by the stage, if structured.
    pub technical_indicators: Map<String, Value>,
    /// Support and resistance levels reported by the stage, if structured.
    pub support_resistance: Map<String, Value>,
    /// Trend text.
    pub trend_analysis: String,
    /// Signals line.
    pub technical_signals: String,
}

/// All four facets of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteAnalysis {
    /// Ticker symbol.
    pub symbol: String,
    /// Analysis date, `YYYY-MM-DD`.
    pub analysis_date: String,
    /// News facet.
    pub market_analysis: NewsFacet,
    /// Fundamental facet.
    pub fundamental_analysis: FundamentalFacet,
    /// Technical facet.
    pub technical_analysis: TechnicalFacet,
    /// The decision.
    pub investment_decision: DecisionRecord,
}

/// Service liveness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always "healthy" while the service answers.
    pub status: String,
    /// Current date, `YYYY-MM-DD`.
    pub timestamp: String,
}

/// Static service description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name.
    pub name: String,
    /// Crate version.
    pub version: String,
    /// One-line description.
    pub description: String,
    /// Operation names offered by the service.
    pub operations: Vec<String>,
}
