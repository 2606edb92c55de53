//! Decoding the decision stage's output into a [`DecisionRecord`].
//!
//! Decoding never fails: every field has a default and a payload that cannot
//! be read at all yields a fallback record.

use crate::config::{AdvisorConfig, PlaceholderLabels};
use crate::context::Subject;
use crate::core::StageValue;
use crate::pipeline::{decision_schema, OutputSchema};
use crate::resolve::Resolution;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Date format of `today_date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A trading recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Action {
    /// Buy the stock.
    Buy,
    /// Keep the current position.
    #[default]
    Hold,
    /// Sell the stock.
    Sell,
}

impl Action {
    /// Reads an action label in English or Vietnamese, ignoring case.
    #[must_use]
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "buy" | "mua" => Some(Self::Buy),
            "hold" | "giữ" | "giu" => Some(Self::Hold),
            "sell" | "bán" | "ban" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl From<String> for Action {
    fn from(label: String) -> Self {
        Self::parse_label(&label).unwrap_or_default()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("buy"),
            Self::Hold => f.write_str("hold"),
            Self::Sell => f.write_str("sell"),
        }
    }
}

/// The final recommendation. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Ticker symbol.
    pub stock_ticker: String,
    /// Company name.
    pub full_name: String,
    /// Business sector.
    pub industry: String,
    /// Analysis date, `YYYY-MM-DD`.
    pub today_date: String,
    /// The recommendation.
    pub decision: Action,
    /// Reasoning from macroeconomic news and policy.
    pub macro_reasoning: String,
    /// Reasoning from fundamental analysis.
    pub fund_reasoning: String,
    /// Reasoning from technical analysis.
    pub tech_reasoning: String,
    /// Recommended buy price.
    pub buy_price: f64,
    /// Recommended sell price.
    pub sell_price: f64,
    /// Overall score as reported by the decision stage; zero when absent.
    pub overall_score: f64,
}

/// Why a payload could not be read as a decision.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeFailure {
    /// The stage produced nothing.
    #[error("decision output is empty")]
    Empty,

    /// The text is not valid JSON.
    #[error("decision output is not valid JSON: {0}")]
    Malformed(String),

    /// The JSON is valid but not an object.
    #[error("decision output is a JSON {0}, not an object")]
    NotAnObject(&'static str),

    /// The decision stage could not be isolated from the run result.
    #[error("decision stage output could not be resolved")]
    Unresolved,
}

/// The result of decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// The payload was an object; absent or mistyped fields took defaults.
    Parsed {
        /// The record.
        record: DecisionRecord,
        /// Fields that took their default: schema fields the payload lacks,
        /// then fields present with an unreadable value.
        defaulted: Vec<String>,
    },
    /// The payload could not be read; every field took its fallback.
    Fallback {
        /// The record.
        record: DecisionRecord,
        /// Why.
        reason: DecodeFailure,
    },
}

impl Decoded {
    /// Returns the record.
    #[must_use]
    pub fn record(&self) -> &DecisionRecord {
        match self {
            Self::Parsed { record, .. } | Self::Fallback { record, .. } => record,
        }
    }

    /// Consumes the outcome, returning the record.
    #[must_use]
    pub fn into_record(self) -> DecisionRecord {
        match self {
            Self::Parsed { record, .. } | Self::Fallback { record, .. } => record,
        }
    }

    /// Returns true if the payload was readable.
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }
}

/// Reads decision payloads.
#[derive(Debug, Clone)]
pub struct DecisionDecoder {
    labels: PlaceholderLabels,
    prefix_chars: usize,
    schema: OutputSchema,
}

impl Default for DecisionDecoder {
    fn default() -> Self {
        Self::from_config(&AdvisorConfig::default())
    }
}

impl DecisionDecoder {
    /// Creates a decoder.
    #[must_use]
    pub fn new(labels: PlaceholderLabels, prefix_chars: usize) -> Self {
        Self {
            labels,
            prefix_chars,
            schema: decision_schema(),
        }
    }

    /// Checks payloads against `schema` instead of the default decision schema.
    #[must_use]
    pub fn with_schema(mut self, schema: OutputSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Creates a decoder from the service configuration.
    #[must_use]
    pub fn from_config(config: &AdvisorConfig) -> Self {
        Self::new(config.labels.clone(), config.decision_prefix_chars)
    }

    /// Decodes a stage value.
    ///
    /// Records are read field by field. Text is parsed as strict JSON and
    /// must hold an object.
    #[must_use]
    pub fn decode(&self, input: &StageValue, subject: &Subject, fallback_date: NaiveDate) -> Decoded {
        let parsed = match input {
            StageValue::Record(map) => Ok(map.clone()),
            StageValue::Text(text) => parse_object(text),
            StageValue::Opaque(value) => match value {
                Value::Object(map) => Ok(map.clone()),
                other => Err(DecodeFailure::NotAnObject(json_kind(other))),
            },
        };

        match parsed {
            Ok(map) => {
                let (record, mistyped) = read_record(&map, subject, fallback_date);
                let mut defaulted = self.schema.missing_fields(&map);
                defaulted.extend(mistyped.into_iter().map(String::from));
                if !defaulted.is_empty() {
                    debug!(subject = %subject.identifier, ?defaulted, "Decision fields took defaults");
                }
                Decoded::Parsed { record, defaulted }
            }
            Err(reason) => {
                warn!(subject = %subject.identifier, reason = %reason, "Decision output unreadable; using fallback record");
                let record = self.fallback_record(&input.to_string(), subject, fallback_date);
                Decoded::Fallback { record, reason }
            }
        }
    }

    /// Decodes a resolved decision stage.
    ///
    /// A resolution that fell back to the whole run result is not the
    /// decision stage's output, so it yields a fallback record.
    #[must_use]
    pub fn decode_resolution(
        &self,
        resolution: &Resolution,
        subject: &Subject,
        fallback_date: NaiveDate,
    ) -> Decoded {
        match resolution {
            Resolution::Resolved { value, .. } => self.decode(value, subject, fallback_date),
            Resolution::Fallback { value, .. } => {
                warn!(subject = %subject.identifier, "Decision stage unresolved; using fallback record");
                Decoded::Fallback {
                    record: self.fallback_record(&value.to_string(), subject, fallback_date),
                    reason: DecodeFailure::Unresolved,
                }
            }
        }
    }

    fn fallback_record(&self, raw: &str, subject: &Subject, date: NaiveDate) -> DecisionRecord {
        DecisionRecord {
            stock_ticker: subject.identifier.clone(),
            full_name: self.labels.company_name.clone(),
            industry: self.labels.industry.clone(),
            today_date: date.format(DATE_FORMAT).to_string(),
            decision: Action::Hold,
            macro_reasoning: raw.chars().take(self.prefix_chars).collect(),
            fund_reasoning: self.labels.fundamental_reasoning.clone(),
            tech_reasoning: self.labels.technical_reasoning.clone(),
            buy_price: 0.0,
            sell_price: 0.0,
            overall_score: 0.0,
        }
    }
}

fn parse_object(text: &str) -> Result<Map<String, Value>, DecodeFailure> {
    if text.trim().is_empty() {
        return Err(DecodeFailure::Empty);
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DecodeFailure::NotAnObject(json_kind(&other))),
        Err(e) => Err(DecodeFailure::Malformed(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads every field, defaulting absent ones. Returns the fields that were
/// present but unreadable.
fn read_record(
    map: &Map<String, Value>,
    subject: &Subject,
    fallback_date: NaiveDate,
) -> (DecisionRecord, Vec<&'static str>) {
    let mut mistyped = Vec::new();
    let mut text = |field: &'static str, default: String| match map.get(field) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => default,
        Some(_) => {
            mistyped.push(field);
            default
        }
    };

    let stock_ticker = text("stock_ticker", subject.identifier.clone());
    let full_name = text("full_name", String::new());
    let industry = text("industry", String::new());
    let today_date = text("today_date", fallback_date.format(DATE_FORMAT).to_string());
    let macro_reasoning = text("macro_reasoning", String::new());
    let fund_reasoning = text("fund_reasoning", String::new());
    let tech_reasoning = text("tech_reasoning", String::new());

    let decision = match map.get("decision") {
        None | Some(Value::Null) => Action::Hold,
        Some(value) => value.as_str().and_then(Action::parse_label).unwrap_or_else(|| {
            mistyped.push("decision");
            Action::Hold
        }),
    };

    let mut number = |field: &'static str| match map.get(field) {
        None | Some(Value::Null) => 0.0,
        Some(value) => read_number(value).unwrap_or_else(|| {
            mistyped.push(field);
            0.0
        }),
    };
    let buy_price = number("buy_price");
    let sell_price = number("sell_price");
    let overall_score = number("overall_score");

    let record = DecisionRecord {
        stock_ticker,
        full_name,
        industry,
        today_date,
        decision,
        macro_reasoning,
        fund_reasoning,
        tech_reasoning,
        buy_price,
        sell_price,
        overall_score,
    };
    (record, mistyped)
}

fn read_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}
