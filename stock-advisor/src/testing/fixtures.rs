//! Canned advisor data.

use super::ScriptedExecutor;
use crate::context::Subject;
use crate::pipeline::AdvisorStage;
use chrono::NaiveDate;
use serde_json::{json, Value};

/// HPG analysed as of 2025-01-10.
#[must_use]
pub fn hpg_subject() -> Subject {
    Subject {
        identifier: "HPG".to_string(),
        as_of_date: NaiveDate::from_ymd_opt(2025, 1, 10),
    }
}

/// A complete, well-formed decision payload for HPG.
#[must_use]
pub fn decision_payload() -> Value {
    json!({
        "stock_ticker": "HPG",
        "full_name": "Công ty Cổ phần Tập đoàn Hòa Phát",
        "industry": "Thép",
        "today_date": "2025-01-10",
        "decision": "buy",
        "macro_reasoning": "Chính sách tiền tệ nới lỏng hỗ trợ nhu cầu thép",
        "fund_reasoning": "P/E thấp hơn trung bình ngành, biên lợi nhuận cải thiện",
        "tech_reasoning": "Giá vượt MA50 với khối lượng tăng",
        "buy_price": 25400.0,
        "sell_price": 29800.0,
        "overall_score": 7.8
    })
}

/// An executor answering every advisor stage.
///
/// The three analyses return text, a fundamental record and a technical
/// record; the decision stage returns `decision`.
#[must_use]
pub fn advisor_executor(decision: impl Into<crate::core::StageValue>) -> ScriptedExecutor {
    ScriptedExecutor::new()
        .with_result(
            AdvisorStage::NewsCollecting.name(),
            "news... Ngân hàng Nhà nước giữ nguyên lãi suất điều hành",
        )
        .with_result(
            AdvisorStage::FundamentalAnalysis.name(),
            json!({"summary": "financial... P/E 9.1, ROE 12%", "financial_ratios": {"pe": 9.1, "roe": 0.12}}),
        )
        .with_result(
            AdvisorStage::TechnicalAnalysis.name(),
            json!({"summary": "technical... xu hướng tăng", "current_price": 25900.0}),
        )
        .with_result(AdvisorStage::InvestmentDecision.name(), decision)
}
