//! The subject of an analysis run.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The thing being analysed: a ticker symbol and an optional as-of date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Ticker symbol (e.g. "HPG").
    #[serde(alias = "symbol")]
    pub identifier: String,
    /// Analysis date; today when absent.
    #[serde(default, alias = "current_date", skip_serializing_if = "Option::is_none")]
    pub as_of_date: Option<NaiveDate>,
}

impl Subject {
    /// Creates a subject analysed as of today.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            as_of_date: None,
        }
    }

    /// Pins the analysis date.
    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.as_of_date = Some(date);
        self
    }

    /// Returns the date the analysis applies to.
    #[must_use]
    pub fn effective_date(&self) -> NaiveDate {
        self.as_of_date.unwrap_or_else(today)
    }

    /// Returns a copy with the effective date pinned.
    ///
    /// Runs pin the date once so every stage sees the same day even when a
    /// run straddles midnight.
    #[must_use]
    pub fn pinned(&self) -> Self {
        Self {
            identifier: self.identifier.clone(),
            as_of_date: Some(self.effective_date()),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_of_date {
            Some(date) => write!(f, "{}@{}", self.identifier, date),
            None => f.write_str(&self.identifier),
        }
    }
}

/// Returns the local calendar date.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_date_prefers_explicit() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let subject = Subject::new("HPG").with_date(date);
        assert_eq!(subject.effective_date(), date);
        assert_eq!(subject.to_string(), "HPG@2025-01-10");
    }

    #[test]
    fn test_effective_date_defaults_to_today() {
        let subject = Subject::new("VNM");
        assert_eq!(subject.effective_date(), today());
        assert!(subject.pinned().as_of_date.is_some());
    }

    #[test]
    fn test_deserialize_request_shape() {
        let subject: Subject =
            serde_json::from_str(r#"{"symbol": "FPT", "current_date": "2025-09-15"}"#).unwrap();
        assert_eq!(subject.identifier, "FPT");
        assert_eq!(subject.as_of_date, NaiveDate::from_ymd_opt(2025, 9, 15));

        let subject: Subject = serde_json::from_str(r#"{"identifier": "FPT"}"#).unwrap();
        assert_eq!(subject.as_of_date, None);
    }
}
