//! Service and model-provider configuration.
//!
//! Both structs are built once at startup and passed by reference. The
//! orchestration core reads [`AdvisorConfig`]; [`ProviderConfig`] is only
//! handed to executor implementations.

use crate::errors::ConfigError;
use crate::pipeline::AdvisorStage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Budget for the composite analysis, in seconds.
pub const DEFAULT_COMPLETE_TIMEOUT_SECS: u64 = 60;
/// Display budget for narrative stage text.
pub const DEFAULT_NARRATIVE_CHARS: usize = 500;
/// Display budget for analytical stage text.
pub const DEFAULT_ANALYTICAL_CHARS: usize = 300;
/// Length of the raw-text prefix kept when a decision cannot be parsed.
pub const DEFAULT_DECISION_PREFIX_CHARS: usize = 200;

const ENV_COMPLETE_TIMEOUT: &str = "ADVISOR_COMPLETE_TIMEOUT_SECS";
const ENV_FACET_TIMEOUT: &str = "ADVISOR_FACET_TIMEOUT_SECS";
const ENV_NARRATIVE_CHARS: &str = "ADVISOR_NEWS_DISPLAY_CHARS";
const ENV_ANALYTICAL_CHARS: &str = "ADVISOR_ANALYSIS_DISPLAY_CHARS";

/// Maximum characters of stage text shown in facet responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayBudgets {
    /// Budget for the news stage.
    pub narrative: usize,
    /// Budget for the fundamental and technical stages.
    pub analytical: usize,
}

impl Default for DisplayBudgets {
    fn default() -> Self {
        Self {
            narrative: DEFAULT_NARRATIVE_CHARS,
            analytical: DEFAULT_ANALYTICAL_CHARS,
        }
    }
}

impl DisplayBudgets {
    /// Returns the budget that applies to a stage.
    #[must_use]
    pub fn for_stage(&self, stage: AdvisorStage) -> usize {
        if stage.is_narrative() {
            self.narrative
        } else {
            self.analytical
        }
    }
}

/// Static text for response fields the pipeline does not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderLabels {
    /// Company name when none is known.
    pub company_name: String,
    /// Industry when none is known.
    pub industry: String,
    /// Market impact line of the news facet.
    pub market_impact: String,
    /// Market impact line inside the composite analysis.
    pub market_impact_brief: String,
    /// Performance evaluation line of the fundamental facet.
    pub performance_evaluation: String,
    /// Signals line of the technical facet.
    pub technical_signals: String,
    /// Fundamental reasoning of a fallback decision.
    pub fundamental_reasoning: String,
    /// Technical reasoning of a fallback decision.
    pub technical_reasoning: String,
}

impl Default for PlaceholderLabels {
    fn default() -> Self {
        Self {
            company_name: "Công ty cổ phần".to_string(),
            industry: "Chưa xác định".to_string(),
            market_impact: "Phân tích tác động thị trường từ tin tức vĩ mô".to_string(),
            market_impact_brief: "Phân tích tác động thị trường".to_string(),
            performance_evaluation: "Đánh giá hiệu suất tài chính".to_string(),
            technical_signals: "Tín hiệu kỹ thuật".to_string(),
            fundamental_reasoning: "Phân tích cơ bản".to_string(),
            technical_reasoning: "Phân tích kỹ thuật".to_string(),
        }
    }
}

/// Configuration of the advisor service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Budget for [`crate::AdvisorService::analyze_complete`].
    pub complete_timeout: Duration,
    /// Budget for single-facet operations; unbounded when `None`.
    pub facet_timeout: Option<Duration>,
    /// Display budgets for resolved text.
    pub display: DisplayBudgets,
    /// Raw-text prefix kept in a fallback decision.
    pub decision_prefix_chars: usize,
    /// Placeholder text.
    pub labels: PlaceholderLabels,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            complete_timeout: Duration::from_secs(DEFAULT_COMPLETE_TIMEOUT_SECS),
            facet_timeout: None,
            display: DisplayBudgets::default(),
            decision_prefix_chars: DEFAULT_DECISION_PREFIX_CHARS,
            labels: PlaceholderLabels::default(),
        }
    }
}

impl AdvisorConfig {
    /// Loads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparseable or zero values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads overrides through a lookup function.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparseable or zero values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(secs) = parse_positive(&lookup, ENV_COMPLETE_TIMEOUT)? {
            config.complete_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_positive(&lookup, ENV_FACET_TIMEOUT)? {
            config.facet_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(chars) = parse_positive(&lookup, ENV_NARRATIVE_CHARS)? {
            config.display.narrative = usize::try_from(chars).map_err(|_| invalid(ENV_NARRATIVE_CHARS, chars))?;
        }
        if let Some(chars) = parse_positive(&lookup, ENV_ANALYTICAL_CHARS)? {
            config.display.analytical = usize::try_from(chars).map_err(|_| invalid(ENV_ANALYTICAL_CHARS, chars))?;
        }
        Ok(config)
    }

    /// Sets the composite analysis budget.
    #[must_use]
    pub fn with_complete_timeout(mut self, timeout: Duration) -> Self {
        self.complete_timeout = timeout;
        self
    }

    /// Sets the single-facet budget.
    #[must_use]
    pub fn with_facet_timeout(mut self, timeout: Duration) -> Self {
        self.facet_timeout = Some(timeout);
        self
    }

    /// Sets the display budgets.
    #[must_use]
    pub fn with_display(mut self, display: DisplayBudgets) -> Self {
        self.display = display;
        self
    }

    /// Sets the placeholder labels.
    #[must_use]
    pub fn with_labels(mut self, labels: PlaceholderLabels) -> Self {
        self.labels = labels;
        self
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
    }
}

fn invalid(key: &str, value: u64) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// The hosted model family stage executors talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProvider {
    /// Google Gemini.
    #[default]
    Gemini,
    /// AWS Bedrock.
    Bedrock,
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => f.write_str("gemini"),
            Self::Bedrock => f.write_str("bedrock"),
        }
    }
}

/// A secret value that never appears in debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// AWS credentials for Bedrock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    /// Access key id.
    pub access_key_id: Secret,
    /// Secret access key.
    pub secret_access_key: Secret,
    /// Session token for temporary credentials.
    pub session_token: Option<Secret>,
    /// Region name.
    pub region: String,
}

/// Model selection and credentials for stage executors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Selected provider.
    pub provider: ModelProvider,
    /// Model for the analysis stages.
    pub model: Option<String>,
    /// Model for the decision stage.
    pub reasoning_model: Option<String>,
    /// Gemini API key.
    pub gemini_api_key: Option<Secret>,
    /// Bedrock credentials.
    pub aws: Option<AwsCredentials>,
    /// Web search API key used by the news stage.
    pub search_api_key: Option<Secret>,
}

impl ProviderConfig {
    const DEFAULT_AWS_REGION: &'static str = "us-east-1";
    const DEFAULT_BEDROCK_MODEL: &'static str = "anthropic.claude-3-sonnet-20240229-v1:0";
    const DEFAULT_BEDROCK_REASONING_MODEL: &'static str =
        "anthropic.claude-3-5-sonnet-20241022-v2:0";

    /// Loads provider settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when the selected provider lacks
    /// credentials, or [`ConfigError::Invalid`] for a bad flag value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads provider settings through a lookup function.
    ///
    /// Bedrock wins when `USE_AWS_MODELS` is true; otherwise Gemini is used.
    ///
    /// # Errors
    ///
    /// See [`ProviderConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let use_aws = parse_flag(non_empty("USE_AWS_MODELS"), "USE_AWS_MODELS", false)?;
        let search_api_key = non_empty("SERPER_API_KEY").map(Secret::new);

        if use_aws {
            let access_key_id = non_empty("AWS_ACCESS_KEY_ID")
                .ok_or_else(|| ConfigError::Missing("AWS_ACCESS_KEY_ID".to_string()))?;
            let secret_access_key = non_empty("AWS_SECRET_ACCESS_KEY")
                .ok_or_else(|| ConfigError::Missing("AWS_SECRET_ACCESS_KEY".to_string()))?;
            return Ok(Self {
                provider: ModelProvider::Bedrock,
                model: Some(
                    non_empty("AWS_CLAUDE_MODEL")
                        .unwrap_or_else(|| Self::DEFAULT_BEDROCK_MODEL.to_string()),
                ),
                reasoning_model: Some(
                    non_empty("AWS_CLAUDE_REASONING_MODEL")
                        .unwrap_or_else(|| Self::DEFAULT_BEDROCK_REASONING_MODEL.to_string()),
                ),
                gemini_api_key: None,
                aws: Some(AwsCredentials {
                    access_key_id: Secret::new(access_key_id),
                    secret_access_key: Secret::new(secret_access_key),
                    session_token: non_empty("AWS_SESSION_TOKEN").map(Secret::new),
                    region: non_empty("AWS_REGION")
                        .unwrap_or_else(|| Self::DEFAULT_AWS_REGION.to_string()),
                }),
                search_api_key,
            });
        }

        let gemini_api_key = non_empty("GEMINI_API_KEY")
            .ok_or_else(|| ConfigError::Missing("GEMINI_API_KEY".to_string()))?;
        Ok(Self {
            provider: ModelProvider::Gemini,
            model: non_empty("GEMINI_MODEL"),
            reasoning_model: non_empty("GEMINI_REASONING_MODEL"),
            gemini_api_key: Some(Secret::new(gemini_api_key)),
            aws: None,
            search_api_key,
        })
    }
}

fn parse_flag(raw: Option<String>, key: &str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AdvisorConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, AdvisorConfig::default());
        assert_eq!(config.complete_timeout, Duration::from_secs(60));
        assert_eq!(config.facet_timeout, None);
        assert_eq!(config.display.for_stage(AdvisorStage::NewsCollecting), 500);
        assert_eq!(config.display.for_stage(AdvisorStage::TechnicalAnalysis), 300);
        assert_eq!(config.decision_prefix_chars, 200);
    }

    #[test]
    fn test_env_overrides() {
        let config = AdvisorConfig::from_lookup(lookup(&[
            ("ADVISOR_COMPLETE_TIMEOUT_SECS", "90"),
            ("ADVISOR_FACET_TIMEOUT_SECS", "30"),
            ("ADVISOR_ANALYSIS_DISPLAY_CHARS", "120"),
        ]))
        .unwrap();

        assert_eq!(config.complete_timeout, Duration::from_secs(90));
        assert_eq!(config.facet_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.display.analytical, 120);
        assert_eq!(config.display.narrative, 500);
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        for value in ["0", "soon", "-5"] {
            let err = AdvisorConfig::from_lookup(lookup(&[("ADVISOR_COMPLETE_TIMEOUT_SECS", value)]))
                .unwrap_err();
            assert_eq!(
                err,
                ConfigError::Invalid {
                    key: "ADVISOR_COMPLETE_TIMEOUT_SECS".to_string(),
                    value: value.to_string(),
                }
            );
        }
    }

    #[test]
    fn test_gemini_by_default() {
        let config = ProviderConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "g-key"),
            ("GEMINI_MODEL", "gemini/gemini-2.0-flash"),
        ]))
        .unwrap();

        assert_eq!(config.provider, ModelProvider::Gemini);
        assert_eq!(config.model.as_deref(), Some("gemini/gemini-2.0-flash"));
        assert_eq!(config.gemini_api_key.as_ref().map(Secret::expose), Some("g-key"));
        assert!(config.aws.is_none());
    }

    #[test]
    fn test_gemini_requires_key() {
        let err = ProviderConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("GEMINI_API_KEY".to_string()));
    }

    #[test]
    fn test_bedrock_requires_both_keys() {
        let err = ProviderConfig::from_lookup(lookup(&[
            ("USE_AWS_MODELS", "true"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
        ]))
        .unwrap_err();

        assert_eq!(err, ConfigError::Missing("AWS_SECRET_ACCESS_KEY".to_string()));
    }

    #[test]
    fn test_bedrock_defaults() {
        let config = ProviderConfig::from_lookup(lookup(&[
            ("USE_AWS_MODELS", "TRUE"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "shh"),
        ]))
        .unwrap();

        assert_eq!(config.provider, ModelProvider::Bedrock);
        let aws = config.aws.unwrap();
        assert_eq!(aws.region, "us-east-1");
        assert!(aws.session_token.is_none());
        assert_eq!(
            config.reasoning_model.as_deref(),
            Some("anthropic.claude-3-5-sonnet-20241022-v2:0")
        );
    }

    #[test]
    fn test_secrets_redacted_in_debug() {
        let config = ProviderConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "top-secret")])).unwrap();
        let debug = format!("{config:?}");

        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("Secret(***)"));
    }

    #[test]
    fn test_bad_flag_rejected() {
        let err = ProviderConfig::from_lookup(lookup(&[("USE_AWS_MODELS", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
