//! Typed configuration schema with serde defaults.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Default model, matching the backend's current lightweight tier.
const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

const DEFAULT_BACKEND_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub generator: GeneratorConfig,
    pub backend: BackendConfig,
    pub retry: RetryConfig,
}

impl AppConfig {
    /// Validate cross-field invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generator.model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "generator.model must not be empty".to_string(),
            ));
        }
        if self.retry.attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.exp_base < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.exp_base must be at least 1.0".to_string(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(ConfigError::Invalid(
                "retry.max_delay_ms must not be below retry.initial_delay_ms".to_string(),
            ));
        }
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "backend.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Which answer-generation strategy the relay runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorStrategy {
    /// One agent answers directly, optionally with search attached.
    Single,
    /// A research agent gathers findings, a coordinator summarizes them.
    Pipeline,
}

impl std::fmt::Display for GeneratorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorStrategy::Single => write!(f, "single"),
            GeneratorStrategy::Pipeline => write!(f, "pipeline"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Strategy selector; both variants ship, neither is hardcoded.
    pub strategy: GeneratorStrategy,
    /// Model identifier for the answering (or coordinating) agent.
    pub model: String,
    /// Model identifier for the research agent. Defaults to `model`.
    pub research_model: Option<String>,
    /// Attach the backend's built-in search capability.
    pub search: bool,
    /// Instruction for the single-stage agent.
    pub instruction: String,
    /// Instruction for the pipeline's research agent.
    pub research_instruction: String,
    /// Instruction for the pipeline's coordinator agent.
    pub summarize_instruction: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            strategy: GeneratorStrategy::Pipeline,
            model: DEFAULT_MODEL.to_string(),
            research_model: None,
            search: true,
            instruction: "Answer the user's question directly and concisely.".to_string(),
            research_instruction:
                "Research the user's question and report the relevant findings, with sources \
                 where available."
                    .to_string(),
            summarize_instruction:
                "Provide a clean and short answer based on the findings.".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Model for the research stage, falling back to the main model.
    pub fn research_model(&self) -> &str {
        self.research_model.as_deref().unwrap_or(&self.model)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the generation API.
    pub base_url: String,
    /// API credential. The environment takes precedence; see
    /// `settings::resolve_api_key`.
    pub api_key: Option<String>,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

/// Retry policy for backend calls. Bounded total attempt time keeps a single
/// query from hanging a session indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Exponential growth factor between retries.
    pub exp_base: f64,
    /// Upper bound on any single backoff delay, in milliseconds.
    pub max_delay_ms: u64,
    /// HTTP status codes that are worth retrying.
    pub retryable_status: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay_ms: 1_000,
            exp_base: 2.0,
            max_delay_ms: 30_000,
            retryable_status: vec![429, 500, 503, 504],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn test_strategy_serde_names() {
        let single: GeneratorStrategy = serde_json::from_str("\"single\"").unwrap();
        let pipeline: GeneratorStrategy = serde_json::from_str("\"pipeline\"").unwrap();
        assert_eq!(single, GeneratorStrategy::Single);
        assert_eq!(pipeline, GeneratorStrategy::Pipeline);
        assert_eq!(single.to_string(), "single");
        assert_eq!(pipeline.to_string(), "pipeline");
    }

    #[test]
    fn test_research_model_fallback() {
        let mut config = GeneratorConfig::default();
        assert_eq!(config.research_model(), DEFAULT_MODEL);
        config.research_model = Some("gemini-2.5-pro".to_string());
        assert_eq!(config.research_model(), "gemini-2.5-pro");
    }

    #[test]
    fn test_validate_max_below_initial() {
        let mut config = AppConfig::default();
        config.retry.initial_delay_ms = 5_000;
        config.retry.max_delay_ms = 1_000;
        assert!(config.validate().is_err());
    }
}
