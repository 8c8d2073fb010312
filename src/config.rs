//! Judge configuration.
//!
//! A [`JudgeConfig`] is built once (defaults, then environment, then CLI
//! overrides) and passed explicitly to the judge and the batch evaluator.

use std::time::Duration;

use crate::error::ConfigError;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";

/// Default judge model.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

/// Configuration shared by the judge client and the batch evaluator.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Model identifier sent with every judge request.
    pub model: String,
    /// Base URL of the chat completions API.
    pub api_base: String,
    /// Bearer token for the API, if it requires one.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Total attempts per record, including the first one.
    pub max_retries: u32,
    /// Maximum number of judge calls in flight.
    pub concurrency: usize,
    /// Sampling temperature for the judge.
    pub temperature: f64,
    /// Maximum tokens the judge may generate.
    pub max_tokens: u32,
    /// Delay before the first retry; doubled on each further retry.
    pub backoff_base: Duration,
    /// Upper bound for a single retry delay.
    pub backoff_max: Duration,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            timeout: Duration::from_secs(120),
            max_retries: 10,
            concurrency: 3,
            temperature: 0.0,
            max_tokens: 1024,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(15),
        }
    }
}

impl JudgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `JUDGE_MODEL`: judge model identifier
    /// - `JUDGE_API_BASE` (or `OPENAI_BASE_URL`): chat completions base URL
    /// - `JUDGE_API_KEY` (or `OPENAI_API_KEY`): API key
    /// - `JUDGE_TIMEOUT_SECS`: per-request timeout (default: 120)
    /// - `JUDGE_MAX_RETRIES`: attempt ceiling per record (default: 10)
    /// - `JUDGE_CONCURRENCY`: judge calls in flight (default: 3)
    /// - `JUDGE_TEMPERATURE`: sampling temperature (default: 0.0)
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::load_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the environment like [`JudgeConfig::from_env`] without validating.
    ///
    /// Unparseable values are still errors. Range checks are left to the
    /// caller, which may override values before calling `validate`.
    pub fn load_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("JUDGE_MODEL") {
            config.model = val;
        }

        if let Some(val) = first_env(&["JUDGE_API_BASE", "OPENAI_BASE_URL"]) {
            config.api_base = val;
        }

        if let Some(val) = first_env(&["JUDGE_API_KEY", "OPENAI_API_KEY"]) {
            config.api_key = Some(val);
        }

        if let Ok(val) = std::env::var("JUDGE_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "JUDGE_TIMEOUT_SECS")?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("JUDGE_MAX_RETRIES") {
            config.max_retries = parse_env_value(&val, "JUDGE_MAX_RETRIES")?;
        }

        if let Ok(val) = std::env::var("JUDGE_CONCURRENCY") {
            config.concurrency = parse_env_value(&val, "JUDGE_CONCURRENCY")?;
        }

        if let Ok(val) = std::env::var("JUDGE_TEMPERATURE") {
            config.temperature = parse_env_value(&val, "JUDGE_TEMPERATURE")?;
        }

        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model cannot be empty".to_string(),
            ));
        }

        if self.api_base.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_base cannot be empty".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_retries == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_retries must be at least 1".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(ConfigError::ValidationFailed(
                "concurrency must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.backoff_base > self.backoff_max {
            return Err(ConfigError::ValidationFailed(
                "backoff_base cannot exceed backoff_max".to_string(),
            ));
        }

        Ok(())
    }

    /// Delay before retry number `retry` (1-based): base * 2^(retry-1), capped.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let delay = self.backoff_base.saturating_mul(1u32 << exponent);
        delay.min(self.backoff_max)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }
}

/// First non-empty value among `keys`.
fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|val| !val.trim().is_empty())
}

fn parse_env_value<T: std::str::FromStr>(val: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    val.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
