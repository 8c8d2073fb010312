//! Judge client: one record in, one verdict (or classified failure) out.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::JudgeConfig;
use crate::error::{JudgeError, LlmError};
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::metrics::JudgeMetrics;

use super::prompt::{build_user_prompt, JUDGE_SYSTEM_PROMPT};
use super::verdict::{parse_verdict, Verdict};

/// The three texts a verdict is based on.
#[derive(Debug, Clone, Copy)]
pub struct JudgeInput<'a> {
    pub instruction: &'a str,
    pub answer: &'a str,
    pub prediction: &'a str,
}

impl<'a> JudgeInput<'a> {
    pub fn new(instruction: &'a str, answer: &'a str, prediction: &'a str) -> Self {
        Self {
            instruction,
            answer,
            prediction,
        }
    }

    /// Rejects inputs that cannot be judged meaningfully.
    pub fn validate(&self) -> Result<(), JudgeError> {
        for (name, value) in [
            ("instruction", self.instruction),
            ("answer", self.answer),
            ("prediction", self.prediction),
        ] {
            if value.trim().is_empty() {
                return Err(JudgeError::InvalidInput(format!("{} is empty", name)));
            }
        }
        Ok(())
    }
}

/// Anything that can grade a prediction against a reference answer.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Model or method name recorded with every verdict.
    fn model(&self) -> &str;

    async fn judge(&self, input: &JudgeInput<'_>) -> Result<Verdict, JudgeError>;
}

/// Judge backed by an LLM behind [`LlmProvider`].
///
/// Transient backend failures are retried with capped exponential backoff up
/// to `max_retries` total attempts. Parse failures and fatal backend errors
/// are returned immediately.
pub struct LlmJudge {
    provider: Arc<dyn LlmProvider>,
    config: JudgeConfig,
    metrics: Option<Arc<JudgeMetrics>>,
}

impl LlmJudge {
    pub fn new(provider: Arc<dyn LlmProvider>, config: JudgeConfig) -> Self {
        Self {
            provider,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<JudgeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    fn build_request(&self, input: &JudgeInput<'_>) -> GenerationRequest {
        GenerationRequest::new(
            self.config.model.clone(),
            vec![
                Message::system(JUDGE_SYSTEM_PROMPT),
                Message::user(build_user_prompt(
                    input.instruction,
                    input.answer,
                    input.prediction,
                )),
            ],
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
    }

    /// One call with the configured timeout applied around the provider.
    async fn attempt(&self, request: GenerationRequest) -> Result<String, LlmError> {
        let started = Instant::now();
        let result = tokio::time::timeout(self.config.timeout, self.provider.generate(request))
            .await
            .unwrap_or(Err(LlmError::Timeout {
                seconds: self.config.timeout.as_secs(),
            }));
        let elapsed = started.elapsed();

        match result {
            Ok(response) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_request("success", elapsed);
                    metrics.record_tokens(&response.usage);
                }
                Ok(response.first_content().unwrap_or_default().to_string())
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    let outcome = if e.is_transient() {
                        "transient_error"
                    } else {
                        "fatal_error"
                    };
                    metrics.record_request(outcome, elapsed);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Judge for LlmJudge {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn judge(&self, input: &JudgeInput<'_>) -> Result<Verdict, JudgeError> {
        input.validate()?;

        let request = self.build_request(input);
        let max_attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.config.backoff_delay(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
                if let Some(metrics) = &self.metrics {
                    metrics.record_retry();
                }
                tokio::time::sleep(delay).await;
            }

            match self.attempt(request.clone()).await {
                Ok(reply) => {
                    let verdict = parse_verdict(&reply);
                    if let Some(metrics) = &self.metrics {
                        match &verdict {
                            Ok(v) => metrics.record_score(v.score),
                            Err(_) => metrics.record_parse_failure(),
                        }
                    }
                    return verdict;
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "Judge call failed, will retry"
                    );
                    last_error = e.to_string();
                }
                Err(e) => return Err(JudgeError::Fatal(e.to_string())),
            }
        }

        Err(JudgeError::Transient {
            attempts: max_attempts,
            message: last_error,
        })
    }
}
