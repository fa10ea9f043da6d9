//! Querying answer models.
//!
//! Every provider sits behind [`AnswerModel`], a single `prompt -> text`
//! capability. Failures are split into transient (worth retrying) and terminal,
//! and one [`RetryPolicy`] governs all providers.

use async_trait::async_trait;
use chat::{Message, Request};
use std::time::Duration;
use thiserror::Error;

/// A failed model query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// Service unavailable, overloaded or unreachable.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Anything retrying will not fix.
    #[error("terminal failure: {0}")]
    Terminal(String),
}

impl QueryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, QueryError::Transient(_))
    }
}

impl From<chat::Error> for QueryError {
    fn from(err: chat::Error) -> Self {
        if err.is_unavailable() {
            QueryError::Transient(err.to_string())
        } else {
            QueryError::Terminal(err.to_string())
        }
    }
}

/// Something that answers prompts.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    /// Short identifier used for dataset column names (`gpt`, `gemini`, ...).
    fn name(&self) -> &str;

    /// Send one prompt and return the raw response text.
    async fn query(&self, prompt: &str) -> Result<String, QueryError>;
}

/// Fixed-delay retry on transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Query `model`, retrying transient failures.
    ///
    /// Terminal failures return immediately. When attempts run out the last
    /// transient error is returned.
    pub async fn query<M: AnswerModel + ?Sized>(&self, model: &M, prompt: &str) -> Result<String, QueryError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match model.query(prompt).await {
                Ok(text) => return Ok(text),
                Err(err @ QueryError::Terminal(_)) => {
                    tracing::error!(model = model.name(), error = %err, "non-retryable error");
                    return Err(err);
                }
                Err(err) if attempt >= attempts => {
                    tracing::error!(model = model.name(), attempts, error = %err, "retries exhausted");
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        model = model.name(),
                        attempt,
                        attempts,
                        delay_secs = self.delay.as_secs_f64(),
                        error = %err,
                        "transient error, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// An [`AnswerModel`] backed by a hosted chat-completion API.
pub struct ChatModel {
    name: String,
    client: chat::Client,
    temperature: Option<f32>,
}

impl ChatModel {
    pub fn new(name: impl Into<String>, client: chat::Client) -> Self {
        Self {
            name: name.into(),
            client,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl AnswerModel for ChatModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, prompt: &str) -> Result<String, QueryError> {
        let mut request = Request::new(vec![Message::user(prompt)]);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.client.complete(request).await?;
        tracing::debug!(
            model = %self.name,
            id = %response.model,
            finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "completion received"
        );
        if matches!(response.finish_reason.as_deref(), Some("length" | "MAX_TOKENS")) {
            tracing::warn!(model = %self.name, "reply was cut off by the token limit");
        }
        Ok(response.text)
    }
}
