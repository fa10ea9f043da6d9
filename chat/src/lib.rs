//! Minimal chat-completion client.
//!
//! This crate provides a focused, non-streaming client for the two wire
//! dialects the benchmark talks to:
//! - OpenAI-style `/chat/completions` (OpenAI itself and Together)
//! - Gemini `models/{model}:generateContent`

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const TOGETHER_BASE: &str = "https://api.together.xyz/v1";
const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Errors that can occur when using the chat client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured (set {0})")]
    NoApiKey(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the service reported itself unavailable or overloaded.
    ///
    /// Matches HTTP 503 and 429, Gemini's `UNAVAILABLE` status string, and
    /// connection-level failures. Everything else is a hard failure.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Api { status, message } => {
                *status == 503 || *status == 429 || message.to_uppercase().contains("UNAVAILABLE")
            }
            _ => false,
        }
    }
}

/// Which hosted API a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Together,
    Gemini,
}

impl Provider {
    /// Environment variable holding the API key.
    pub fn key_var(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Together => "TOGETHER_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4-turbo",
            Provider::Together => "meta-llama/Meta-Llama-3-70B-Instruct-Turbo",
            Provider::Gemini => "gemini-1.5-flash",
        }
    }

    fn base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => OPENAI_BASE,
            Provider::Together => TOGETHER_BASE,
            Provider::Gemini => GEMINI_BASE,
        }
    }
}

/// Chat-completion client bound to one provider and default model.
#[derive(Clone)]
pub struct Client {
    client: reqwest::Client,
    provider: Provider,
    api_key: String,
    model: String,
    base_url: String,
}

impl Client {
    /// Create a new client for `provider` with the given API key.
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            base_url: provider.base_url().to_string(),
        })
    }

    /// Create a client reading the key from the provider's environment variable.
    pub fn from_env(provider: Provider) -> Result<Self, Error> {
        let var = provider.key_var();
        let api_key = std::env::var(var).map_err(|_| Error::NoApiKey(var))?;
        Self::new(provider, api_key)
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different endpoint (proxies, local test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a completion request and return the full response.
    pub async fn complete(&self, request: Request) -> Result<Response, Error> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());

        let builder = match self.provider {
            Provider::OpenAi | Provider::Together => self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .headers(self.build_headers()?)
                .json(&build_openai_request(&request, &model)),
            Provider::Gemini => self
                .client
                .post(format!("{}/models/{model}:generateContent", self.base_url))
                .headers(self.build_headers()?)
                .json(&build_gemini_request(&request)),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        match self.provider {
            Provider::OpenAi | Provider::Together => parse_openai_response(&body),
            Provider::Gemini => parse_gemini_response(&body, &model),
        }
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match self.provider {
            Provider::OpenAi | Provider::Together => {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                        .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
                );
            }
            Provider::Gemini => {
                headers.insert(
                    "x-goog-api-key",
                    HeaderValue::from_str(&self.api_key)
                        .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
                );
            }
        }
        Ok(headers)
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A completion request.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
}

impl Request {
    /// Create a new request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            messages,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A message in the conversation.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A completion response, normalized across dialects.
#[derive(Debug, Clone)]
pub struct Response {
    pub model: String,
    /// All text content concatenated.
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

// ============================================================================
// OpenAI-style dialect
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn build_openai_request(request: &Request, model: &str) -> OpenAiRequest {
    OpenAiRequest {
        model: model.to_string(),
        messages: request
            .messages
            .iter()
            .map(|m| OpenAiMessage {
                role: role_name(m.role),
                content: m.content.clone(),
            })
            .collect(),
        temperature: request.temperature,
    }
}

fn parse_openai_response(body: &str) -> Result<Response, Error> {
    let api: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;

    let choice = api
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Parse("response contained no choices".to_string()))?;

    let usage = api
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(Response {
        model: api.model,
        text: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage,
    })
}

// ============================================================================
// Gemini dialect
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

fn build_gemini_request(request: &Request) -> GeminiRequest {
    let contents = request
        .messages
        .iter()
        .map(|m| GeminiContent {
            role: Some(
                match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }
                .to_string(),
            ),
            parts: vec![GeminiPart {
                text: Some(m.content.clone()),
            }],
        })
        .collect();

    let generation_config = request
        .temperature
        .map(|temperature| GeminiGenerationConfig { temperature });

    GeminiRequest {
        contents,
        generation_config,
    }
}

fn parse_gemini_response(body: &str, model: &str) -> Result<Response, Error> {
    let api: GeminiResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;

    let candidate = api
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Parse("response contained no candidates".to_string()))?;

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let usage = api
        .usage_metadata
        .map(|u| Usage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    Ok(Response {
        model: api.model_version.unwrap_or_else(|| model.to_string()),
        text,
        finish_reason: candidate.finish_reason,
        usage,
    })
}
