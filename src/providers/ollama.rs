//! Ollama chat client.
//!
//! Talks to a locally hosted Ollama server over its non-streaming chat
//! endpoint. See: <https://github.com/ollama/ollama/blob/main/docs/api.md>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::ChatProvider;
use crate::types::{ChatResponse, GenerateOptions, Message, Usage};
use crate::{Result, StanceError};

/// Default base URL for a local Ollama server
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default client-side timeout for a single call
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the Ollama `/api/chat` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client for a local server at the default URL.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom base URL and per-call timeout
    /// (also used for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StanceError::Configuration(format!("failed to build HTTP client: {e}")))?;

        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a conversation and return the assistant's reply.
    pub async fn chat(&self, messages: &[Message], options: &GenerateOptions) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest {
            model: &options.model,
            messages,
            stream: false,
            options: ModelOptions {
                temperature: options.temperature,
                num_ctx: options.num_ctx,
                num_predict: options.max_tokens,
                seed: options.seed,
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let response = Self::check_status(response, &options.model).await?;

        let body: ChatReply = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let content = body.message.map(|m| m.content).unwrap_or_default();
        if content.trim().is_empty() {
            return Err(StanceError::EmptyResponse);
        }

        let usage = match (body.prompt_eval_count, body.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(Usage {
                prompt_tokens: prompt.unwrap_or(0),
                completion_tokens: completion.unwrap_or(0),
            }),
        };

        Ok(ChatResponse {
            content,
            model: body.model,
            usage,
        })
    }

    fn map_transport_error(&self, err: reqwest::Error) -> StanceError {
        if err.is_timeout() {
            StanceError::Timeout(self.timeout)
        } else {
            StanceError::Http(err.to_string())
        }
    }

    /// Check response status and map to appropriate error.
    async fn check_status(response: reqwest::Response, model: &str) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        // Ollama reports failures as {"error": "..."}
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorReply>(&body)
            .map(|e| e.error)
            .unwrap_or(body);

        match status.as_u16() {
            404 => Err(StanceError::ModelNotFound(model.to_string())),
            429 => Err(StanceError::RateLimited { retry_after }),
            code => Err(StanceError::Api {
                status: code,
                message: format!("Ollama API error: {message}"),
            }),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: ModelOptions,
}

#[derive(Serialize)]
struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<ReplyMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: String,
}

#[async_trait]
impl ChatProvider for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, messages: &[Message], options: &GenerateOptions) -> Result<ChatResponse> {
        OllamaClient::chat(self, messages, options).await
    }
}
