//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::llm::redact::{redact_secrets, redact_with_key};

/// Longest error body kept from a rejected request.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for `POST /chat/completions`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Request shape for debug logs: model, roles and lengths, no content.
    pub fn describe(&self) -> String {
        let messages: Vec<String> = self
            .messages
            .iter()
            .map(|m| format!("{}({} chars)", m.role, m.content.chars().count()))
            .collect();
        format!("model={} messages=[{}]", self.model, messages.join(", "))
    }
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Trait for sending a chat request to a model.
///
/// This abstraction allows mocking the HTTP provider in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the request and return the raw text of the first choice.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError>;
}

/// Client for any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAiClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("git-commitai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        let detail = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            format!("could not connect to {}", self.api_url)
        } else {
            err.to_string()
        };
        ProviderError::Unreachable(redact_with_key(&detail, &self.api_key))
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        debug!(
            "{}",
            redact_secrets(&format!("POST {} {}", self.api_url, request.describe()))
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!("Provider answered HTTP {} with {} bytes", status.as_u16(), body.len());

        if !status.is_success() {
            return Err(status_error(status, &redact_with_key(&body, &self.api_key)));
        }

        parse_completion(&body)
    }
}

fn status_error(status: StatusCode, body: &str) -> ProviderError {
    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth { status: code },
        s if s.is_server_error() => ProviderError::Server { status: code },
        _ => ProviderError::Rejected {
            status: code,
            body: body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
        },
    }
}

/// Extract the first choice's message content.
pub fn parse_completion(body: &str) -> Result<String, ProviderError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::BadResponse(format!("invalid JSON: {e}")))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::BadResponse("response has no choices".to_string()))?;

    let content = choice.message.content.unwrap_or_default();
    let content = strip_code_fence(&content);
    if content.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(content.trim().to_string())
}

/// Unwrap a response that is entirely one markdown code fence.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    // Skip the info string (e.g. ```text) on the opening line.
    match inner.split_once('\n') {
        Some((info, body)) if !info.contains("```") => body,
        _ => text,
    }
}
