//! OpenAI-compatible chat completions client.
//!
//! Speaks `POST {base_url}/v1/chat/completions` with function tools.
//! Transient failures are retried by [`RetryPolicy`]; everything else is
//! mapped onto [`LlmError`] and left for the agent to surface.

use crate::backend::ModelClient;
use crate::error::LlmError;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use jupiter_conversation::{Message, MessageRole, ToolCall, ToolDefinition};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, instrument};

const PROVIDER: &str = "openai";

/// Connection and retry settings for [`OpenAiClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub name: String,
    /// API root, without the `/v1` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Attempts per completion, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on any retry delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    4_000
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl OpenAiConfig {
    /// Retry policy described by this config.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// [`ModelClient`] backed by an OpenAI-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    retry: RetryPolicy,
}

impl OpenAiClient {
    /// Builds a client. Fails if the key is blank or the HTTP client cannot
    /// be constructed.
    pub fn new(api_key: impl Into<String>, config: &OpenAiConfig) -> Result<Self, Report<LlmError>> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "API key is empty".to_string(),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_key,
            endpoint: format!(
                "{}/v1/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.name.clone(),
            retry: config.retry_policy(),
        })
    }

    async fn send_once(&self, body: &ChatRequest<'_>) -> Result<Message, LlmError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = retry_after(response.headers());
            let detail = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after_secs, &detail));
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::RequestFailed {
                    reason: e.to_string(),
                }
            }
        })?;
        parse_completion(&text)
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, LlmError> {
        let body = ChatRequest::new(&self.model, messages, tools)?;
        let reply = self.retry.run(|| self.send_once(&body)).await?;
        debug!(tool_calls = reply.tool_calls.len(), "model replied");
        Ok(reply)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()
}

fn status_error(status: StatusCode, retry_after_secs: Option<u64>, detail: &str) -> LlmError {
    let reason = provider_message(detail).unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderUnavailable {
            provider: PROVIDER.to_string(),
            reason,
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { retry_after_secs },
        s if s.is_server_error() => LlmError::RequestFailed { reason },
        s => LlmError::Rejected {
            status: s.as_u16(),
            reason,
        },
    }
}

/// Pulls `error.message` out of a provider error body.
fn provider_message(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}

fn parse_completion(body: &str) -> Result<Message, LlmError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::ResponseParseFailed {
            reason: e.to_string(),
        })?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::ResponseParseFailed {
            reason: "response contained no choices".to_string(),
        })?;

    let mut message = Message::assistant(choice.message.content.unwrap_or_default());
    for call in choice.message.tool_calls {
        let arguments = if call.function.arguments.trim().is_empty() {
            JsonValue::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|e| {
                LlmError::ResponseParseFailed {
                    reason: format!(
                        "arguments for tool call {} are not valid JSON: {e}",
                        call.id
                    ),
                }
            })?
        };
        message = message.with_tool_call(ToolCall::new(call.id, call.function.name, arguments));
    }
    Ok(message)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

impl<'a> ChatRequest<'a> {
    fn new(
        model: &'a str,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Self, LlmError> {
        let messages = messages
            .iter()
            .map(WireMessage::from_message)
            .collect::<Result<Vec<_>, _>>()?;
        let tools: Vec<JsonValue> = tools
            .iter()
            .map(|t| serde_json::json!({ "type": "function", "function": t.to_llm_format() }))
            .collect();
        let tool_choice = (!tools.is_empty()).then_some("auto");

        Ok(Self {
            model,
            messages,
            temperature: 0.0,
            tools,
            tool_choice,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn from_message(message: &Message) -> Result<Self, LlmError> {
        let tool_calls = message
            .tool_calls
            .iter()
            .map(|call| {
                let arguments = serde_json::to_string(&call.arguments).map_err(|e| {
                    LlmError::InvalidConfig {
                        reason: format!("cannot encode arguments of {}: {e}", call.id),
                    }
                })?;
                Ok(WireToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunction {
                        name: call.name.clone(),
                        arguments,
                    },
                })
            })
            .collect::<Result<Vec<_>, LlmError>>()?;

        // Tool-only assistant turns carry a null content.
        let content = if message.role == MessageRole::Assistant
            && message.content.is_empty()
            && !tool_calls.is_empty()
        {
            None
        } else {
            Some(message.content.clone())
        };

        Ok(Self {
            role: Some(message.role.as_str().to_string()),
            content,
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}
