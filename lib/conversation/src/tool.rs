//! Tool registry and dispatch.
//!
//! Tools are registered once at startup and shared read-only afterwards.
//! Dispatch never lets a single tool abort an agent run: unknown names,
//! failures, panics and timeouts all come back as a tool result whose text
//! describes what went wrong, so the model can read it and adapt.

use crate::error::ToolError;
use crate::message::{Message, ToolCall};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Definition of a tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Description the model uses to decide when to call the tool.
    pub description: String,
    /// JSON schema for input parameters.
    pub input_schema: JsonValue,
}

impl ToolDefinition {
    /// Creates a new tool definition with an empty object schema.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: JsonValue) -> Self {
        self.input_schema = schema;
        self
    }

    /// Converts the definition to the function format expected by LLM APIs.
    #[must_use]
    pub fn to_llm_format(&self) -> JsonValue {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.input_schema
        })
    }
}

/// Outcome of dispatching one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// The call this result answers.
    pub tool_call_id: String,
    /// Text handed back to the model.
    pub content: String,
    /// Set when the call failed; `content` then describes the failure.
    pub error: Option<ToolError>,
    /// Wall-clock time spent in dispatch.
    pub elapsed_ms: u64,
}

impl ToolResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            error: None,
            elapsed_ms: 0,
        }
    }

    /// Creates a failed result whose content reports the error.
    #[must_use]
    pub fn failure(tool_call_id: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: format!("Error: {error}"),
            error: Some(error),
            elapsed_ms: 0,
        }
    }

    /// Returns true if the tool call succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Converts the result into the tool message appended to the conversation.
    #[must_use]
    pub fn into_message(self) -> Message {
        Message::tool_result(self.tool_call_id, self.content)
    }
}

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Runs the tool with the model-supplied arguments, returning text.
    async fn invoke(&self, arguments: JsonValue) -> Result<String, ToolError>;
}

/// Registry of available tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    definitions: Vec<ToolDefinition>,
    call_timeout: Option<Duration>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names().collect::<Vec<_>>())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds every tool invocation to `timeout`.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Registers a tool under the name from its definition.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> jupiter_core::Result<(), ToolError> {
        let definition = tool.definition();
        if self.tools.contains_key(&definition.name) {
            return Err(ToolError::Duplicate {
                name: definition.name,
            }
            .into());
        }
        debug!(tool = %definition.name, "registered tool");
        self.tools.insert(definition.name.clone(), tool);
        self.definitions.push(definition);
        Ok(())
    }

    /// Gets a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Tool names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name.as_str())
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Converts definitions to the format expected by LLM APIs.
    #[must_use]
    pub fn to_llm_format(&self) -> Vec<JsonValue> {
        self.definitions.iter().map(ToolDefinition::to_llm_format).collect()
    }

    /// Runs the tool named by `call` and returns its text.
    ///
    /// Fails with [`ToolError::NotFound`] for unregistered names and with the
    /// tool's own error otherwise.
    pub async fn dispatch(&self, call: &ToolCall) -> jupiter_core::Result<String, ToolError> {
        Ok(self.invoke(call).await?)
    }

    /// Runs the tool named by `call`, folding any failure into the result.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let started = Instant::now();
        let mut result = match self.invoke(call).await {
            Ok(content) => ToolResult::success(&call.id, content),
            Err(ToolError::NotFound { name }) => {
                warn!(tool = %name, call_id = %call.id, "model requested unknown tool");
                let available = self.names().collect::<Vec<_>>().join(", ");
                let mut result = ToolResult::failure(&call.id, ToolError::NotFound { name });
                result.content = format!("{}. Available tools: {available}", result.content);
                result
            }
            Err(error) => {
                warn!(tool = %call.name, call_id = %call.id, %error, "tool call failed");
                ToolResult::failure(&call.id, error)
            }
        };
        result.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        result
    }

    /// Runs every call concurrently and returns results in call order.
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.execute(call))).await
    }

    async fn invoke(&self, call: &ToolCall) -> Result<String, ToolError> {
        let tool = self.tools.get(&call.name).ok_or_else(|| ToolError::NotFound {
            name: call.name.clone(),
        })?;

        debug!(tool = %call.name, call_id = %call.id, "invoking tool");
        let run = AssertUnwindSafe(tool.invoke(call.arguments.clone())).catch_unwind();
        let outcome = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| ToolError::Timeout {
                    name: call.name.clone(),
                    seconds: limit.as_secs(),
                })?,
            None => run.await,
        };

        outcome.unwrap_or_else(|panic| {
            Err(ToolError::ExecutionFailed {
                name: call.name.clone(),
                reason: panic_message(panic.as_ref()),
            })
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
