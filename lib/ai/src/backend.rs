//! Model client abstraction.
//!
//! The agent only needs one thing from a language model: given the
//! conversation so far and the tools on offer, produce the next assistant
//! message. Providers implement [`ModelClient`]; tests script it.

use crate::error::LlmError;
use async_trait::async_trait;
use jupiter_conversation::{Message, ToolDefinition};

/// A remote (or scripted) language model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Produces the next assistant message for `messages`.
    ///
    /// The returned message has role assistant. Without tool calls its
    /// content, possibly empty, is the final answer. Sampling is as
    /// deterministic as the provider allows.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, LlmError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
