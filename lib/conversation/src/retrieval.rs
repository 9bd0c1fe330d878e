//! The document retrieval tool exposed to the model.
//!
//! Ingestion does not exist yet, so the tool answers every well-formed
//! request with a fixed notice. The model reads that notice like any other
//! tool output and tells the user it cannot look anything up.

use crate::error::ToolError;
use crate::tool::{Tool, ToolDefinition};
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tracing::debug;

/// Name the model uses to call the tool.
pub const RETRIEVAL_TOOL_NAME: &str = "retrieve_pdf_chunks";

/// Text returned while retrieval is not implemented.
pub const RETRIEVAL_UNAVAILABLE: &str =
    "No PDF retrieval implemented yet. TODO: Implement document storage and retrieval logic.";

/// Number of chunks requested when the model omits `top_k`.
pub const DEFAULT_TOP_K: u64 = 5;

/// Retrieves relevant chunks from uploaded PDF documents.
#[derive(Debug, Clone)]
pub struct RetrievalTool {
    default_top_k: u64,
}

impl Default for RetrievalTool {
    fn default() -> Self {
        Self::new()
    }
}

impl RetrievalTool {
    /// Creates the tool with `top_k` defaulting to five.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
        }
    }

    /// Overrides the `top_k` used when the model omits it. Zero is raised to one.
    #[must_use]
    pub fn with_default_top_k(mut self, top_k: u64) -> Self {
        self.default_top_k = top_k.max(1);
        self
    }

    /// The `top_k` applied when the model omits it.
    #[must_use]
    pub fn default_top_k(&self) -> u64 {
        self.default_top_k
    }

    /// Searches ingested chunks for `query`, returning at most `top_k`
    /// cited chunks. Never returns an empty string.
    #[must_use]
    pub fn retrieve(&self, query: &str, top_k: u64) -> String {
        debug!(query_len = query.len(), top_k, "retrieval requested");
        RETRIEVAL_UNAVAILABLE.to_string()
    }

    fn invalid(reason: impl Into<String>) -> ToolError {
        ToolError::InvalidInput {
            name: RETRIEVAL_TOOL_NAME.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Tool for RetrievalTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            RETRIEVAL_TOOL_NAME,
            "Retrieve relevant chunks from uploaded PDF documents. Returns the top-k \
             most relevant chunks, each with its source document and page number.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query or question"
                },
                "top_k": {
                    "type": "integer",
                    "minimum": 1,
                    "default": self.default_top_k,
                    "description": "Number of top results to return"
                }
            },
            "required": ["query"]
        }))
    }

    async fn invoke(&self, arguments: JsonValue) -> Result<String, ToolError> {
        let query = arguments
            .get("query")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Self::invalid("`query` must be a string"))?;

        let top_k = match arguments.get("top_k") {
            None | Some(JsonValue::Null) => self.default_top_k,
            Some(value) => value
                .as_u64()
                .filter(|k| *k >= 1)
                .ok_or_else(|| Self::invalid("`top_k` must be an integer of at least 1"))?,
        };

        Ok(self.retrieve(query, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_call_reports_unavailable() {
        let tool = RetrievalTool::new();
        for query in ["", "what does chapter 2 say?", "ünïcödé"] {
            let text = tool.retrieve(query, tool.default_top_k());
            assert!(!text.is_empty());
            assert!(text.contains("No PDF retrieval implemented yet"));
        }
    }

    #[test]
    fn definition_describes_arguments() {
        let definition = RetrievalTool::new().with_default_top_k(3).definition();
        assert_eq!(definition.name, "retrieve_pdf_chunks");
        assert_eq!(definition.input_schema["required"][0], "query");
        assert_eq!(definition.input_schema["properties"]["top_k"]["default"], 3);
    }

    #[test]
    fn zero_default_top_k_is_raised() {
        assert_eq!(RetrievalTool::new().with_default_top_k(0).default_top_k(), 1);
    }

    #[tokio::test]
    async fn invoke_with_default_top_k() {
        let text = RetrievalTool::new()
            .invoke(json!({"query": "revenue in 2023"}))
            .await
            .expect("stub never fails on valid input");
        assert_eq!(text, RETRIEVAL_UNAVAILABLE);
    }

    #[tokio::test]
    async fn invoke_rejects_missing_query() {
        let err = RetrievalTool::new()
            .invoke(json!({"top_k": 2}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn invoke_rejects_zero_top_k() {
        let err = RetrievalTool::new()
            .invoke(json!({"query": "q", "top_k": 0}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }
}
