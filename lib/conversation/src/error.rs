//! Error types for the conversation crate.
//!
//! - `ToolError`: registration and dispatch of tools
//! - `SessionError`: session storage
//! - `DocumentError`: rejected uploads

use jupiter_core::ConversationSessionId;
use std::fmt;

/// Errors from tool registration and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// A tool with this name is already registered.
    Duplicate { name: String },
    /// The model asked for a tool that is not registered.
    NotFound { name: String },
    /// The tool body failed.
    ExecutionFailed { name: String, reason: String },
    /// The arguments did not match the tool's input schema.
    InvalidInput { name: String, reason: String },
    /// The tool did not finish within the dispatch timeout.
    Timeout { name: String, seconds: u64 },
}

impl ToolError {
    /// Name of the tool the error is about.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        match self {
            Self::Duplicate { name }
            | Self::NotFound { name }
            | Self::ExecutionFailed { name, .. }
            | Self::InvalidInput { name, .. }
            | Self::Timeout { name, .. } => name,
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate { name } => write!(f, "tool '{name}' is already registered"),
            Self::NotFound { name } => write!(f, "tool '{name}' is not available"),
            Self::ExecutionFailed { name, reason } => {
                write!(f, "tool '{name}' failed: {reason}")
            }
            Self::InvalidInput { name, reason } => {
                write!(f, "invalid input for tool '{name}': {reason}")
            }
            Self::Timeout { name, seconds } => {
                write!(f, "tool '{name}' timed out after {seconds}s")
            }
        }
    }
}

impl std::error::Error for ToolError {}

/// Errors from session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session not found.
    NotFound { id: ConversationSessionId },
    /// Storage operation failed.
    StorageFailed { reason: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "session not found: {id}"),
            Self::StorageFailed { reason } => write!(f, "session storage failed: {reason}"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Reasons an uploaded file is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// File name or content does not look like a PDF.
    NotPdf { name: String },
    /// Upload carried no bytes.
    Empty { name: String },
    /// Upload exceeds the configured limit.
    TooLarge {
        name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPdf { name } => write!(f, "{name} is not a PDF document"),
            Self::Empty { name } => write!(f, "{name} is empty"),
            Self::TooLarge {
                name,
                size_bytes,
                limit_bytes,
            } => write!(
                f,
                "{name} is {size_bytes} bytes, larger than the {limit_bytes} byte limit"
            ),
        }
    }
}

impl std::error::Error for DocumentError {}
