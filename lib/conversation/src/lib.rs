//! Conversation building blocks for Jupiter.
//!
//! This crate provides:
//!
//! - **Messages**: conversation turns, tool calls and the append-only
//!   [`ConversationState`] owned by one agent run
//! - **Tool Registry**: named tools the model may call, with dispatch that
//!   reports failures back as tool results instead of aborting
//! - **Retrieval Tool**: the `retrieve_pdf_chunks` tool exposed to the model
//! - **Sessions**: per-visitor chat history and uploaded document metadata

pub mod document;
pub mod error;
pub mod message;
pub mod retrieval;
pub mod session;
pub mod tool;

pub use document::DocumentInfo;
pub use error::{DocumentError, SessionError, ToolError};
pub use message::{ConversationState, Message, MessageRole, ToolCall};
pub use retrieval::{RETRIEVAL_TOOL_NAME, RetrievalTool};
pub use session::{InMemorySessionManager, Session, SessionManager};
pub use tool::{Tool, ToolDefinition, ToolRegistry, ToolResult};
