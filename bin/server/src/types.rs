//! Types shared between server functions and the browser.

use serde::{Deserialize, Serialize};

/// One rendered chat turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
}

/// An uploaded document as listed in the sidebar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub name: String,
    /// Human readable size, e.g. `12,345 bytes`.
    pub size: String,
}

/// Everything the chat page renders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatView {
    pub title: Option<String>,
    pub turns: Vec<ChatTurn>,
    pub documents: Vec<DocumentSummary>,
    /// One-shot message from the last upload.
    pub notice: Option<String>,
}
