//! Domain error types for server operations.
//!
//! Each variant keeps the detail for logs; `into_server_error` yields the
//! user-safe text shown in the browser.

use leptos::server_fn::error::ServerFnError;
use std::fmt;

/// Errors while serving a chat request.
#[derive(Debug)]
pub enum ChatError {
    /// Request reached a server function without passing the session middleware.
    NoSession,
    /// The session cookie points at a session that no longer exists.
    SessionNotFound { session_id: String },
    /// Reading or writing the session failed.
    Storage { details: String },
    /// The question was blank.
    EmptyQuestion,
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSession => write!(f, "no chat session attached to request"),
            Self::SessionNotFound { session_id } => {
                write!(f, "chat session '{}' not found", session_id)
            }
            Self::Storage { details } => write!(f, "session storage error: {}", details),
            Self::EmptyQuestion => write!(f, "question is empty"),
        }
    }
}

impl std::error::Error for ChatError {}

impl ChatError {
    /// Convert to a user-safe ServerFnError.
    pub fn into_server_error(self) -> ServerFnError {
        match &self {
            ChatError::NoSession | ChatError::SessionNotFound { .. } => {
                ServerFnError::new("Your session expired. Reload the page to start a new one.")
            }
            ChatError::Storage { .. } => ServerFnError::new("Could not save your session"),
            ChatError::EmptyQuestion => ServerFnError::new("Please enter a question"),
        }
    }
}
