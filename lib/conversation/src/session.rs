//! Chat sessions.
//!
//! A session belongs to one browser visitor. It keeps the visible chat
//! history and the list of uploaded documents, and is handed to the agent
//! explicitly for each question.

use crate::document::DocumentInfo;
use crate::error::SessionError;
use crate::message::{Message, MessageRole};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jupiter_core::ConversationSessionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

const TITLE_MAX_CHARS: usize = 50;

/// A conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: ConversationSessionId,
    /// Chat history, oldest first.
    pub messages: Vec<Message>,
    /// Uploaded documents in upload order.
    pub documents: Vec<DocumentInfo>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last active.
    pub last_active_at: DateTime<Utc>,
    /// Session metadata.
    pub metadata: SessionMetadata,
}

/// Session metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Optional session title (generated from first message).
    pub title: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates a new, empty session.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationSessionId::new(),
            messages: Vec::new(),
            documents: Vec::new(),
            created_at: now,
            last_active_at: now,
            metadata: SessionMetadata::default(),
        }
    }

    fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    /// Adds a message to the session.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    /// Records an uploaded document.
    ///
    /// Returns false, leaving the list unchanged, when a document with the
    /// same name is already present.
    pub fn add_document(&mut self, document: DocumentInfo) -> bool {
        self.touch();
        if self.documents.iter().any(|d| d.name == document.name) {
            return false;
        }
        self.documents.push(document);
        true
    }

    /// Drops the chat history but keeps uploaded documents.
    pub fn clear_conversation(&mut self) {
        self.messages.clear();
        self.metadata.title = None;
        self.touch();
    }

    /// Drops the chat history and all uploaded documents.
    pub fn reset(&mut self) {
        self.clear_conversation();
        self.documents.clear();
    }

    /// User and assistant turns, without tool traffic.
    pub fn transcript(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_chat_turn())
    }

    /// Returns the last message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Generates a title from the first user message.
    pub fn generate_title(&mut self) {
        if self.metadata.title.is_some() {
            return;
        }

        let Some(first) = self.messages.iter().find(|m| m.role == MessageRole::User) else {
            return;
        };

        let title = if first.content.chars().count() > TITLE_MAX_CHARS {
            let head: String = first.content.chars().take(TITLE_MAX_CHARS - 3).collect();
            format!("{head}...")
        } else {
            first.content.clone()
        };
        self.metadata.title = Some(title);
    }
}

/// Trait for session storage.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Creates and stores a new session.
    async fn create_session(&self) -> Result<Session, SessionError>;

    /// Gets a session by ID.
    async fn get_session(&self, id: ConversationSessionId) -> Result<Session, SessionError>;

    /// Replaces a stored session.
    async fn update_session(&self, session: Session) -> Result<(), SessionError>;

    /// Applies `change` to the stored session while holding it exclusively.
    ///
    /// Concurrent requests on one session must go through this rather than
    /// a get/update pair, or the later write discards the earlier one.
    async fn update_with<F, R>(&self, id: ConversationSessionId, change: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut Session) -> R + Send,
        R: Send;

    /// Deletes a session.
    async fn delete_session(&self, id: ConversationSessionId) -> Result<(), SessionError>;

    /// Gets sessions idle since before `older_than` (for cleanup).
    async fn get_expired_sessions(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<ConversationSessionId>, SessionError>;
}

/// Process-local session store. Sessions are lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySessionManager {
    sessions: RwLock<HashMap<ConversationSessionId, Session>>,
}

impl InMemorySessionManager {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionManager for InMemorySessionManager {
    async fn create_session(&self) -> Result<Session, SessionError> {
        let session = Session::new();
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        debug!(session_id = %session.id, "created session");
        Ok(session)
    }

    async fn get_session(&self, id: ConversationSessionId) -> Result<Session, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound { id })
    }

    async fn update_session(&self, session: Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session.id) {
            Some(stored) => {
                *stored = session;
                Ok(())
            }
            None => Err(SessionError::NotFound { id: session.id }),
        }
    }

    async fn update_with<F, R>(&self, id: ConversationSessionId, change: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut Session) -> R + Send,
        R: Send,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound { id })?;
        Ok(change(session))
    }

    async fn delete_session(&self, id: ConversationSessionId) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(SessionError::NotFound { id })
    }

    async fn get_expired_sessions(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<ConversationSessionId>, SessionError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.last_active_at < older_than)
            .map(|s| s.id)
            .collect())
    }
}
