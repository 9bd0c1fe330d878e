//! Shared application state.

use crate::config::WebConfig;
use jupiter_ai::Agent;
use jupiter_conversation::InMemorySessionManager;
use jupiter_core::ConversationSessionId;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// State shared by routes, middleware and server functions.
pub struct AppState {
    /// Agent answering questions; stateless between runs.
    pub agent: Agent,
    /// Chat sessions keyed by cookie.
    pub sessions: InMemorySessionManager,
    /// Web settings.
    pub web: WebConfig,
    notices: RwLock<HashMap<ConversationSessionId, String>>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(agent: Agent, sessions: InMemorySessionManager, web: WebConfig) -> Self {
        Self {
            agent,
            sessions,
            web,
            notices: RwLock::new(HashMap::new()),
        }
    }

    /// Leaves a one-shot message for the session's next page render.
    pub async fn set_notice(&self, session: ConversationSessionId, notice: impl Into<String>) {
        self.notices.write().await.insert(session, notice.into());
    }

    /// Takes the pending notice, if any.
    pub async fn take_notice(&self, session: ConversationSessionId) -> Option<String> {
        self.notices.write().await.remove(&session)
    }

    /// Drops pending notices of removed sessions.
    pub async fn forget(&self, session: ConversationSessionId) {
        self.notices.write().await.remove(&session);
    }
}
