//! Helpers for server functions: session lookup, serialized session
//! changes and view conversion, with logging and user-safe errors.
//!
//! Requests for one session can overlap (an upload while a question is
//! being answered). Every change goes through [`change_session`], which
//! applies it to the stored session in place, so overlapping requests never
//! overwrite each other's work.

use crate::error::ChatError;
use crate::session::ActiveSession;
use crate::state::AppState;
use crate::types::{ChatTurn, ChatView, DocumentSummary};
use axum::Extension;
use jupiter_ai::TurnOutcome;
use jupiter_conversation::{Session, SessionError, SessionManager};
use jupiter_core::ConversationSessionId;
use std::sync::Arc;

/// Gets the shared application state from the request extensions.
pub async fn get_app_state() -> Result<Arc<AppState>, ChatError> {
    let Extension(state) = leptos_axum::extract::<Extension<Arc<AppState>>>()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "application state missing from request");
            ChatError::Storage {
                details: e.to_string(),
            }
        })?;
    Ok(state)
}

/// Gets the state and the id of the session attached to the current request.
pub async fn active_session() -> Result<(Arc<AppState>, ConversationSessionId), ChatError> {
    let state = get_app_state().await?;
    let Extension(ActiveSession(id)) = leptos_axum::extract::<Extension<ActiveSession>>()
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "request has no active session");
            ChatError::NoSession
        })?;
    Ok((state, id))
}

/// Loads a snapshot of the session attached to the current request.
pub async fn current_session() -> Result<(Arc<AppState>, Session), ChatError> {
    let (state, id) = active_session().await?;
    let session = state
        .sessions
        .get_session(id)
        .await
        .map_err(|e| session_error(&e))?;
    Ok((state, session))
}

/// Applies `change` to the stored session.
pub async fn change_session<F, R>(
    state: &AppState,
    id: ConversationSessionId,
    change: F,
) -> Result<R, ChatError>
where
    F: FnOnce(&mut Session) -> R + Send,
    R: Send,
{
    state.sessions.update_with(id, change).await.map_err(|e| {
        tracing::warn!(error = %e, session_id = %id, "failed to change session");
        session_error(&e)
    })
}

/// Answers `question` for session `id` and records both turns.
///
/// The model runs against a snapshot of the history. Only the two new turns
/// are written back, so changes made to the session meanwhile survive.
pub async fn answer_question(
    state: &AppState,
    id: ConversationSessionId,
    question: &str,
) -> Result<TurnOutcome, ChatError> {
    let snapshot = state
        .sessions
        .get_session(id)
        .await
        .map_err(|e| session_error(&e))?;
    let history = state.agent.history_for(&snapshot);

    let outcome = state.agent.reply(history, question).await;
    change_session(state, id, |session| outcome.record(session, question)).await?;
    Ok(outcome)
}

fn session_error(err: &SessionError) -> ChatError {
    match err {
        SessionError::NotFound { id } => ChatError::SessionNotFound {
            session_id: id.to_string(),
        },
        SessionError::StorageFailed { reason } => ChatError::Storage {
            details: reason.clone(),
        },
    }
}

/// Builds what the chat page renders from a session.
#[must_use]
pub fn chat_view(session: &Session, notice: Option<String>) -> ChatView {
    ChatView {
        title: session.metadata.title.clone(),
        turns: session
            .transcript()
            .map(|m| ChatTurn {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect(),
        documents: session
            .documents
            .iter()
            .map(|d| DocumentSummary {
                name: d.name.clone(),
                size: d.display_size(),
            })
            .collect(),
        notice,
    }
}
