//! PDF upload route.
//!
//! Accepts a multipart form with a `file` field, records the document's
//! name and size on the visitor's session, and redirects back to the chat.
//! The outcome is left as a notice for the next page render.

use crate::error::ChatError;
use crate::server_helpers::change_session;
use crate::session::ActiveSession;
use crate::state::AppState;
use axum::{
    Extension,
    extract::{Multipart, State},
    response::Redirect,
};
use jupiter_conversation::DocumentInfo;
use std::sync::Arc;

const FILE_FIELD: &str = "file";
const PROCESSING_NOTICE: &str =
    "⚠️ PDF processing is not implemented yet, so answers cannot draw on document content.";

/// Handles `POST /documents`.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Extension(ActiveSession(session_id)): Extension<ActiveSession>,
    multipart: Multipart,
) -> Redirect {
    let notice = match accept_upload(&state, session_id, multipart).await {
        Ok(notice) => notice,
        Err(notice) => format!("❌ {notice}"),
    };
    state.set_notice(session_id, notice).await;
    Redirect::to("/")
}

async fn accept_upload(
    state: &AppState,
    session_id: jupiter_core::ConversationSessionId,
    mut multipart: Multipart,
) -> Result<String, String> {
    let (name, bytes) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, session_id = %session_id, "malformed upload");
                format!("Error processing PDF: {e}")
            })?
            .ok_or_else(|| "No file was uploaded".to_string())?;

        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, session_id = %session_id, "upload read failed");
            format!("Error processing PDF: {e}")
        })?;
        break (name, bytes);
    };

    let document = DocumentInfo::from_pdf_upload(&name, &bytes, state.web.max_upload_bytes)
        .map_err(|e| {
            tracing::info!(error = %e, session_id = %session_id, "rejected upload");
            format!("Error processing PDF: {e}")
        })?;

    let added = change_session(state, session_id, |session| session.add_document(document))
        .await
        .map_err(|e| match e {
            ChatError::SessionNotFound { .. } => {
                "Your session expired. Reload the page and try again.".to_string()
            }
            _ => "Could not save the upload".to_string(),
        })?;

    if added {
        tracing::info!(session_id = %session_id, document = %name, size_bytes = bytes.len(), "document uploaded");
        Ok(format!("✅ Uploaded: {name}. {PROCESSING_NOTICE}"))
    } else {
        Ok(format!("File already uploaded: {name}"))
    }
}
