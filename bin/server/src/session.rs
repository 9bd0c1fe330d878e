//! Cookie-backed chat sessions.
//!
//! Every request passes through [`ensure_session`]. Visitors without a
//! valid session cookie get a fresh in-memory session and the cookie that
//! points at it. Handlers and server functions read the session id from
//! the [`ActiveSession`] request extension.

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use jupiter_conversation::SessionManager;
use jupiter_core::ConversationSessionId;
use std::sync::Arc;
use time::Duration as TimeDuration;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "jupiter_session";

/// The session the current request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession(pub ConversationSessionId);

/// Parses the session id out of the cookie jar, ignoring garbage.
#[must_use]
pub fn session_from_jar(jar: &CookieJar) -> Option<ConversationSessionId> {
    jar.get(SESSION_COOKIE)?.value().parse().ok()
}

/// Middleware that guarantees an [`ActiveSession`] on every request.
pub async fn ensure_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let known = match session_from_jar(&jar) {
        Some(id) => state.sessions.get_session(id).await.ok().map(|s| s.id),
        None => None,
    };

    let (id, new_cookie) = match known {
        Some(id) => (id, None),
        None => match state.sessions.create_session().await {
            Ok(session) => {
                tracing::info!(session_id = %session.id, "started chat session");
                let cookie = Cookie::build((SESSION_COOKIE, session.id.to_string()))
                    .path("/")
                    .http_only(true)
                    .secure(state.web.secure_cookies)
                    .same_site(SameSite::Lax)
                    .max_age(TimeDuration::minutes(state.web.session_idle_minutes));
                (session.id, Some(cookie))
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to create chat session");
                return (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                )
                    .into_response();
            }
        },
    };

    request.extensions_mut().insert(ActiveSession(id));
    let response = next.run(request).await;

    match new_cookie {
        Some(cookie) => (jar.add(cookie), response).into_response(),
        None => response,
    }
}
