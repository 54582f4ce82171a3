//! Route handler functions for all endpoints.
//!
//! Handlers resolve the caller's session from the signed cookie, delegate
//! to the conversational agent, and attach a `Set-Cookie` whenever a new
//! identifier was issued.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use campus_agent::ConversationalAgent;
use campus_core::types::{SessionId, Turn};

use crate::error::ApiError;
use crate::session::{ResetOutcome, SessionHandle};
use crate::state::AppState;
use crate::templates::{self, PageContext, SCRIPT_JS};

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
    pub session_id: SessionId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub status: String,
    pub session_id: SessionId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<Turn>,
    pub session_id: SessionId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub knowledge_chunks: u64,
}

// =============================================================================
// Helpers
// =============================================================================

/// The message of an `/ask` payload, exactly as sent.
///
/// `None` for unparsable JSON, a missing or non-string `message`, and
/// text that is empty after trimming.
pub fn extract_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let message = value.get("message")?.as_str()?;
    if message.trim().is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

/// Best-effort removal of the previous session's transcript.
pub async fn clear_remote_history(
    agent: &dyn ConversationalAgent,
    previous: Option<SessionId>,
) -> ResetOutcome {
    let Some(previous) = previous else {
        return ResetOutcome::Complete;
    };
    match agent.clear_history(&previous).await {
        Ok(()) => ResetOutcome::Complete,
        Err(e) => ResetOutcome::RemoteCleanupFailed {
            reason: e.to_string(),
        },
    }
}

fn with_session(
    state: &AppState,
    session: SessionHandle,
    body: impl IntoResponse,
) -> Result<Response, ApiError> {
    let mut response = body.into_response();
    if session.issued {
        state
            .sessions
            .set_cookie(response.headers_mut(), &session.id)?;
    }
    Ok(response)
}

// =============================================================================
// Handlers
// =============================================================================

/// GET / - chat page with the session transcript.
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let session = state.sessions.ensure_session(&headers);

    let turns = if session.issued {
        Vec::new()
    } else {
        state.agent.history(&session.id).await.unwrap_or_else(|e| {
            warn!(session_id = %session.id, error = %e, "Failed to load transcript for page");
            Vec::new()
        })
    };

    let html = templates::render_index(
        &state.templates,
        &PageContext {
            name: &state.config.agent.name,
            university: &state.config.agent.university,
            turns: &turns,
        },
    )?;
    with_session(&state, session, Html(html))
}

/// POST /ask - answer one message.
pub async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|rejection| {
        warn!(status = %rejection.status(), "Rejected /ask body");
        ApiError::from(rejection)
    })?;
    let message = extract_message(&body).ok_or_else(ApiError::no_message)?;
    let session = state.sessions.ensure_session(&headers);

    let reply = state
        .agent
        .run(&message, &session.id)
        .await
        .map_err(|e| {
            error!(session_id = %session.id, error = %e, "Agent failed to answer");
            ApiError::ServiceUnavailable
        })?;

    info!(
        session_id = %session.id,
        message_len = message.len(),
        reply_len = reply.len(),
        "Message answered"
    );
    with_session(
        &state,
        session,
        Json(AskResponse {
            response: reply,
            session_id: session.id,
        }),
    )
}

/// POST /reset - start a new session and forget the old transcript.
pub async fn reset(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let previous = state.sessions.current(&headers);
    let session_id = state.sessions.reset_session();

    match clear_remote_history(state.agent.as_ref(), previous).await {
        ResetOutcome::Complete => {}
        ResetOutcome::RemoteCleanupFailed { reason } => {
            warn!(
                previous_session = ?previous.map(|id| id.to_string()),
                reason = %reason,
                "Could not clear previous session history"
            );
        }
    }

    info!(session_id = %session_id, "Session reset");
    with_session(
        &state,
        SessionHandle {
            id: session_id,
            issued: true,
        },
        Json(ResetResponse {
            status: "success".to_string(),
            session_id,
        }),
    )
}

/// GET /history - the session transcript in submission order.
pub async fn history(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let session = state.sessions.ensure_session(&headers);

    let history = if session.issued {
        Vec::new()
    } else {
        state.agent.history(&session.id).await.map_err(|e| {
            error!(session_id = %session.id, error = %e, "Failed to load history");
            ApiError::ServiceUnavailable
        })?
    };

    with_session(
        &state,
        session,
        Json(HistoryResponse {
            history,
            session_id: session.id,
        }),
    )
}

/// GET /health - liveness and knowledge base size.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let knowledge_chunks = state.knowledge.count().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to count knowledge chunks");
        0
    });

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        knowledge_chunks,
    })
}

/// GET /static/js/script.js
pub async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        SCRIPT_JS,
    )
}
