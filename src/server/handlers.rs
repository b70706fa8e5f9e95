use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Html;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use super::AppState;
use super::errors::ApiError;

/// Session used when a request names none
pub const DEFAULT_SESSION: &str = "default";
pub const SESSION_HEADER: &str = "x-session-id";

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AskRequest {
    pub question: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    /// Answer rendered as HTML
    pub answer: String,
}

#[inline]
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[inline]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Answer a question; the blocking pipeline runs off the async runtime
#[inline]
pub async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let session_id = session_id(payload.session_id, &headers);
    debug!("Question for session {}: {:?}", session_id, payload.question);

    let tutor = Arc::clone(&state.tutor);
    let question = payload.question;
    let answer =
        tokio::task::spawn_blocking(move || tutor.ask(&session_id, &question)).await??;

    Ok(Json(AskResponse {
        answer: answer.html,
    }))
}

#[inline]
pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.tutor.forget(&session_id) {
        Ok(Json(json!({ "cleared": session_id })))
    } else {
        Err(ApiError::NotFound(format!("Unknown session: {}", session_id)))
    }
}

/// Body field first, then the session header, then the shared default
fn session_id(from_body: Option<String>, headers: &HeaderMap) -> String {
    from_body
        .filter(|id| !id.trim().is_empty())
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| DEFAULT_SESSION.to_string())
}
