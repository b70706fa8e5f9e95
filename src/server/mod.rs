// HTTP server module
// Chat page, question answering and session management routes


pub mod errors;
pub mod handlers;

pub use errors::ApiError;
pub use handlers::{AskRequest, AskResponse, DEFAULT_SESSION, SESSION_HEADER};

use axum::Router;
use axum::routing::{delete, get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::tutor::Tutor;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub tutor: Arc<Tutor>,
}

impl AppState {
    #[inline]
    pub fn new(tutor: Tutor) -> Self {
        Self {
            tutor: Arc::new(tutor),
        }
    }
}

/// Build the application router with request tracing
#[inline]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/ask", post(handlers::ask))
        .route("/health", get(handlers::health))
        .route("/sessions/{session_id}", delete(handlers::clear_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
