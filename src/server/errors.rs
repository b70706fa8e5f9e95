use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;

use crate::GurujiError;

const ANSWER_FAILED: &str = "Something went wrong while answering your question.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("pipeline failed: {0}")]
    Pipeline(#[from] GurujiError),
    #[error("worker task failed: {0}")]
    Task(#[from] JoinError),
}

impl IntoResponse for ApiError {
    #[inline]
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::Pipeline(_) | Self::Task(_) => {
                error!("Request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, ANSWER_FAILED.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
