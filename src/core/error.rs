use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Request-path error taxonomy. Errors inside the deferred completion unit
/// never pass through here; they terminate by being written into execution
/// state instead.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad credentials or a missing/invalid/expired token. One generic
    /// message for every cause, so callers cannot tell which check failed.
    #[error("Could not validate credentials")]
    Unauthorized,

    /// Resource missing or not owned by the caller. The two causes share
    /// one response so authorization failures never reveal whether an id
    /// exists.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Domain-rule violation: duplicate unique field or duplicate
    /// attachment.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Internal(e) => {
                tracing::error!("Internal error while handling request: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
