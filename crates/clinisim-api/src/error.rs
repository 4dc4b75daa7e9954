use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clinisim_sessions::error::SessionError;
use serde::Serialize;

/// Unified API error type for all route handlers.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    Unprocessable(String),
    BadGateway(String),
    GatewayTimeout(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadGateway(msg) => {
                tracing::warn!("upstream error: {msg}");
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        let message = e.to_string();
        match e {
            SessionError::NotFound(_) => ApiError::NotFound(message),
            SessionError::Forbidden => ApiError::Forbidden(message),
            SessionError::InvalidState(_) | SessionError::Conflict(_) => ApiError::Conflict(message),
            SessionError::ContextExhausted { .. } => ApiError::Unprocessable(message),
            SessionError::UpstreamTimeout => ApiError::GatewayTimeout(message),
            SessionError::UpstreamUnavailable(_) | SessionError::UpstreamMalformed(_) => {
                ApiError::BadGateway(message)
            }
            SessionError::InvalidInput(_) => ApiError::BadRequest(message),
            SessionError::Storage(_) => ApiError::Internal(message),
        }
    }
}
