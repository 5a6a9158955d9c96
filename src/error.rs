// HTTP API Error Types
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::database::{DatabaseError, SchemaError};
use crate::endpoints::DescriptorError;
use crate::filter::FilterError;
use crate::hooks::HookError;

/// HTTP API error. The message is only written to the response body in development mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 412 Precondition Failed (endpoint has no authorization rules)
    PreconditionFailed(String),

    // 422 Unprocessable Entity
    UnprocessableEntity(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::PreconditionFailed(_) => 412,
            ApiError::UnprocessableEntity(_) => 422,
            ApiError::InternalServerError(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::PreconditionFailed(msg)
            | ApiError::UnprocessableEntity(msg)
            | ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Get error code for logs and the CLI
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Status code with a plain-text body when `expose` is set, empty otherwise
    pub fn respond(&self, expose: bool) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if expose {
            (
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                self.message().to_string(),
            )
                .into_response()
        } else {
            status.into_response()
        }
    }

    /// Like `respond`, but a 404 reached through the `/api` prefix carries a JSON body
    /// `{"error": <code>, "message": <text or null>}`
    pub fn respond_routed(&self, via_api: bool, expose: bool) -> Response {
        if !(via_api && matches!(self, ApiError::NotFound(_))) {
            return self.respond(expose);
        }
        let message = if expose { Value::String(self.message().to_string()) } else { Value::Null };
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": self.error_code(), "message": message })),
        )
            .into_response()
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        ApiError::PreconditionFailed(message.into())
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        ApiError::UnprocessableEntity(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    /// Error for an arbitrary status code returned by an after hook or evaluator
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            412 => ApiError::PreconditionFailed(message),
            422 => ApiError::UnprocessableEntity(message),
            s if (400..500).contains(&s) => ApiError::BadRequest(message),
            _ => ApiError::InternalServerError(message),
        }
    }
}

// Convert other error types to ApiError
impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        // Data-layer failures surface as 400 with the driver's message
        tracing::error!("Database error: {}", err);
        ApiError::bad_request(err.to_string())
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::UnknownTable(_) => ApiError::not_found(err.to_string()),
            SchemaError::UnknownColumns(_) | SchemaError::InvalidOrderBy(_) => ApiError::bad_request(err.to_string()),
            SchemaError::Database(e) => e.into(),
        }
    }
}

impl From<DescriptorError> for ApiError {
    fn from(err: DescriptorError) -> Self {
        match err {
            DescriptorError::NotFound(_) => ApiError::not_found(err.to_string()),
            DescriptorError::Invalid { .. } | DescriptorError::Io { .. } => {
                tracing::error!("Endpoint settings error: {}", err);
                ApiError::internal_server_error(err.to_string())
            }
        }
    }
}

impl From<HookError> for ApiError {
    fn from(err: HookError) -> Self {
        match err {
            HookError::Rejected(_) => ApiError::bad_request(err.to_string()),
            HookError::Unknown(_) | HookError::PayloadMismatch { .. } | HookError::Failed(_) => {
                tracing::error!("Hook error: {}", err);
                ApiError::internal_server_error(err.to_string())
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Outside the engine there is no environment at hand, so nothing is exposed
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.respond(false)
    }
}
