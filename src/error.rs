use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Error as SqlxError;
use std::collections::HashMap;
use thiserror::Error as ThisError;
use tracing::warn;

#[derive(Debug, ThisError)]
pub enum NexusError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("invalid or missing service key")]
    Unauthorized,

    #[error("missing or malformed x-organization-id header")]
    MissingOrganization,

    #[error("AI assistant is disabled")]
    AiDisabled,

    #[error("AI provider returned an empty completion")]
    EmptyCompletion,

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("AI provider error: {0:?}")]
    AiProvider(AiProviderError),
}

impl NexusError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        NexusError::NotFound { entity, id }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        NexusError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        NexusError::Conflict(msg.into())
    }
}

impl From<JsonRejection> for NexusError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return NexusError::PayloadTooLarge;
        }
        NexusError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for NexusError {
    fn from(rejection: PathRejection) -> Self {
        NexusError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for NexusError {
    fn from(rejection: QueryRejection) -> Self {
        NexusError::Validation(rejection.body_text())
    }
}

/// Decides whether an outbound AI call is worth repeating.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for NexusError {
    fn is_retryable(&self) -> bool {
        match self {
            NexusError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            NexusError::UpstreamStatus(code) => {
                *code == StatusCode::TOO_MANY_REQUESTS || code.is_server_error()
            }
            NexusError::AiProvider(err) => err
                .status
                .is_some_and(|code| code == 429 || (500..600).contains(&code)),
            _ => false,
        }
    }
}

impl IntoResponse for NexusError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            NexusError::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                ApiErrorBody::new("NOT_FOUND", format!("{entity} {id} not found")),
            ),
            NexusError::DatabaseError(SqlxError::RowNotFound) => (
                StatusCode::NOT_FOUND,
                ApiErrorBody::new("NOT_FOUND", "Resource not found."),
            ),
            NexusError::DatabaseError(SqlxError::Database(db_err))
                if db_err.is_unique_violation() || db_err.is_foreign_key_violation() =>
            {
                (
                    StatusCode::CONFLICT,
                    ApiErrorBody::new(
                        "CONFLICT",
                        "The request conflicts with existing records.",
                    ),
                )
            }
            NexusError::DatabaseError(SqlxError::Database(db_err))
                if db_err.is_check_violation() =>
            {
                (
                    StatusCode::BAD_REQUEST,
                    ApiErrorBody::new("VALIDATION_ERROR", "A field value is out of range."),
                )
            }
            NexusError::DatabaseError(_) | NexusError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody::new("INTERNAL_ERROR", "An internal server error occurred."),
            ),
            NexusError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new("VALIDATION_ERROR", msg),
            ),
            NexusError::Conflict(msg) => {
                (StatusCode::CONFLICT, ApiErrorBody::new("CONFLICT", msg))
            }
            NexusError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ApiErrorBody::new("PAYLOAD_TOO_LARGE", "Request body is too large."),
            ),
            NexusError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody::new("UNAUTHORIZED", "Invalid or missing service key."),
            ),
            NexusError::MissingOrganization => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new(
                    "MISSING_ORGANIZATION",
                    "Header x-organization-id is required.",
                ),
            ),
            NexusError::AiDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorBody::new("AI_DISABLED", "AI assistance is not configured."),
            ),
            NexusError::Json(_) | NexusError::EmptyCompletion => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody::new("BAD_UPSTREAM_RESPONSE", "AI provider response was unusable."),
            ),
            NexusError::AiProvider(provider_err) => {
                // The provider's message may echo our own credentials.
                warn!(
                    status = ?provider_err.status,
                    kind = ?provider_err.error.kind,
                    message = %provider_err.error.message,
                    "AI provider rejected the request"
                );
                let code = match provider_err.status {
                    Some(429) => "RATE_LIMIT".to_string(),
                    _ => provider_err
                        .error
                        .kind
                        .map(|kind| kind.to_ascii_uppercase())
                        .unwrap_or_else(|| "UPSTREAM_ERROR".to_string()),
                };
                (
                    StatusCode::BAD_GATEWAY,
                    ApiErrorBody::new(code, "The AI provider rejected the request."),
                )
            }
            NexusError::Reqwest(_) | NexusError::UrlParse(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody::new("BAD_GATEWAY", "Upstream service is unavailable."),
            ),
            NexusError::UpstreamStatus(code) => {
                warn!(status = %code, "AI provider returned an error status");
                let (err_code, msg) = match code {
                    StatusCode::TOO_MANY_REQUESTS => {
                        ("RATE_LIMIT", "Upstream rate limit exceeded.")
                    }
                    StatusCode::UNAUTHORIZED => ("UNAUTHORIZED", "Upstream authentication failed."),
                    StatusCode::FORBIDDEN => ("FORBIDDEN", "Upstream permission denied."),
                    StatusCode::NOT_FOUND => ("NOT_FOUND", "Upstream resource not found."),
                    _ => ("UPSTREAM_ERROR", "An upstream error occurred."),
                };
                (StatusCode::BAD_GATEWAY, ApiErrorBody::new(err_code, msg))
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiErrorBody {
    fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// Error payload of an OpenAI-compatible provider.
#[derive(Deserialize, Debug)]
pub struct AiProviderError {
    /// Filled from the HTTP response, not the body.
    #[serde(skip)]
    pub status: Option<u16>,
    pub error: AiProviderErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct AiProviderErrorBody {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}
