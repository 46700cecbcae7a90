//! Structured API error responses with stable error codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::anchor::DecryptError;
use crate::chain::ChainError;
use crate::classify::EngineError;

/// Error codes for API responses.
///
/// These codes are stable and can be used by clients for programmatic
/// error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input errors (1xxx): caller's fault, no retry
    MissingRequiredField,
    InvalidFieldValue,
    InvalidTxid,

    // Resource errors (2xxx)
    TxNotFound,
    /// Transaction known but not in a block yet; a pending state, not a failure
    TxUnconfirmed,
    RecordNotFound,
    PanelNotFound,

    // External source errors (3xxx): caller may retry with backoff
    RateLimitExceeded,
    ChainUnavailable,

    // Integrity errors (4xxx): fatal for the attempt
    DecryptCorrupted,
    CapsuleVersion,

    // Configuration errors (5xxx)
    AnchorNotConfigured,
    DecryptKeyUnavailable,

    // Fallback
    InternalError,
}

impl ErrorCode {
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::MissingRequiredField => 1001,
            ErrorCode::InvalidFieldValue => 1002,
            ErrorCode::InvalidTxid => 1003,

            ErrorCode::TxNotFound => 2001,
            ErrorCode::TxUnconfirmed => 2002,
            ErrorCode::RecordNotFound => 2003,
            ErrorCode::PanelNotFound => 2004,

            ErrorCode::RateLimitExceeded => 3001,
            ErrorCode::ChainUnavailable => 3002,

            ErrorCode::DecryptCorrupted => 4001,
            ErrorCode::CapsuleVersion => 4002,

            ErrorCode::AnchorNotConfigured => 5001,
            ErrorCode::DecryptKeyUnavailable => 5002,

            ErrorCode::InternalError => 9999,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::InvalidTxid => StatusCode::BAD_REQUEST,

            ErrorCode::TxNotFound
            | ErrorCode::TxUnconfirmed
            | ErrorCode::RecordNotFound
            | ErrorCode::PanelNotFound => StatusCode::NOT_FOUND,

            ErrorCode::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::ChainUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::DecryptCorrupted | ErrorCode::CapsuleVersion => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            ErrorCode::AnchorNotConfigured | ErrorCode::DecryptKeyUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured error response body: `{"error": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                resource_id: None,
            },
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::InvalidTxid(txid) => {
                ApiError::new(ErrorCode::InvalidTxid, format!("malformed txid: {txid}"))
                    .with_resource_id(txid)
            }
            ChainError::TxNotFound(txid) => {
                ApiError::new(ErrorCode::TxNotFound, format!("transaction not found: {txid}"))
                    .with_resource_id(txid)
            }
            ChainError::RateLimited => ApiError::new(
                ErrorCode::RateLimitExceeded,
                "chain query rate budget exhausted; retry later",
            ),
            ChainError::Unavailable(msg) => ApiError::new(
                ErrorCode::ChainUnavailable,
                format!("chain data source unavailable: {msg}"),
            ),
        }
    }
}

impl From<DecryptError> for ApiError {
    fn from(err: DecryptError) -> Self {
        let code = match &err {
            DecryptError::EmptyInput => ErrorCode::MissingRequiredField,
            DecryptError::Corrupted(_) => ErrorCode::DecryptCorrupted,
            DecryptError::KeyUnavailable => ErrorCode::DecryptKeyUnavailable,
            DecryptError::UnsupportedVersion(_) => ErrorCode::CapsuleVersion,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownPanel(id) => {
                ApiError::new(ErrorCode::PanelNotFound, format!("unknown panel {id}"))
                    .with_resource_id(id)
            }
            other => ApiError::new(ErrorCode::InvalidFieldValue, other.to_string()),
        }
    }
}

/// Missing or non-string field in a JSON body
pub fn missing_field(field: &str) -> ApiError {
    ApiError::new(
        ErrorCode::MissingRequiredField,
        format!("missing or non-string field: {field}"),
    )
}

/// Unexpected failure: 500 with `{"error": ...}`
pub fn internal_error(message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InternalError, message.into())
}
