//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `error_codes`: Standard error code constants
//! - `ApiError`: domain/infrastructure errors rendered as `ApiResponse`

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::transfer::TransferError;
use crate::user_auth::AuthError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - error: machine-readable error kind (errors only)
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "INSUFFICIENT_BALANCE")]
    pub error: Option<String>,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            error: None,
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            error: None,
            data: None,
        }
    }
}

// ============================================================================
// Error Codes
// ============================================================================

pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;
    pub const INVALID_AMOUNT: i32 = 1003;
    pub const SELF_TRANSFER: i32 = 1004;
    pub const PASSWORD_MISMATCH: i32 = 1005;
    pub const WEAK_PASSWORD: i32 = 1006;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const SESSION_EXPIRED: i32 = 2003;

    // Resource errors (4xxx)
    pub const RECIPIENT_NOT_FOUND: i32 = 4004;
    pub const EMAIL_EXISTS: i32 = 4009;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}

// ============================================================================
// ApiError
// ============================================================================

/// Error response for every handler.
///
/// 5xx causes are logged here and replaced with a generic message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub kind: &'static str,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, kind: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            kind,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_PARAMETER,
            "INVALID_PARAMETER",
            msg,
        )
    }

    pub fn internal(cause: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            "INTERNAL_ERROR",
            cause,
        )
    }

    pub fn unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "unavailable",
        )
    }
}

fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let code = match &e {
            TransferError::InvalidAmount => error_codes::INVALID_AMOUNT,
            TransferError::RecipientNotFound => error_codes::RECIPIENT_NOT_FOUND,
            TransferError::SelfTransfer => error_codes::SELF_TRANSFER,
            TransferError::InsufficientBalance => error_codes::INSUFFICIENT_BALANCE,
            TransferError::SenderNotFound(_) | TransferError::Internal(_) => {
                error_codes::INTERNAL_ERROR
            }
        };
        Self::new(status_of(e.http_status()), code, e.code(), e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let code = match &e {
            AuthError::EmailExists => error_codes::EMAIL_EXISTS,
            AuthError::PasswordMismatch => error_codes::PASSWORD_MISMATCH,
            AuthError::WeakPassword { .. } => error_codes::WEAK_PASSWORD,
            AuthError::Validation(_) => error_codes::INVALID_PARAMETER,
            AuthError::MissingToken => error_codes::MISSING_AUTH,
            AuthError::InvalidCredentials
            | AuthError::MalformedHeader
            | AuthError::InvalidToken => error_codes::AUTH_FAILED,
            AuthError::SessionExpired => error_codes::SESSION_EXPIRED,
            AuthError::Internal(_) => error_codes::INTERNAL_ERROR,
        };
        Self::new(status_of(e.http_status()), code, e.code(), e.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| match &err.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        messages.sort();
        Self::bad_request(messages.join("; "))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let msg = if self.status.is_server_error() {
            tracing::error!(code = self.code, cause = %self.msg, "Request failed");
            "internal server error".to_string()
        } else {
            self.msg
        };
        let body = ApiResponse::<()> {
            code: self.code,
            msg,
            error: Some(self.kind.to_string()),
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}
