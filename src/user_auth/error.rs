//! Authentication error types.

use thiserror::Error;

use crate::store::StoreError;

/// Registration, login and session gate failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("email already exists")]
    EmailExists,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("password must be at least {min_len} characters")]
    WeakPassword { min_len: usize },

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("authorization header required")]
    MissingToken,

    #[error("invalid authorization header format")]
    MalformedHeader,

    /// Bad signature, expired, or not yet valid
    #[error("invalid or expired token")]
    InvalidToken,

    /// Credential still valid but the idle session is gone
    #[error("session expired due to inactivity")]
    SessionExpired,

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::EmailExists => "EMAIL_EXISTS",
            AuthError::PasswordMismatch => "PASSWORD_MISMATCH",
            AuthError::WeakPassword { .. } => "WEAK_PASSWORD",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::MissingToken => "MISSING_AUTH",
            AuthError::MalformedHeader => "INVALID_FORMAT",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::SessionExpired => "SESSION_EXPIRED",
            AuthError::Validation(_) => "INVALID_PARAMETER",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            AuthError::EmailExists => 409,
            AuthError::PasswordMismatch | AuthError::WeakPassword { .. } | AuthError::Validation(_) => 400,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::MalformedHeader
            | AuthError::InvalidToken
            | AuthError::SessionExpired => 401,
            AuthError::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AuthError::EmailExists,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status() {
        assert_eq!(AuthError::EmailExists.http_status(), 409);
        assert_eq!(AuthError::WeakPassword { min_len: 8 }.http_status(), 400);
        assert_eq!(AuthError::PasswordMismatch.http_status(), 400);
        assert_eq!(AuthError::InvalidCredentials.http_status(), 401);
        assert_eq!(AuthError::SessionExpired.http_status(), 401);
        assert_eq!(AuthError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn test_duplicate_email_maps_to_domain_error() {
        assert_eq!(AuthError::from(StoreError::DuplicateEmail), AuthError::EmailExists);
        assert!(matches!(
            AuthError::from(StoreError::NotFound("user")),
            AuthError::Internal(_)
        ));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            AuthError::WeakPassword { min_len: 8 }.to_string(),
            "password must be at least 8 characters"
        );
        assert_eq!(
            AuthError::SessionExpired.to_string(),
            "session expired due to inactivity"
        );
    }
}
