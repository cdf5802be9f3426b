//! Session gate: bearer credential + live idle session.
//!
//! Two predicates, both required:
//! - [`SessionGate::verify_credential`]: stateless signature/expiry check
//! - [`SessionGate::check_session`]: a live `session:<token>` record, whose
//!   expiry is extended on success
//!
//! The session is only touched once the credential has verified, so a forged
//! or expired token never extends anything.

use std::sync::Arc;

use tracing::{debug, warn};

use super::error::AuthError;
use super::jwt::{Claims, TokenManager};
use super::session::SessionStore;
use crate::core_types::UserId;

/// Authenticated caller, injected into request extensions by the middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: UserId,
    pub email: String,
    /// Literal bearer token, kept for logout
    pub token: String,
}

/// Extract the token from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingToken)?;
    let mut parts = header.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) if scheme == "Bearer" && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AuthError::MalformedHeader),
    }
}

#[derive(Clone)]
pub struct SessionGate {
    tokens: TokenManager,
    sessions: Arc<dyn SessionStore>,
}

impl SessionGate {
    pub fn new(tokens: TokenManager, sessions: Arc<dyn SessionStore>) -> Self {
        Self { tokens, sessions }
    }

    pub fn verify_credential(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.verify(token)
    }

    /// Owner of the live session for `token`; slides its expiry.
    pub async fn check_session(&self, token: &str) -> Result<UserId, AuthError> {
        match self.sessions.touch(token).await {
            Ok(Some(user_id)) => Ok(user_id),
            Ok(None) => Err(AuthError::SessionExpired),
            Err(e) => Err(AuthError::Internal(e.to_string())),
        }
    }

    pub async fn authenticate(&self, header: Option<&str>) -> Result<CallerIdentity, AuthError> {
        let token = bearer_token(header)?;

        let claims = self.verify_credential(token).inspect_err(|_| {
            debug!("Rejected bearer credential");
        })?;
        let claimed = claims.user_id()?;

        let owner = self.check_session(token).await?;
        if owner != claimed {
            warn!(claimed, owner, "Session owner does not match token subject");
            return Err(AuthError::InvalidToken);
        }

        Ok(CallerIdentity {
            user_id: claimed,
            email: claims.email,
            token: token.to_string(),
        })
    }
}
