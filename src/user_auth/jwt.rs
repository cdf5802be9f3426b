//! Bearer credential issue and verification (HS256 JWT).
//!
//! Verification is stateless: signature, `exp` and `nbf` only. Every issued
//! token carries a fresh `jti`, so two logins never share a session key.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::error::AuthError;
use crate::core_types::UserId;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // user_id as string
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    pub nbf: usize,
    /// Unique per login
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

#[derive(Clone)]
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenManager {
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn issue(&self, user_id: UserId, email: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| AuthError::Internal("token expiry out of range".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: expires.timestamp() as usize,
            iat: now.timestamp() as usize,
            nbf: now.timestamp() as usize,
            jti: Ulid::new().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}
