use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::Validate;

use super::error::AuthError;
use super::jwt::TokenManager;
use super::session::SessionStore;
use crate::models::{NewUser, User, UserSummary, normalize_email};
use crate::money::Money;
use crate::store::Store;

/// User Registration Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "invalid email"))]
    #[schema(example = "user1@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    #[schema(example = "password123")]
    pub password: String,
    #[validate(length(min = 1, message = "confirmPassword is required"))]
    #[schema(example = "password123")]
    pub confirm_password: String,
}

/// User Login Request
///
/// Not format-checked: a malformed email simply matches no user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "user1@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// Registration result
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "registration successful")]
    pub message: String,
    pub user: UserSummary,
}

/// Auth Response (bearer token + session)
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone)]
pub struct RegistrationPolicy {
    pub initial_balance: Money,
    pub password_min_len: usize,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            initial_balance: Money::from_major(1000),
            password_min_len: 8,
        }
    }
}

pub struct UserAuthService {
    store: Arc<dyn Store>,
    tokens: TokenManager,
    sessions: Arc<dyn SessionStore>,
    policy: RegistrationPolicy,
}

impl UserAuthService {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: TokenManager,
        sessions: Arc<dyn SessionStore>,
        policy: RegistrationPolicy,
    ) -> Self {
        Self {
            store,
            tokens,
            sessions,
            policy,
        }
    }

    /// Register a new user and seed its wallet
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, AuthError> {
        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        if password.chars().count() < self.policy.password_min_len {
            return Err(AuthError::WeakPassword {
                min_len: self.policy.password_min_len,
            });
        }

        let email = normalize_email(email);
        if self.store.user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }

        let password_hash = hash_password(password)?;

        // The unique index still decides a concurrent registration race
        let (user, wallet) = self
            .store
            .create_user_with_wallet(
                NewUser {
                    email,
                    password_hash,
                },
                self.policy.initial_balance,
            )
            .await?;

        info!(
            user_id = user.user_id,
            wallet_id = wallet.wallet_id,
            "User registered"
        );
        Ok(user)
    }

    /// Verify credentials, issue a bearer token and open its session
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let user = self
            .store
            .user_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.user_id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.user_id, &user.email)?;
        self.sessions
            .create(&token, user.user_id)
            .await
            .map_err(|e| AuthError::Internal(format!("error creating session: {e}")))?;

        info!(user_id = user.user_id, "User logged in");
        Ok(AuthResponse {
            token,
            user: UserSummary::from(&user),
        })
    }

    /// Revoke the session; the token is refused from now on
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions
            .revoke(token)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("Hashing failed: {e}")))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| AuthError::Internal(format!("Invalid hash format: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
