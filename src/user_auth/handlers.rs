use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::gate::CallerIdentity;
use super::service::{AuthResponse, LoginRequest, RegisterRequest, RegisterResponse};
use crate::core_types::UserId;
use crate::gateway::{
    state::AppState,
    types::{ApiError, ApiJson, ApiResponse, ValidatedJson},
};
use crate::models::UserSummary;

/// Register a new user
///
/// POST /auth/register
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered with a seeded wallet", body = ApiResponse<RegisterResponse>),
        (status = 400, description = "Validation failed, password mismatch or weak password"),
        (status = 409, description = "Email already exists"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterResponse>>), ApiError> {
    let user = state
        .user_auth
        .register(&req.email, &req.password, &req.confirm_password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Registration rejected"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RegisterResponse {
            message: "registration successful".to_string(),
            user: UserSummary::from(&user),
        })),
    ))
}

/// Login user
///
/// POST /auth/login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session opened", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let resp = state.user_auth.login(&req.email, &req.password).await?;
    Ok(Json(ApiResponse::success(resp)))
}

/// Logout: revoke the current session
///
/// POST /auth/logout
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session revoked"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.user_auth.logout(&caller.token).await?;
    tracing::info!(user_id = caller.user_id, "User logged out");
    Ok(Json(ApiResponse::success("logged out".to_string())))
}

/// GET /me response data
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    #[schema(example = "Hello user1@example.com, welcome back")]
    pub message: String,
    pub user_id: UserId,
    pub email: String,
}

/// Current caller, from the verified token claims
///
/// GET /me
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Authenticated caller", body = ApiResponse<MeResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn me(Extension(caller): Extension<CallerIdentity>) -> Json<ApiResponse<MeResponse>> {
    Json(ApiResponse::success(MeResponse {
        message: format!("Hello {}, welcome back", caller.email),
        user_id: caller.user_id,
        email: caller.email,
    }))
}
