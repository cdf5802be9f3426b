//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResponse};

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// Package version and git revision
    #[schema(example = "0.1.0 (3f2a9c1)")]
    pub version: String,
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
}

/// Health check endpoint
///
/// Pings the store but does NOT expose internal details in the response.
///
/// - Healthy: 200 OK + {code: 0, data: {status, timestamp_ms}}
/// - Unhealthy: 503 Service Unavailable + {code: 5001, msg: "unavailable"}
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = ApiResponse<HealthResponse>, content_type = "application/json"),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    if let Err(e) = state.store.health_check().await {
        tracing::error!(error = %e, "[HEALTH] store ping failed");
        return Err(ApiError::unavailable());
    }

    Ok(Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        version: concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_ID"), ")").to_string(),
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
    })))
}
