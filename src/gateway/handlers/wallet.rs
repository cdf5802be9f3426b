//! Wallet handlers: overview and transfers

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::HeaderMap,
};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResponse, ValidatedJson};
use crate::models::IdempotencyKey;
use crate::transfer::{TransferCommand, TransferRequest, TransferResponse, WalletOverview};
use crate::user_auth::CallerIdentity;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Caller's wallet and most recent transactions
///
/// GET /wallet
#[utoipa::path(
    get,
    path = "/wallet",
    responses(
        (status = 200, description = "Wallet and recent transactions, newest first", body = ApiResponse<WalletOverview>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<ApiResponse<WalletOverview>>, ApiError> {
    let overview = state
        .transfers
        .wallet_overview(caller.user_id, state.recent_transactions_limit)
        .await?;
    Ok(Json(ApiResponse::success(overview)))
}

/// Transfer to another user by email
///
/// POST /wallet/transfer
///
/// A retried request carrying the same `Idempotency-Key` returns success
/// without moving funds again.
#[utoipa::path(
    post,
    path = "/wallet/transfer",
    request_body = TransferRequest,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Caller-chosen key; repeats are applied once")
    ),
    responses(
        (status = 200, description = "Transfer committed or already processed", body = ApiResponse<TransferResponse>),
        (status = 400, description = "Invalid amount, insufficient balance or self-transfer"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Recipient not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<TransferRequest>,
) -> Result<Json<ApiResponse<TransferResponse>>, ApiError> {
    let idempotency_key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| ApiError::bad_request("Idempotency-Key must be visible ASCII"))?;
            if raw.trim().len() > crate::models::MAX_IDEMPOTENCY_KEY_LEN {
                return Err(ApiError::bad_request("Idempotency-Key too long"));
            }
            IdempotencyKey::new(raw)
        }
        None => None,
    };

    let outcome = state
        .transfers
        .transfer(TransferCommand {
            sender_id: caller.user_id,
            recipient: req.recipient,
            amount: req.amount,
            notes: req.notes,
            idempotency_key,
        })
        .await
        .inspect_err(|e| {
            if e.is_domain() {
                tracing::warn!(user_id = caller.user_id, error = %e, "Transfer rejected");
            }
        })?;

    Ok(Json(ApiResponse::success(TransferResponse::from(&outcome))))
}
