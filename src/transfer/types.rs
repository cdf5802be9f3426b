//! Transfer request and result types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::core_types::{TransferId, UserId, WalletId};
use crate::models::{IdempotencyKey, LedgerEntry, Wallet};
use crate::money::Money;

/// Engine input. The sender is the authenticated caller.
#[derive(Debug, Clone)]
pub struct TransferCommand {
    pub sender_id: UserId,
    /// Recipient's public identifier (email), matched case-insensitively
    pub recipient: String,
    pub amount: Money,
    pub notes: String,
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Balances after a committed transfer
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferReceipt {
    #[schema(value_type = String)]
    pub transfer_id: TransferId,
    pub sender_wallet_id: WalletId,
    pub recipient_wallet_id: WalletId,
    #[schema(value_type = String, example = "200.00")]
    pub amount: Money,
    #[schema(value_type = String, example = "800.00")]
    pub sender_balance: Money,
}

#[derive(Debug, Clone)]
pub enum TransferOutcome {
    /// Balances moved and both ledger entries were written
    Committed(TransferReceipt),
    /// The idempotency key was already recorded; nothing changed.
    ///
    /// `transfer_id` is the original transfer when it could be looked up.
    Replayed { transfer_id: Option<TransferId> },
}

impl TransferOutcome {
    pub fn transfer_id(&self) -> Option<TransferId> {
        match self {
            TransferOutcome::Committed(receipt) => Some(receipt.transfer_id),
            TransferOutcome::Replayed { transfer_id } => *transfer_id,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, TransferOutcome::Replayed { .. })
    }
}

/// POST /wallet/transfer body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferRequest {
    #[validate(length(min = 1, message = "recipient is required"))]
    #[schema(example = "user2@example.com")]
    pub recipient: String,
    #[schema(value_type = String, example = "200.00")]
    pub amount: Money,
    #[serde(default)]
    #[validate(length(max = 1000))]
    #[schema(example = "dinner")]
    pub notes: String,
}

/// POST /wallet/transfer response data
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResponse {
    #[schema(example = "transfer successful")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_id: Option<String>,
    /// True when an earlier request with the same key already succeeded
    pub replayed: bool,
}

impl From<&TransferOutcome> for TransferResponse {
    fn from(outcome: &TransferOutcome) -> Self {
        Self {
            message: "transfer successful".to_string(),
            transfer_id: outcome.transfer_id().map(|id| id.to_string()),
            replayed: outcome.is_replay(),
        }
    }
}

/// GET /wallet response data
#[derive(Debug, Serialize, ToSchema)]
pub struct WalletOverview {
    pub wallet: Wallet,
    pub transactions: Vec<LedgerEntry>,
}
