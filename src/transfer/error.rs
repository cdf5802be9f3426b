//! Transfer Error Types

use thiserror::Error;

use crate::core_types::UserId;
use crate::store::StoreError;

/// Transfer error types
///
/// Every variant except `SenderNotFound` and `Internal` is a terminal domain
/// rejection reported to the caller verbatim. No wallet or ledger row has been
/// written when any of them is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("amount must be greater than 0")]
    InvalidAmount,

    #[error("recipient not found")]
    RecipientNotFound,

    #[error("cannot transfer to yourself")]
    SelfTransfer,

    #[error("insufficient balance")]
    InsufficientBalance,

    /// The authenticated caller has no user record; an invariant is broken
    #[error("sender {0} not found")]
    SenderNotFound(UserId),

    /// Storage failure. The cause is for operator logs only.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransferError {
    /// Stable machine-readable kind
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            TransferError::SelfTransfer => "SELF_TRANSFER",
            TransferError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            TransferError::SenderNotFound(_) | TransferError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidAmount
            | TransferError::SelfTransfer
            | TransferError::InsufficientBalance => 400,
            TransferError::RecipientNotFound => 404,
            TransferError::SenderNotFound(_) | TransferError::Internal(_) => 500,
        }
    }

    /// Domain rejection (as opposed to an infrastructure failure)
    pub fn is_domain(&self) -> bool {
        self.http_status() < 500
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        TransferError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::SelfTransfer.code(), "SELF_TRANSFER");
        assert_eq!(
            TransferError::InsufficientBalance.code(),
            "INSUFFICIENT_BALANCE"
        );
        assert_eq!(TransferError::Internal("db".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidAmount.http_status(), 400);
        assert_eq!(TransferError::InsufficientBalance.http_status(), 400);
        assert_eq!(TransferError::SelfTransfer.http_status(), 400);
        assert_eq!(TransferError::RecipientNotFound.http_status(), 404);
        assert_eq!(TransferError::SenderNotFound(1).http_status(), 500);
    }

    #[test]
    fn test_store_errors_are_opaque_internal() {
        let err: TransferError = StoreError::Backend("connection reset".into()).into();
        assert!(!err.is_domain());
        assert!(matches!(err, TransferError::Internal(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TransferError::InsufficientBalance.to_string(),
            "insufficient balance"
        );
    }
}
