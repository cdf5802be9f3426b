//! Wallet-to-wallet transfers
//!
//! # Safety Invariants
//!
//! 1. **Conservation**: a committed transfer leaves the sum of all balances unchanged
//! 2. **Non-negative**: no committed wallet balance is ever below zero
//! 3. **Double entry**: every committed transfer writes exactly one debit and one credit
//! 4. **Idempotency**: a keyed request takes effect at most once, even under races
//! 5. **Lock order**: wallet rows are locked in ascending wallet id order

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod integration_tests;

pub use error::TransferError;
pub use service::{TransferService, lock_order};
pub use types::{
    TransferCommand, TransferOutcome, TransferReceipt, TransferRequest, TransferResponse,
    WalletOverview,
};
