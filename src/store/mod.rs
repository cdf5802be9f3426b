//! Storage ports for identities, wallets and the ledger.
//!
//! The transfer engine and the auth service only talk to these traits. Two
//! backends implement them:
//! - [`postgres::PgStore`]: durable, row locks via `SELECT ... FOR UPDATE`
//! - [`memory::MemoryStore`]: in-process, per-wallet async mutexes
//!
//! # Unit of work
//!
//! [`WalletStore::begin`] opens an isolated unit of work. Wallet rows locked
//! through it stay locked until `commit` or `rollback`; dropping it without
//! committing discards every staged write.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::core_types::{UserId, WalletId};
use crate::models::{IdempotencyKey, LedgerEntry, NewLedgerEntry, NewUser, User, Wallet};
use crate::money::Money;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage-layer failures.
///
/// Only the two uniqueness violations carry domain meaning; everything else is
/// infrastructure and ends up as an opaque internal error for the caller.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("idempotency key already recorded")]
    DuplicateIdempotencyKey,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("balance constraint violated for wallet {0}")]
    NegativeBalance(WalletId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn user_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    /// Lookup by normalized email
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Create the user and its wallet in one unit of work.
    ///
    /// A user without a wallet is never observable.
    async fn create_user_with_wallet(
        &self,
        new_user: NewUser,
        initial_balance: Money,
    ) -> Result<(User, Wallet), StoreError>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Unlocked read, for display and for learning wallet ids before locking
    async fn wallet_by_user(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError>;

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Debit entry recorded under this caller key, if any
    async fn entry_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<LedgerEntry>, StoreError>;

    /// Most recent entries of a wallet, newest first
    async fn recent_entries(
        &self,
        wallet_id: WalletId,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, StoreError>;
}

/// Isolated, all-or-nothing set of wallet and ledger writes.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Re-read a wallet and hold its row lock until the unit of work ends.
    async fn lock_wallet(&mut self, wallet_id: WalletId) -> Result<Wallet, StoreError>;

    /// Set the balance of a wallet previously locked by this unit of work.
    async fn set_balance(&mut self, wallet_id: WalletId, balance: Money) -> Result<(), StoreError>;

    /// Fails with [`StoreError::DuplicateIdempotencyKey`] when the
    /// `(idempotency_key, entry_type)` pair already exists.
    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Everything the services need from one backend
#[async_trait]
pub trait Store: IdentityStore + WalletStore + LedgerStore {
    async fn health_check(&self) -> Result<(), StoreError>;
}
