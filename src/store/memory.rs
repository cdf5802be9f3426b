//! In-process storage backend.
//!
//! Mirrors the guarantees the PostgreSQL schema gives the services:
//! - each wallet row has its own async mutex, held by a unit of work from
//!   `lock_wallet` until commit/rollback (the `FOR UPDATE` equivalent)
//! - plain reads never wait on row locks; they see the last committed value
//! - `(idempotency_key, entry_type)` is unique, re-checked atomically at commit
//! - balances never go below zero

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{IdentityStore, LedgerStore, Store, StoreError, UnitOfWork, WalletStore};
use crate::core_types::{UserId, WalletId};
use crate::models::{
    EntryType, IdempotencyKey, LedgerEntry, NewLedgerEntry, NewUser, User, Wallet,
};
use crate::money::Money;

struct WalletRow {
    committed: Wallet,
    lock: Arc<Mutex<()>>,
}

#[derive(Default)]
struct Identities {
    users: HashMap<UserId, User>,
    by_email: HashMap<String, UserId>,
}

#[derive(Default)]
struct Ledger {
    entries: Vec<LedgerEntry>,
    /// `(idempotency_key, entry_type)` -> position in `entries`
    keys: HashMap<(String, EntryType), usize>,
}

impl Ledger {
    fn find(&self, key: &IdempotencyKey, entry_type: EntryType) -> Option<&LedgerEntry> {
        self.keys
            .get(&(key.as_str().to_string(), entry_type))
            .and_then(|&idx| self.entries.get(idx))
    }

    fn contains(&self, key: &Option<IdempotencyKey>, entry_type: EntryType) -> bool {
        key.as_ref()
            .is_some_and(|k| self.find(k, entry_type).is_some())
    }
}

struct Inner {
    identities: Mutex<Identities>,
    wallets: DashMap<WalletId, WalletRow>,
    wallet_by_user: DashMap<UserId, WalletId>,
    ledger: Mutex<Ledger>,
    next_user_id: AtomicI64,
    next_wallet_id: AtomicI64,
    next_entry_id: AtomicI64,
}

/// Thread-safe in-memory store. Cloning shares the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                identities: Mutex::new(Identities::default()),
                wallets: DashMap::new(),
                wallet_by_user: DashMap::new(),
                ledger: Mutex::new(Ledger::default()),
                next_user_id: AtomicI64::new(1),
                next_wallet_id: AtomicI64::new(1),
                next_entry_id: AtomicI64::new(1),
            }),
        }
    }

    /// Total number of ledger rows (all wallets)
    pub async fn entry_count(&self) -> usize {
        self.inner.ledger.lock().await.entries.len()
    }

    /// Sum of every committed wallet balance
    pub fn total_balance(&self) -> Money {
        Money::from_minor_units(
            self.inner
                .wallets
                .iter()
                .map(|row| row.committed.balance.minor_units())
                .sum(),
        )
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn user_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.inner.identities.lock().await.users.get(&user_id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let identities = self.inner.identities.lock().await;
        Ok(identities
            .by_email
            .get(email)
            .and_then(|id| identities.users.get(id))
            .cloned())
    }

    async fn create_user_with_wallet(
        &self,
        new_user: NewUser,
        initial_balance: Money,
    ) -> Result<(User, Wallet), StoreError> {
        if initial_balance.is_negative() {
            return Err(StoreError::NegativeBalance(0));
        }

        let mut identities = self.inner.identities.lock().await;
        if identities.by_email.contains_key(&new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            user_id: self.inner.next_user_id.fetch_add(1, Ordering::SeqCst),
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: now,
        };
        let wallet = Wallet {
            wallet_id: self.inner.next_wallet_id.fetch_add(1, Ordering::SeqCst),
            user_id: user.user_id,
            balance: initial_balance,
            created_at: now,
            updated_at: now,
        };

        // Wallet first: the user only becomes resolvable once it has one.
        self.inner.wallets.insert(
            wallet.wallet_id,
            WalletRow {
                committed: wallet.clone(),
                lock: Arc::new(Mutex::new(())),
            },
        );
        self.inner
            .wallet_by_user
            .insert(user.user_id, wallet.wallet_id);
        identities
            .by_email
            .insert(user.email.clone(), user.user_id);
        identities.users.insert(user.user_id, user.clone());

        Ok((user, wallet))
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn wallet_by_user(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        let Some(wallet_id) = self.inner.wallet_by_user.get(&user_id).map(|r| *r) else {
            return Ok(None);
        };
        Ok(self
            .inner
            .wallets
            .get(&wallet_id)
            .map(|row| row.committed.clone()))
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(Box::new(MemoryUnitOfWork {
            inner: self.inner.clone(),
            locks: HashMap::new(),
            balances: HashMap::new(),
            entries: Vec::new(),
        }))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn entry_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let ledger = self.inner.ledger.lock().await;
        Ok(ledger.find(key, EntryType::Debit).cloned())
    }

    async fn recent_entries(
        &self,
        wallet_id: WalletId,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let ledger = self.inner.ledger.lock().await;
        Ok(ledger
            .entries
            .iter()
            .rev()
            .filter(|e| e.wallet_id == wallet_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Unit of work over [`MemoryStore`].
///
/// Writes are staged and only published by `commit`. Dropping it releases
/// the row locks and discards the staged writes.
pub struct MemoryUnitOfWork {
    inner: Arc<Inner>,
    locks: HashMap<WalletId, OwnedMutexGuard<()>>,
    balances: HashMap<WalletId, Money>,
    entries: Vec<NewLedgerEntry>,
}

impl MemoryUnitOfWork {
    fn committed(&self, wallet_id: WalletId) -> Result<Wallet, StoreError> {
        self.inner
            .wallets
            .get(&wallet_id)
            .map(|row| row.committed.clone())
            .ok_or(StoreError::NotFound("wallet"))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_wallet(&mut self, wallet_id: WalletId) -> Result<Wallet, StoreError> {
        if !self.locks.contains_key(&wallet_id) {
            // Clone the Arc out so no map guard is held across the await
            let lock = self
                .inner
                .wallets
                .get(&wallet_id)
                .map(|row| row.lock.clone())
                .ok_or(StoreError::NotFound("wallet"))?;
            let guard = lock.lock_owned().await;
            self.locks.insert(wallet_id, guard);
        }

        let mut wallet = self.committed(wallet_id)?;
        if let Some(staged) = self.balances.get(&wallet_id) {
            wallet.balance = *staged;
        }
        Ok(wallet)
    }

    async fn set_balance(&mut self, wallet_id: WalletId, balance: Money) -> Result<(), StoreError> {
        if !self.locks.contains_key(&wallet_id) {
            return Err(StoreError::Backend(format!(
                "wallet {wallet_id} updated without holding its lock"
            )));
        }
        if balance.is_negative() {
            return Err(StoreError::NegativeBalance(wallet_id));
        }
        self.balances.insert(wallet_id, balance);
        Ok(())
    }

    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<(), StoreError> {
        let staged_dup = entry.idempotency_key.is_some()
            && self
                .entries
                .iter()
                .any(|e| e.entry_type == entry.entry_type && e.idempotency_key == entry.idempotency_key);
        if staged_dup
            || self
                .inner
                .ledger
                .lock()
                .await
                .contains(&entry.idempotency_key, entry.entry_type)
        {
            return Err(StoreError::DuplicateIdempotencyKey);
        }
        self.entries.push(entry);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        let mut ledger = this.inner.ledger.lock().await;

        // Authoritative uniqueness check: a concurrent unit of work may have
        // committed the same key since append_entry looked.
        if this
            .entries
            .iter()
            .any(|e| ledger.contains(&e.idempotency_key, e.entry_type))
        {
            return Err(StoreError::DuplicateIdempotencyKey);
        }

        let now = Utc::now();
        for (wallet_id, balance) in &this.balances {
            if let Some(mut row) = this.inner.wallets.get_mut(wallet_id) {
                row.committed.balance = *balance;
                row.committed.updated_at = now;
            }
        }

        for entry in this.entries {
            if let Some(key) = &entry.idempotency_key {
                let idx = ledger.entries.len();
                ledger
                    .keys
                    .insert((key.as_str().to_string(), entry.entry_type), idx);
            }
            ledger.entries.push(LedgerEntry {
                id: this.inner.next_entry_id.fetch_add(1, Ordering::SeqCst),
                transfer_id: entry.transfer_id,
                wallet_id: entry.wallet_id,
                entry_type: entry.entry_type,
                amount: entry.amount,
                related_user_id: entry.related_user_id,
                notes: entry.notes,
                idempotency_key: entry.idempotency_key,
                created_at: now,
            });
        }

        // Row locks are released when `this.locks` drops here.
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
