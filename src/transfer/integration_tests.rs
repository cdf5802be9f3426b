//! Transfer engine tests against the in-memory backend.
//!
//! The memory store enforces the same row locks and uniqueness rules as the
//! PostgreSQL schema, so these cover concurrency and idempotency without a
//! live database.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core_types::{UserId, WalletId};
use crate::models::{
    EntryType, IdempotencyKey, LedgerEntry, NewLedgerEntry, NewUser, User, Wallet,
};
use crate::money::Money;
use crate::store::{
    IdentityStore, LedgerStore, MemoryStore, Store, StoreError, UnitOfWork, WalletStore,
};
use crate::transfer::{TransferCommand, TransferError, TransferOutcome, TransferService, lock_order};

const START: i64 = 1000;

struct TestHarness {
    store: MemoryStore,
    service: TransferService,
    alice: User,
    bob: User,
}

impl TestHarness {
    async fn new() -> Self {
        let store = MemoryStore::new();
        let alice = register(&store, "alice@example.com").await;
        let bob = register(&store, "bob@example.com").await;
        let service = TransferService::new(Arc::new(store.clone()));
        Self {
            store,
            service,
            alice,
            bob,
        }
    }

    async fn balance(&self, user: &User) -> Money {
        self.store
            .wallet_by_user(user.user_id)
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    async fn entries(&self, user: &User) -> Vec<LedgerEntry> {
        let wallet = self.store.wallet_by_user(user.user_id).await.unwrap().unwrap();
        self.store.recent_entries(wallet.wallet_id, 100).await.unwrap()
    }
}

async fn register(store: &MemoryStore, email: &str) -> User {
    store
        .create_user_with_wallet(
            NewUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
            },
            Money::from_major(START),
        )
        .await
        .unwrap()
        .0
}

fn cmd(sender: &User, recipient: &str, amount: Money, key: Option<&str>) -> TransferCommand {
    TransferCommand {
        sender_id: sender.user_id,
        recipient: recipient.to_string(),
        amount,
        notes: String::new(),
        idempotency_key: key.and_then(IdempotencyKey::new),
    }
}

// ============================================================================
// Fault injection
// ============================================================================

/// Wraps a [`MemoryStore`] to force the failure paths of the engine.
#[derive(Clone)]
struct FaultyStore {
    inner: MemoryStore,
    /// Hide committed keys from the pre-check so the unit of work hits the
    /// uniqueness constraint instead
    blind_ledger: bool,
    /// Fail the credit entry after balances were staged
    fail_credit: bool,
}

#[async_trait]
impl IdentityStore for FaultyStore {
    async fn user_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        self.inner.user_by_id(user_id).await
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.inner.user_by_email(email).await
    }

    async fn create_user_with_wallet(
        &self,
        new_user: NewUser,
        initial_balance: Money,
    ) -> Result<(User, Wallet), StoreError> {
        self.inner
            .create_user_with_wallet(new_user, initial_balance)
            .await
    }
}

#[async_trait]
impl WalletStore for FaultyStore {
    async fn wallet_by_user(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        self.inner.wallet_by_user(user_id).await
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let uow = self.inner.begin().await?;
        if self.fail_credit {
            Ok(Box::new(FailingCredit { inner: uow }))
        } else {
            Ok(uow)
        }
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn entry_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        if self.blind_ledger {
            Ok(None)
        } else {
            self.inner.entry_by_idempotency_key(key).await
        }
    }

    async fn recent_entries(
        &self,
        wallet_id: WalletId,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        self.inner.recent_entries(wallet_id, limit).await
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct FailingCredit {
    inner: Box<dyn UnitOfWork>,
}

#[async_trait]
impl UnitOfWork for FailingCredit {
    async fn lock_wallet(&mut self, wallet_id: WalletId) -> Result<Wallet, StoreError> {
        self.inner.lock_wallet(wallet_id).await
    }

    async fn set_balance(&mut self, wallet_id: WalletId, balance: Money) -> Result<(), StoreError> {
        self.inner.set_balance(wallet_id, balance).await
    }

    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<(), StoreError> {
        if entry.entry_type == EntryType::Credit {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.append_entry(entry).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.rollback().await
    }
}

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_transfer_moves_balance_and_writes_both_entries() {
    let h = TestHarness::new().await;

    let outcome = h
        .service
        .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(200), None))
        .await
        .unwrap();

    let TransferOutcome::Committed(receipt) = outcome else {
        panic!("expected committed transfer");
    };
    assert_eq!(receipt.sender_balance, Money::from_major(800));
    assert_eq!(h.balance(&h.alice).await, Money::from_major(800));
    assert_eq!(h.balance(&h.bob).await, Money::from_major(1200));

    let debits = h.entries(&h.alice).await;
    let credits = h.entries(&h.bob).await;
    assert_eq!(debits.len(), 1);
    assert_eq!(credits.len(), 1);
    assert_eq!(debits[0].entry_type, EntryType::Debit);
    assert_eq!(credits[0].entry_type, EntryType::Credit);
    assert_eq!(debits[0].amount, Money::from_major(200));
    assert_eq!(debits[0].transfer_id, receipt.transfer_id);
    assert_eq!(credits[0].transfer_id, receipt.transfer_id);
    assert_eq!(debits[0].related_user_id, Some(h.bob.user_id));
    assert_eq!(credits[0].related_user_id, Some(h.alice.user_id));
}

#[tokio::test]
async fn test_transfer_entire_balance() {
    let h = TestHarness::new().await;
    h.service
        .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(START), None))
        .await
        .unwrap();
    assert_eq!(h.balance(&h.alice).await, Money::ZERO);
    assert_eq!(h.balance(&h.bob).await, Money::from_major(2 * START));
}

#[tokio::test]
async fn test_recipient_matched_case_insensitively() {
    let h = TestHarness::new().await;
    h.service
        .transfer(cmd(&h.alice, "  Bob@EXAMPLE.com ", Money::from_minor_units(1), None))
        .await
        .unwrap();
    assert_eq!(h.balance(&h.bob).await, Money::from_minor_units(100_001));
}

#[tokio::test]
async fn test_notes_recorded_on_both_entries() {
    let h = TestHarness::new().await;
    let mut command = cmd(&h.alice, "bob@example.com", Money::from_major(5), None);
    command.notes = "dinner".to_string();
    h.service.transfer(command).await.unwrap();

    assert_eq!(h.entries(&h.alice).await[0].notes, "dinner");
    assert_eq!(h.entries(&h.bob).await[0].notes, "dinner");
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_insufficient_balance_changes_nothing() {
    let h = TestHarness::new().await;
    let err = h
        .service
        .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(1500), None))
        .await
        .unwrap_err();

    assert_eq!(err, TransferError::InsufficientBalance);
    assert_eq!(h.balance(&h.alice).await, Money::from_major(START));
    assert_eq!(h.balance(&h.bob).await, Money::from_major(START));
    assert_eq!(h.store.entry_count().await, 0);
}

#[tokio::test]
async fn test_non_positive_amount_rejected() {
    let h = TestHarness::new().await;
    for amount in [Money::ZERO, Money::from_major(-5)] {
        let err = h
            .service
            .transfer(cmd(&h.alice, "bob@example.com", amount, None))
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::InvalidAmount);
    }
    assert_eq!(h.store.entry_count().await, 0);
}

#[tokio::test]
async fn test_unknown_recipient() {
    let h = TestHarness::new().await;
    let err = h
        .service
        .transfer(cmd(&h.alice, "nobody@example.com", Money::from_major(1), None))
        .await
        .unwrap_err();
    assert_eq!(err, TransferError::RecipientNotFound);
}

#[tokio::test]
async fn test_amount_checked_before_recipient() {
    let h = TestHarness::new().await;
    let err = h
        .service
        .transfer(cmd(&h.alice, "nobody@example.com", Money::ZERO, None))
        .await
        .unwrap_err();
    assert_eq!(err, TransferError::InvalidAmount);
}

#[tokio::test]
async fn test_self_transfer_rejected() {
    let h = TestHarness::new().await;
    let err = h
        .service
        .transfer(cmd(&h.alice, "alice@example.com", Money::from_major(1), None))
        .await
        .unwrap_err();
    assert_eq!(err, TransferError::SelfTransfer);
}

#[tokio::test]
async fn test_self_transfer_via_email_alias_rejected() {
    let h = TestHarness::new().await;
    for alias in ["ALICE@example.com", " Alice@Example.Com", "alice@EXAMPLE.COM  "] {
        let err = h
            .service
            .transfer(cmd(&h.alice, alias, Money::from_major(1), None))
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::SelfTransfer, "alias {alias:?}");
    }
    assert_eq!(h.balance(&h.alice).await, Money::from_major(START));
    assert_eq!(h.store.entry_count().await, 0);
}

#[tokio::test]
async fn test_unknown_sender_is_internal() {
    let h = TestHarness::new().await;
    let mut command = cmd(&h.alice, "bob@example.com", Money::from_major(1), None);
    command.sender_id = 9999;
    let err = h.service.transfer(command).await.unwrap_err();
    assert_eq!(err, TransferError::SenderNotFound(9999));
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn test_failure_after_staging_rolls_back() {
    let h = TestHarness::new().await;
    let faulty = FaultyStore {
        inner: h.store.clone(),
        blind_ledger: false,
        fail_credit: true,
    };
    let service = TransferService::new(Arc::new(faulty));

    let err = service
        .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(200), Some("k1")))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Internal(_)));
    assert_eq!(h.balance(&h.alice).await, Money::from_major(START));
    assert_eq!(h.balance(&h.bob).await, Money::from_major(START));
    assert_eq!(h.store.entry_count().await, 0);
}

// ============================================================================
// Idempotency
// ============================================================================

#[tokio::test]
async fn test_replay_with_same_key_applies_once() {
    let h = TestHarness::new().await;

    let first = h
        .service
        .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(200), Some("abc")))
        .await
        .unwrap();
    let second = h
        .service
        .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(200), Some("abc")))
        .await
        .unwrap();

    assert!(!first.is_replay());
    assert!(second.is_replay());
    assert_eq!(first.transfer_id(), second.transfer_id());
    assert_eq!(h.balance(&h.alice).await, Money::from_major(800));
    assert_eq!(h.balance(&h.bob).await, Money::from_major(1200));
    assert_eq!(h.store.entry_count().await, 2);
}

#[tokio::test]
async fn test_replay_precedes_validation() {
    let h = TestHarness::new().await;
    h.service
        .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(200), Some("abc")))
        .await
        .unwrap();

    // A retried request never fails on anything once its key is recorded
    let outcome = h
        .service
        .transfer(cmd(&h.alice, "nobody@example.com", Money::ZERO, Some("abc")))
        .await
        .unwrap();
    assert!(outcome.is_replay());
}

#[tokio::test]
async fn test_requests_without_key_are_not_deduplicated() {
    let h = TestHarness::new().await;
    for _ in 0..2 {
        h.service
            .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(100), None))
            .await
            .unwrap();
    }
    assert_eq!(h.balance(&h.alice).await, Money::from_major(800));
    assert_eq!(h.store.entry_count().await, 4);
}

#[tokio::test]
async fn test_rejected_request_does_not_burn_key() {
    let h = TestHarness::new().await;
    let err = h
        .service
        .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(5000), Some("k")))
        .await
        .unwrap_err();
    assert_eq!(err, TransferError::InsufficientBalance);

    let outcome = h
        .service
        .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(50), Some("k")))
        .await
        .unwrap();
    assert!(!outcome.is_replay());
    assert_eq!(h.balance(&h.alice).await, Money::from_major(950));
}

#[tokio::test]
async fn test_uniqueness_violation_maps_to_replay() {
    let h = TestHarness::new().await;
    let blind = TransferService::new(Arc::new(FaultyStore {
        inner: h.store.clone(),
        blind_ledger: true,
        fail_credit: false,
    }));

    let first = blind
        .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(200), Some("race")))
        .await
        .unwrap();
    assert!(!first.is_replay());

    // Pre-check sees nothing; the insert hits the constraint
    let second = blind
        .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(200), Some("race")))
        .await
        .unwrap();

    assert!(matches!(second, TransferOutcome::Replayed { .. }));
    assert_eq!(h.balance(&h.alice).await, Money::from_major(800));
    assert_eq!(h.balance(&h.bob).await, Money::from_major(1200));
    assert_eq!(h.store.entry_count().await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_apply_once() {
    let h = TestHarness::new().await;

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let service = h.service.clone();
        let command = cmd(&h.alice, "bob@example.com", Money::from_major(100), Some("dup"));
        tasks.push(tokio::spawn(async move { service.transfer(command).await }));
    }

    let mut committed = 0;
    for task in tasks {
        if !task.await.unwrap().unwrap().is_replay() {
            committed += 1;
        }
    }

    assert_eq!(committed, 1);
    assert_eq!(h.balance(&h.alice).await, Money::from_major(900));
    assert_eq!(h.store.entry_count().await, 2);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_lock_order_is_direction_independent() {
    assert_eq!(lock_order(7, 3), (3, 7));
    assert_eq!(lock_order(3, 7), (3, 7));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_overdraw() {
    let h = TestHarness::new().await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let service = h.service.clone();
        let command = cmd(&h.alice, "bob@example.com", Money::from_major(100), None);
        tasks.push(tokio::spawn(async move { service.transfer(command).await }));
    }

    let mut ok = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(TransferError::InsufficientBalance) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(ok, 10);
    assert_eq!(rejected, 10);
    assert_eq!(h.balance(&h.alice).await, Money::ZERO);
    assert_eq!(h.balance(&h.bob).await, Money::from_major(2 * START));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_transfers_do_not_deadlock() {
    let h = TestHarness::new().await;

    let mut tasks = Vec::new();
    for i in 0..100 {
        let service = h.service.clone();
        let command = if i % 2 == 0 {
            cmd(&h.alice, "bob@example.com", Money::from_major(3), None)
        } else {
            cmd(&h.bob, "alice@example.com", Money::from_major(3), None)
        };
        tasks.push(tokio::spawn(async move { service.transfer(command).await }));
    }

    let all = async {
        for task in tasks {
            task.await.unwrap().unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(10), all)
        .await
        .expect("transfers deadlocked");

    assert_eq!(h.balance(&h.alice).await, Money::from_major(START));
    assert_eq!(h.balance(&h.bob).await, Money::from_major(START));
    assert_eq!(h.store.total_balance(), Money::from_major(2 * START));
    assert_eq!(h.store.entry_count().await, 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_conservation_across_many_wallets() {
    let h = TestHarness::new().await;
    let carol = register(&h.store, "carol@example.com").await;
    let users = [h.alice.clone(), h.bob.clone(), carol];
    let emails = ["alice@example.com", "bob@example.com", "carol@example.com"];

    let mut tasks = Vec::new();
    for i in 0..60usize {
        let service = h.service.clone();
        let sender = &users[i % 3];
        let recipient = emails[(i + 1 + i / 3 % 2) % 3];
        let command = cmd(sender, recipient, Money::from_minor_units(1 + i as i64 * 37), None);
        tasks.push(tokio::spawn(async move { service.transfer(command).await }));
    }
    for task in tasks {
        let _ = task.await.unwrap();
    }

    assert_eq!(h.store.total_balance(), Money::from_major(3 * START));
    let entries = h.store.entry_count().await;
    assert_eq!(entries % 2, 0);
}

// ============================================================================
// Wallet overview
// ============================================================================

#[tokio::test]
async fn test_wallet_overview_newest_first_and_limited() {
    let h = TestHarness::new().await;
    for i in 1..=5 {
        h.service
            .transfer(cmd(&h.alice, "bob@example.com", Money::from_major(i), None))
            .await
            .unwrap();
    }

    let overview = h.service.wallet_overview(h.alice.user_id, 3).await.unwrap();
    assert_eq!(overview.wallet.balance, Money::from_major(START - 15));
    let amounts: Vec<_> = overview.transactions.iter().map(|e| e.amount).collect();
    assert_eq!(
        amounts,
        vec![Money::from_major(5), Money::from_major(4), Money::from_major(3)]
    );
}

#[tokio::test]
async fn test_wallet_overview_empty_history() {
    let h = TestHarness::new().await;
    let overview = h.service.wallet_overview(h.bob.user_id, 50).await.unwrap();
    assert_eq!(overview.wallet.balance, Money::from_major(START));
    assert!(overview.transactions.is_empty());
}
