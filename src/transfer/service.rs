//! Transfer Engine
//!
//! Moves value between two wallets as one unit of work. Steps, in order:
//!
//! 1. idempotency pre-check (keyed requests only)
//! 2. amount validation
//! 3. sender resolution
//! 4. recipient resolution by normalized email
//! 5. self-transfer check (by user id)
//! 6. lock both wallets in ascending wallet id order
//! 7. balance check against the locked sender row
//! 8. apply both balance deltas
//! 9. write the debit and the credit entry
//! 10. commit
//!
//! Any failure before commit rolls the unit of work back, so no partial
//! effect is ever visible. A uniqueness violation on the idempotency key
//! (a concurrent duplicate won the race) is reported as a replay, not an
//! error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::TransferError;
use super::types::{TransferCommand, TransferOutcome, TransferReceipt, WalletOverview};
use crate::core_types::{TransferId, UserId, WalletId};
use crate::models::{EntryType, IdempotencyKey, NewLedgerEntry, User, normalize_email};
use crate::store::{Store, StoreError, UnitOfWork};

/// Why a unit of work was abandoned before commit
enum Abort {
    Rejected(TransferError),
    Store(StoreError),
}

impl From<StoreError> for Abort {
    fn from(e: StoreError) -> Self {
        Abort::Store(e)
    }
}

/// Global lock order: lower wallet id first.
///
/// Two transfers touching the same pair of wallets always acquire the row
/// locks in the same sequence, whatever their direction.
pub fn lock_order(a: WalletId, b: WalletId) -> (WalletId, WalletId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Wallet reads and atomic transfers
#[derive(Clone)]
pub struct TransferService {
    store: Arc<dyn Store>,
}

impl TransferService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Caller's wallet plus its most recent ledger entries, newest first
    pub async fn wallet_overview(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<WalletOverview, TransferError> {
        let wallet = self
            .store
            .wallet_by_user(user_id)
            .await?
            .ok_or_else(|| TransferError::Internal(format!("user {user_id} has no wallet")))?;
        let transactions = self.store.recent_entries(wallet.wallet_id, limit).await?;
        Ok(WalletOverview {
            wallet,
            transactions,
        })
    }

    /// Execute a transfer from the authenticated caller.
    pub async fn transfer(&self, cmd: TransferCommand) -> Result<TransferOutcome, TransferError> {
        // 1. Idempotency pre-check
        if let Some(key) = &cmd.idempotency_key {
            if let Some(existing) = self.store.entry_by_idempotency_key(key).await? {
                info!(
                    idempotency_key = %key,
                    transfer_id = %existing.transfer_id,
                    "Transfer already processed, skipping"
                );
                return Ok(TransferOutcome::Replayed {
                    transfer_id: Some(existing.transfer_id),
                });
            }
        }

        // 2. Amount
        if !cmd.amount.is_positive() {
            return Err(TransferError::InvalidAmount);
        }

        // 3. Sender
        let sender = self
            .store
            .user_by_id(cmd.sender_id)
            .await?
            .ok_or(TransferError::SenderNotFound(cmd.sender_id))?;

        // 4. Recipient
        let recipient = self
            .store
            .user_by_email(&normalize_email(&cmd.recipient))
            .await?
            .ok_or(TransferError::RecipientNotFound)?;

        // 5. Self-transfer, by identity rather than by spelling
        if sender.user_id == recipient.user_id {
            return Err(TransferError::SelfTransfer);
        }

        let mut uow = self.store.begin().await?;
        match self.apply(uow.as_mut(), &sender, &recipient, &cmd).await {
            Ok(receipt) => match uow.commit().await {
                Ok(()) => {
                    info!(
                        transfer_id = %receipt.transfer_id,
                        sender_id = sender.user_id,
                        recipient_id = recipient.user_id,
                        amount = %receipt.amount,
                        "Transfer committed"
                    );
                    Ok(TransferOutcome::Committed(receipt))
                }
                Err(StoreError::DuplicateIdempotencyKey) => self.lost_race(&cmd).await,
                Err(e) => Err(e.into()),
            },
            Err(abort) => {
                if let Err(e) = uow.rollback().await {
                    warn!(error = %e, "Rollback failed");
                }
                match abort {
                    Abort::Rejected(e) => {
                        debug!(sender_id = sender.user_id, error = %e, "Transfer rejected");
                        Err(e)
                    }
                    Abort::Store(StoreError::DuplicateIdempotencyKey) => self.lost_race(&cmd).await,
                    Abort::Store(e) => Err(e.into()),
                }
            }
        }
    }

    /// Steps 6-9 inside an open unit of work
    async fn apply(
        &self,
        uow: &mut dyn UnitOfWork,
        sender: &User,
        recipient: &User,
        cmd: &TransferCommand,
    ) -> Result<TransferReceipt, Abort> {
        let sender_wallet_id = self.wallet_id_of(sender.user_id).await?;
        let recipient_wallet_id = self.wallet_id_of(recipient.user_id).await?;

        // 6. Lock in global order, then re-read balances under the locks
        let (first, second) = lock_order(sender_wallet_id, recipient_wallet_id);
        let first_row = uow.lock_wallet(first).await?;
        let second_row = uow.lock_wallet(second).await?;
        let (sender_wallet, recipient_wallet) = if first == sender_wallet_id {
            (first_row, second_row)
        } else {
            (second_row, first_row)
        };

        // 7. Balance
        if sender_wallet.balance < cmd.amount {
            return Err(Abort::Rejected(TransferError::InsufficientBalance));
        }

        // 8. Deltas
        let sender_balance = sender_wallet
            .balance
            .checked_sub(cmd.amount)
            .ok_or(Abort::Rejected(TransferError::InsufficientBalance))?;
        let recipient_balance = recipient_wallet
            .balance
            .checked_add(cmd.amount)
            .ok_or_else(|| {
                Abort::Store(StoreError::Backend(format!(
                    "balance overflow on wallet {recipient_wallet_id}"
                )))
            })?;
        uow.set_balance(sender_wallet_id, sender_balance).await?;
        uow.set_balance(recipient_wallet_id, recipient_balance)
            .await?;

        // 9. Entries: same transfer id and caller key, told apart by direction
        let transfer_id = TransferId::new();
        uow.append_entry(NewLedgerEntry {
            transfer_id,
            wallet_id: sender_wallet_id,
            entry_type: EntryType::Debit,
            amount: cmd.amount,
            related_user_id: Some(recipient.user_id),
            notes: cmd.notes.clone(),
            idempotency_key: cmd.idempotency_key.clone(),
        })
        .await?;
        uow.append_entry(NewLedgerEntry {
            transfer_id,
            wallet_id: recipient_wallet_id,
            entry_type: EntryType::Credit,
            amount: cmd.amount,
            related_user_id: Some(sender.user_id),
            notes: cmd.notes.clone(),
            idempotency_key: cmd.idempotency_key.clone(),
        })
        .await?;

        Ok(TransferReceipt {
            transfer_id,
            sender_wallet_id,
            recipient_wallet_id,
            amount: cmd.amount,
            sender_balance,
        })
    }

    async fn wallet_id_of(&self, user_id: UserId) -> Result<WalletId, Abort> {
        self.store
            .wallet_by_user(user_id)
            .await?
            .map(|w| w.wallet_id)
            .ok_or(Abort::Store(StoreError::NotFound("wallet")))
    }

    /// A concurrent request with the same key committed first.
    async fn lost_race(&self, cmd: &TransferCommand) -> Result<TransferOutcome, TransferError> {
        let transfer_id = match &cmd.idempotency_key {
            Some(key) => self.original_transfer(key).await,
            None => {
                // Unkeyed entries carry NULL keys and cannot collide
                return Err(TransferError::Internal(
                    "idempotency conflict without a key".to_string(),
                ));
            }
        };
        info!(
            sender_id = cmd.sender_id,
            transfer_id = ?transfer_id,
            "Concurrent duplicate transfer, treating as already processed"
        );
        Ok(TransferOutcome::Replayed { transfer_id })
    }

    async fn original_transfer(&self, key: &IdempotencyKey) -> Option<TransferId> {
        match self.store.entry_by_idempotency_key(key).await {
            Ok(entry) => entry.map(|e| e.transfer_id),
            Err(e) => {
                warn!(error = %e, "Failed to look up original transfer");
                None
            }
        }
    }
}
