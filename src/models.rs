//! Domain records: users, wallets and ledger entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::{EntryId, TransferId, UserId, WalletId};
use crate::money::Money;

/// Normalize an email for storage and lookup.
///
/// Emails are compared case-insensitively everywhere, so `A@X.com` and
/// `a@x.com` resolve to the same identity.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ============================================================================
// User
// ============================================================================

/// Registered identity. Owns exactly one wallet.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub email: String,
    /// PHC-format argon2 hash, never serialized
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a user
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    #[schema(example = 1)]
    pub id: UserId,
    #[schema(example = "user1@example.com")]
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.user_id,
            email: user.email.clone(),
        }
    }
}

/// Input for atomic user + wallet creation
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}

// ============================================================================
// Wallet
// ============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Wallet {
    pub wallet_id: WalletId,
    pub user_id: UserId,
    #[schema(value_type = String, example = "1000.00")]
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Ledger
// ============================================================================

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Debit => "debit",
            EntryType::Credit => "credit",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(EntryType::Debit),
            "credit" => Ok(EntryType::Credit),
            other => Err(format!("unknown entry type: {other}")),
        }
    }
}

/// Caller-supplied idempotency key (`Idempotency-Key` header).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

/// Upper bound matching the `VARCHAR(255)` width callers were promised
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

impl IdempotencyKey {
    /// Returns `None` for blank keys; blank means "no key supplied".
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_IDEMPOTENCY_KEY_LEN {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable record of one side of a committed transfer.
///
/// Uniqueness is on `(idempotency_key, entry_type)`: the debit and the credit
/// of one transfer share the caller's key and are told apart by direction.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LedgerEntry {
    pub id: EntryId,
    #[schema(value_type = String)]
    pub transfer_id: TransferId,
    pub wallet_id: WalletId,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[schema(value_type = String, example = "200.00")]
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_user_id: Option<UserId>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(skip)]
    pub idempotency_key: Option<IdempotencyKey>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Signed effect on the owning wallet's balance
    pub fn signed_amount(&self) -> Money {
        match self.entry_type {
            EntryType::Debit => -self.amount,
            EntryType::Credit => self.amount,
        }
    }
}

/// Ledger entry staged inside a unit of work
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub transfer_id: TransferId,
    pub wallet_id: WalletId,
    pub entry_type: EntryType,
    pub amount: Money,
    pub related_user_id: Option<UserId>,
    pub notes: String,
    pub idempotency_key: Option<IdempotencyKey>,
}
