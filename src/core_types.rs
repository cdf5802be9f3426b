//! Core type definitions shared across the crate.
//!
//! Identifiers mirror the `BIGSERIAL` primary keys of the storage schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// User identifier (`users.user_id`)
pub type UserId = i64;

/// Wallet identifier (`wallets.wallet_id`)
pub type WalletId = i64;

/// Ledger entry identifier (`ledger_entries.entry_id`)
pub type EntryId = i64;

/// Identifier shared by the debit and credit entries of one logical transfer.
///
/// ULIDs sort by creation time, so the text form orders the ledger naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(Ulid);

impl TransferId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_id_text_roundtrip() {
        let id = TransferId::new();
        let parsed: TransferId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_transfer_id_rejects_garbage() {
        assert!("not-a-ulid".parse::<TransferId>().is_err());
    }
}
