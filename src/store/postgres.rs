//! PostgreSQL storage backend
//!
//! Schema lives in `migrations/`. Row locks come from `SELECT ... FOR UPDATE`
//! inside the unit-of-work transaction; de-duplication comes from the
//! `ledger_entries_idempotency_key` unique constraint.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::{IdentityStore, LedgerStore, Store, StoreError, UnitOfWork, WalletStore};
use crate::core_types::{UserId, WalletId};
use crate::models::{IdempotencyKey, LedgerEntry, NewLedgerEntry, NewUser, User, Wallet};
use crate::money::Money;

/// Constraint names declared in `migrations/0001_wallet_schema.sql`
pub mod constraints {
    pub const USERS_EMAIL: &str = "users_email_key";
    pub const LEDGER_IDEMPOTENCY_KEY: &str = "ledger_entries_idempotency_key";
    pub const WALLETS_BALANCE_NON_NEGATIVE: &str = "wallets_balance_non_negative";
}

const USER_COLUMNS: &str = "user_id, email, password_hash, created_at";
const WALLET_COLUMNS: &str = "wallet_id, user_id, balance, created_at, updated_at";
const ENTRY_COLUMNS: &str = "entry_id, transfer_id, wallet_id, entry_type, amount, \
                             related_user_id, notes, idempotency_key, created_at";

/// Translate constraint violations into their domain meaning
fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.constraint() {
            Some(constraints::USERS_EMAIL) if db_err.is_unique_violation() => {
                return StoreError::DuplicateEmail;
            }
            Some(constraints::LEDGER_IDEMPOTENCY_KEY) if db_err.is_unique_violation() => {
                return StoreError::DuplicateIdempotencyKey;
            }
            Some(constraints::WALLETS_BALANCE_NON_NEGATIVE) if db_err.is_check_violation() => {
                return StoreError::NegativeBalance(0);
            }
            _ => {}
        }
    }
    StoreError::Database(e)
}

fn row_to_user(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_wallet(row: &PgRow) -> Result<Wallet, StoreError> {
    Ok(Wallet {
        wallet_id: row.try_get("wallet_id")?,
        user_id: row.try_get("user_id")?,
        balance: Money::from_minor_units(row.try_get("balance")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_entry(row: &PgRow) -> Result<LedgerEntry, StoreError> {
    let transfer_id: String = row.try_get("transfer_id")?;
    let entry_type: String = row.try_get("entry_type")?;
    let idempotency_key: Option<String> = row.try_get("idempotency_key")?;

    Ok(LedgerEntry {
        id: row.try_get("entry_id")?,
        transfer_id: transfer_id
            .parse()
            .map_err(|e| StoreError::Backend(format!("bad transfer_id {transfer_id}: {e}")))?,
        wallet_id: row.try_get("wallet_id")?,
        entry_type: entry_type.parse().map_err(StoreError::Backend)?,
        amount: Money::from_minor_units(row.try_get("amount")?),
        related_user_id: row.try_get("related_user_id")?,
        notes: row.try_get("notes")?,
        idempotency_key: idempotency_key.as_deref().and_then(IdempotencyKey::new),
        created_at: row.try_get("created_at")?,
    })
}

/// sqlx-backed store sharing one connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn user_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1 AND deleted_at IS NULL"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn create_user_with_wallet(
        &self,
        new_user: NewUser,
        initial_balance: Money,
    ) -> Result<(User, Wallet), StoreError> {
        let mut tx = self.pool.begin().await?;

        let user_row = sqlx::query(&format!(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;
        let user = row_to_user(&user_row)?;

        let wallet_row = sqlx::query(&format!(
            "INSERT INTO wallets (user_id, balance) VALUES ($1, $2) RETURNING {WALLET_COLUMNS}"
        ))
        .bind(user.user_id)
        .bind(initial_balance.minor_units())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;
        let wallet = row_to_wallet(&wallet_row)?;

        tx.commit().await?;
        Ok((user, wallet))
    }
}

#[async_trait]
impl WalletStore for PgStore {
    async fn wallet_by_user(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1 AND deleted_at IS NULL"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_wallet).transpose()
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn entry_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries
             WHERE idempotency_key = $1 AND entry_type = 'debit' AND deleted_at IS NULL"
        ))
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_entry).transpose()
    }

    async fn recent_entries(
        &self,
        wallet_id: WalletId,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries
             WHERE wallet_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC, entry_id DESC
             LIMIT $2"
        ))
        .bind(wallet_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One database transaction. Dropping it without commit rolls back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_wallet(&mut self, wallet_id: WalletId) -> Result<Wallet, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets
             WHERE wallet_id = $1 AND deleted_at IS NULL
             FOR UPDATE"
        ))
        .bind(wallet_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::NotFound("wallet"))?;

        row_to_wallet(&row)
    }

    async fn set_balance(&mut self, wallet_id: WalletId, balance: Money) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE wallets SET balance = $1, updated_at = NOW() WHERE wallet_id = $2",
        )
        .bind(balance.minor_units())
        .bind(wallet_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match map_db_error(e) {
            StoreError::NegativeBalance(_) => StoreError::NegativeBalance(wallet_id),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("wallet"));
        }
        Ok(())
    }

    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (transfer_id, wallet_id, entry_type, amount, related_user_id, notes, idempotency_key)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.transfer_id.to_string())
        .bind(entry.wallet_id)
        .bind(entry.entry_type.as_str())
        .bind(entry.amount.minor_units())
        .bind(entry.related_user_id)
        .bind(&entry.notes)
        .bind(entry.idempotency_key.as_ref().map(|k| k.as_str()))
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_db_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
