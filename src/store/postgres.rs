//! PostgreSQL account store.

use super::{AccountStore, LedgerTx};
use crate::account::{Account, AccountId, NewAccount};
use crate::error::LedgerError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Row, Transaction};
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id         BIGSERIAL PRIMARY KEY,
    name       TEXT NOT NULL,
    email      TEXT NOT NULL UNIQUE,
    balance    NUMERIC NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// Account store backed by a PostgreSQL connection pool.
///
/// The composition root owns the lifecycle: [`connect`](Self::connect) at
/// startup, [`close`](Self::close) at shutdown. Row locks come from
/// `SELECT ... FOR UPDATE` and are released when the transaction ends.
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Creates a new connection pool.
    pub async fn connect(database_url: &str) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(LedgerError::StoreUnavailable)?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Creates the `accounts` table if it does not exist.
    pub async fn init_schema(&self) -> Result<(), LedgerError> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_store_err)?;
        Ok(())
    }

    /// Empties the ledger and restarts id assignment. Demo and test reset.
    pub async fn truncate_all(&self) -> Result<(), LedgerError> {
        sqlx::query("TRUNCATE accounts RESTART IDENTITY")
            .execute(&self.pool)
            .await
            .map_err(map_store_err)?;
        Ok(())
    }

    /// Checks store connectivity.
    pub async fn health_check(&self) -> Result<(), LedgerError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_store_err)?;
        Ok(())
    }

    /// Drains the pool. Called once at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, new: NewAccount) -> Result<Account, LedgerError> {
        sqlx::query_as::<_, Account>(
            r#"INSERT INTO accounts (name, email, balance)
               VALUES ($1, $2, $3)
               RETURNING id, name, email, balance, created_at"#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.balance)
        .fetch_one(&self.pool)
        .await
        .map_err(map_store_err)
    }

    async fn get_by_id(&self, id: AccountId) -> Result<Account, LedgerError> {
        sqlx::query_as::<_, Account>(
            r#"SELECT id, name, email, balance, created_at
               FROM accounts WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_err)?
        .ok_or(LedgerError::NotFound(id))
    }

    async fn list_all(&self) -> Result<Vec<Account>, LedgerError> {
        sqlx::query_as::<_, Account>(
            r#"SELECT id, name, email, balance, created_at
               FROM accounts ORDER BY id ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_store_err)
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        let tx = self.pool.begin().await.map_err(map_store_err)?;
        Ok(Box::new(PgLedgerTx { tx }))
    }
}

/// One open PostgreSQL transaction. sqlx rolls it back on drop unless
/// committed, which covers early-return and cancellation paths.
struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_balance(&mut self, id: AccountId) -> Result<Decimal, LedgerError> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_store_err)?;

        row.map(|r| r.get::<Decimal, _>("balance"))
            .ok_or(LedgerError::NotFound(id))
    }

    async fn update_balance(&mut self, id: AccountId, delta: Decimal) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE id = $2")
            .bind(delta)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_store_err)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.commit().await.map_err(map_store_err)
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.rollback().await.map_err(map_store_err)
    }
}

/// Maps a driver error onto the ledger taxonomy by SQLSTATE.
///
/// 23xxx integrity violations become `ConstraintViolation`; deadlocks
/// (40P01), serialization failures (40001) and lock timeouts (55P03) become
/// the retryable `LockConflict`; everything else is `StoreUnavailable`.
fn map_store_err(err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") | Some("23502") | Some("23514") => {
                LedgerError::ConstraintViolation(db.message().to_string())
            }
            Some("40P01") | Some("40001") | Some("55P03") => {
                LedgerError::LockConflict(db.message().to_string())
            }
            _ => LedgerError::StoreUnavailable(sqlx::Error::Database(db)),
        },
        other => LedgerError::StoreUnavailable(other),
    }
}
