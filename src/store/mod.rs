//! Account persistence.
//!
//! The store is an injected capability: the transfer engine and the query
//! service receive an [`AccountStore`] and never reach for a global handle.
//! Two implementations ship with the crate:
//!
//! - [`PgAccountStore`] - PostgreSQL, row locks via `SELECT ... FOR UPDATE`
//! - [`MemoryStore`] - in-process store with the same locking semantics,
//!   used by tests and demos that run without a database

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgAccountStore;

use crate::account::{Account, AccountId, NewAccount};
use crate::error::LedgerError;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Durable persistence for account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a new account and returns it with the store-assigned id.
    ///
    /// Fails with [`LedgerError::ConstraintViolation`] if the email is
    /// already taken.
    async fn insert(&self, new: NewAccount) -> Result<Account, LedgerError>;

    /// Point lookup. Fails with [`LedgerError::NotFound`] if absent.
    async fn get_by_id(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// All accounts in ascending id order. An empty ledger is a valid state.
    async fn list_all(&self) -> Result<Vec<Account>, LedgerError>;

    /// Opens a transaction scoped to one transfer attempt.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError>;
}

/// One open store transaction.
///
/// Dropping an uncommitted transaction rolls it back and releases every row
/// lock it holds, so every exit path of the caller resolves the transaction.
#[async_trait]
pub trait LedgerTx: Send {
    /// Acquires an exclusive lock on the account's row, held until the
    /// transaction ends, and returns the balance read under that lock.
    /// Blocks while another transaction holds the same row.
    async fn lock_balance(&mut self, id: AccountId) -> Result<Decimal, LedgerError>;

    /// Applies a signed delta to the account's balance.
    ///
    /// Performs no funds check; callers must have validated funds under a
    /// row lock taken in this same transaction.
    async fn update_balance(&mut self, id: AccountId, delta: Decimal) -> Result<(), LedgerError>;

    /// Makes every mutation in this transaction visible atomically.
    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    /// Discards every mutation in this transaction.
    async fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}
