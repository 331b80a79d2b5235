//! Error taxonomy for ledger operations.

use crate::account::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Failures surfaced by the account store and the transfer engine.
///
/// Every failure rolls back the enclosing transaction before it reaches the
/// caller; no partial mutation survives. Only [`LedgerError::LockConflict`]
/// is worth retrying, and the core never retries on its own.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Connectivity or setup failure talking to the backing store.
    #[error("account store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    #[error("account {0} not found")]
    NotFound(AccountId),

    /// Rejected before any transaction is opened.
    #[error("invalid transfer: {0}")]
    InvalidTransfer(&'static str),

    /// Expected business outcome, not a system fault.
    #[error("insufficient funds: account {account} holds {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    /// Store-level integrity failure, e.g. duplicate email on insert.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The store aborted this side of a lock conflict or deadlock.
    #[error("lock conflict: {0}")]
    LockConflict(String),
}

impl LedgerError {
    /// Whether the caller may reasonably retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::LockConflict(_))
    }
}
