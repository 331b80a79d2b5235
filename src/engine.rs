//! Atomic balance transfers.
//!
//! The sole write path that reasons about concurrency. Everything else in
//! the crate is plumbing around this module.

use crate::account::AccountId;
use crate::error::LedgerError;
use crate::store::AccountStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// Executes one atomic transfer per call against an injected store.
///
/// # Contract
///
/// On success the sender's balance decreases by `amount`, the receiver's
/// increases by `amount`, and both writes become visible atomically. On any
/// failure the balances are exactly what they were before the call. The
/// engine never retries; [`LedgerError::is_retryable`] tells the caller
/// whether a retry makes sense.
///
/// # Locking
///
/// Both rows are locked before either balance is read, always in ascending
/// id order. The fixed order means two mirror-direction transfers (A to B
/// concurrently with B to A) queue on the same first lock instead of
/// deadlocking on each other.
pub struct TransferEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for TransferEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: AccountStore> TransferEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Moves `amount` from account `from` to account `to` as one unit.
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        // Both checks happen before any transaction is opened.
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidTransfer("amount must be positive"));
        }
        if from == to {
            return Err(LedgerError::InvalidTransfer(
                "source and destination are the same account",
            ));
        }

        // Any `?` below drops the transaction, which rolls it back.
        let mut tx = self.store.begin().await?;

        let (first, second) = if from < to { (from, to) } else { (to, from) };
        let first_balance = tx.lock_balance(first).await?;
        let second_balance = tx.lock_balance(second).await?;
        let sender_balance = if from == first {
            first_balance
        } else {
            second_balance
        };

        if sender_balance < amount {
            debug!(from, to, %amount, %sender_balance, "transfer rejected: insufficient funds");
            if let Err(err) = tx.rollback().await {
                debug!(error = %err, "rollback after funds check failed");
            }
            return Err(LedgerError::InsufficientFunds {
                account: from,
                balance: sender_balance,
                requested: amount,
            });
        }

        tx.update_balance(from, -amount).await?;
        tx.update_balance(to, amount).await?;
        tx.commit().await?;

        info!(from, to, %amount, "transfer committed");
        Ok(())
    }
}
