//! Read-only ledger projections.

use crate::account::{Account, AccountId};
use crate::error::LedgerError;
use crate::store::AccountStore;
use std::sync::Arc;

/// Reporting over the account store for display and audit.
///
/// Takes no locks and opens no transaction; reads observe the most recently
/// committed state at the store's isolation level.
pub struct LedgerQueryService<S> {
    store: Arc<S>,
}

impl<S> Clone for LedgerQueryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: AccountStore> LedgerQueryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All accounts in ascending id order.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.store.list_all().await
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store.get_by_id(id).await
    }
}
