//! In-process account store.
//!
//! Models the relational store's concurrency contract without a database:
//! one async mutex per row plays the part of the row lock, held from
//! `lock_balance` until the transaction ends, and balance deltas are
//! journaled and applied atomically on commit. Tests and demos use this
//! store to exercise the transfer engine's locking behavior for real.

use super::{AccountStore, LedgerTx};
use crate::account::{Account, AccountId, NewAccount};
use crate::error::LedgerError;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
struct Shared {
    accounts: BTreeMap<AccountId, Entry>,
    next_id: AccountId,
}

struct Entry {
    account: Account,
    /// Row lock: exclusive access until the holding transaction ends.
    lock: Arc<tokio::sync::Mutex<()>>,
}

/// In-memory [`AccountStore`] with row-lock semantics.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn locked(shared: &Mutex<Shared>) -> std::sync::MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert(&self, new: NewAccount) -> Result<Account, LedgerError> {
        let mut shared = locked(&self.shared);

        if shared
            .accounts
            .values()
            .any(|e| e.account.email == new.email)
        {
            return Err(LedgerError::ConstraintViolation(format!(
                "duplicate email: {}",
                new.email
            )));
        }

        shared.next_id += 1;
        let account = Account {
            id: shared.next_id,
            name: new.name,
            email: new.email,
            balance: new.balance,
            created_at: Utc::now(),
        };
        shared.accounts.insert(
            account.id,
            Entry {
                account: account.clone(),
                lock: Arc::new(tokio::sync::Mutex::new(())),
            },
        );
        Ok(account)
    }

    async fn get_by_id(&self, id: AccountId) -> Result<Account, LedgerError> {
        locked(&self.shared)
            .accounts
            .get(&id)
            .map(|e| e.account.clone())
            .ok_or(LedgerError::NotFound(id))
    }

    async fn list_all(&self) -> Result<Vec<Account>, LedgerError> {
        // BTreeMap iterates in ascending id order.
        Ok(locked(&self.shared)
            .accounts
            .values()
            .map(|e| e.account.clone())
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        Ok(Box::new(MemoryTx {
            shared: Arc::clone(&self.shared),
            row_locks: HashMap::new(),
            journal: Vec::new(),
        }))
    }
}

/// One open in-memory transaction.
///
/// Dropping it discards the journal and releases the row locks, so an
/// abandoned transfer leaves the ledger untouched.
struct MemoryTx {
    shared: Arc<Mutex<Shared>>,
    row_locks: HashMap<AccountId, OwnedMutexGuard<()>>,
    journal: Vec<(AccountId, Decimal)>,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_balance(&mut self, id: AccountId) -> Result<Decimal, LedgerError> {
        // Clone the row's lock handle first; the state mutex must not be
        // held across the await below.
        let lock = {
            let shared = locked(&self.shared);
            let entry = shared.accounts.get(&id).ok_or(LedgerError::NotFound(id))?;
            Arc::clone(&entry.lock)
        };

        let guard = lock.lock_owned().await;
        self.row_locks.insert(id, guard);

        // Read after acquiring the lock: any concurrent transaction that
        // held this row has committed or rolled back by now.
        locked(&self.shared)
            .accounts
            .get(&id)
            .map(|e| e.account.balance)
            .ok_or(LedgerError::NotFound(id))
    }

    async fn update_balance(&mut self, id: AccountId, delta: Decimal) -> Result<(), LedgerError> {
        if !locked(&self.shared).accounts.contains_key(&id) {
            return Err(LedgerError::NotFound(id));
        }
        self.journal.push((id, delta));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let mut shared = locked(&self.shared);
        for (id, delta) in &self.journal {
            if let Some(entry) = shared.accounts.get_mut(id) {
                entry.account.balance += *delta;
            }
        }
        // Row locks release when `self` drops, after the journal applied.
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn acct(name: &str, email: &str, balance: &str) -> NewAccount {
        NewAccount::new(name, email, dec(balance))
    }

    #[tokio::test]
    async fn insert_assigns_ascending_ids() {
        let store = MemoryStore::new();
        let alice = store
            .insert(acct("Alice", "alice@example.com", "1000.00"))
            .await
            .unwrap();
        let bob = store
            .insert(acct("Bob", "bob@example.com", "500.00"))
            .await
            .unwrap();

        assert_eq!(alice.id, 1);
        assert_eq!(bob.id, 2);
        assert_eq!(alice.balance, dec("1000.00"));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store
            .insert(acct("Alice", "alice@example.com", "1000.00"))
            .await
            .unwrap();

        let err = store
            .insert(acct("Mallory", "alice@example.com", "0"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ConstraintViolation(_)));

        // The failed insert left a single account behind.
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_by_id_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_by_id(42).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(42)));
    }

    #[tokio::test]
    async fn list_all_is_ordered_and_empty_is_ok() {
        let store = MemoryStore::new();
        assert!(store.list_all().await.unwrap().is_empty());

        for (name, email) in [
            ("Carol", "carol@example.com"),
            ("Dave", "dave@example.com"),
            ("Erin", "erin@example.com"),
        ] {
            store.insert(acct(name, email, "10")).await.unwrap();
        }

        let ids: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back_and_releases_locks() {
        let store = MemoryStore::new();
        let alice = store
            .insert(acct("Alice", "alice@example.com", "1000.00"))
            .await
            .unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.lock_balance(alice.id).await.unwrap();
            tx.update_balance(alice.id, dec("-999")).await.unwrap();
            // Dropped without commit.
        }

        assert_eq!(
            store.get_by_id(alice.id).await.unwrap().balance,
            dec("1000.00")
        );

        // The row lock is free again.
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.lock_balance(alice.id).await.unwrap(), dec("1000.00"));
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn committed_deltas_are_applied_atomically() {
        let store = MemoryStore::new();
        let alice = store
            .insert(acct("Alice", "alice@example.com", "1000.00"))
            .await
            .unwrap();
        let bob = store
            .insert(acct("Bob", "bob@example.com", "500.00"))
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.lock_balance(alice.id).await.unwrap();
        tx.lock_balance(bob.id).await.unwrap();
        tx.update_balance(alice.id, dec("-150.50")).await.unwrap();
        tx.update_balance(bob.id, dec("150.50")).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            store.get_by_id(alice.id).await.unwrap().balance,
            dec("849.50")
        );
        assert_eq!(store.get_by_id(bob.id).await.unwrap().balance, dec("650.50"));
    }

    #[tokio::test]
    async fn lock_blocks_second_transaction_until_commit() {
        let store = MemoryStore::new();
        let alice = store
            .insert(acct("Alice", "alice@example.com", "100"))
            .await
            .unwrap();

        let mut first = store.begin().await.unwrap();
        first.lock_balance(alice.id).await.unwrap();
        first.update_balance(alice.id, dec("-40")).await.unwrap();

        let store2 = store.clone();
        let id = alice.id;
        let waiter = tokio::spawn(async move {
            let mut tx = store2.begin().await.unwrap();
            let seen = tx.lock_balance(id).await.unwrap();
            tx.rollback().await.unwrap();
            seen
        });

        // Give the second transaction a chance to park on the row lock.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        first.commit().await.unwrap();
        assert_eq!(waiter.await.unwrap(), dec("60"));
    }
}
