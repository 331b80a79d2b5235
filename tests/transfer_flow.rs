//! End-to-end ledger flow over the in-memory store: seed two accounts,
//! run a successful transfer, then one that must fail, and audit the
//! committed state through the query service after every step.

use std::sync::Arc;

use balance_ledger::{
    AccountStore, LedgerError, LedgerQueryService, MemoryStore, NewAccount, TransferEngine,
};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[tokio::test]
async fn seed_transfer_and_audit() {
    let store = Arc::new(MemoryStore::new());
    let engine = TransferEngine::new(store.clone());
    let query = LedgerQueryService::new(store.clone());

    // Empty ledger is a valid state, not an error.
    assert!(query.list_accounts().await.unwrap().is_empty());

    let alice = store
        .insert(NewAccount::new("Alice", "alice@example.com", dec("1000.00")))
        .await
        .unwrap();
    let bob = store
        .insert(NewAccount::new("Bob", "bob@example.com", dec("500.00")))
        .await
        .unwrap();

    // Alice pays Bob 150.50.
    engine.transfer(alice.id, bob.id, dec("150.50")).await.unwrap();
    assert_eq!(query.get_account(alice.id).await.unwrap().balance, dec("849.50"));
    assert_eq!(query.get_account(bob.id).await.unwrap().balance, dec("650.50"));

    // Bob cannot pay out more than he holds; nothing moves.
    let err = engine
        .transfer(bob.id, alice.id, dec("10000.00"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert!(!err.is_retryable());
    assert_eq!(query.get_account(alice.id).await.unwrap().balance, dec("849.50"));
    assert_eq!(query.get_account(bob.id).await.unwrap().balance, dec("650.50"));

    // Listing is deterministic and conserves the seeded total.
    let accounts = query.list_accounts().await.unwrap();
    let ids: Vec<_> = accounts.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![alice.id, bob.id]);
    let total: Decimal = accounts.iter().map(|a| a.balance).sum();
    assert_eq!(total, dec("1500.00"));
}

#[tokio::test]
async fn rejected_transfers_touch_nothing() {
    let store = Arc::new(MemoryStore::new());
    let engine = TransferEngine::new(store.clone());
    let query = LedgerQueryService::new(store.clone());

    let alice = store
        .insert(NewAccount::new("Alice", "alice@example.com", dec("100.00")))
        .await
        .unwrap();

    // Validation failures happen before any transaction is opened.
    for (from, to, amount) in [
        (alice.id, alice.id, "10.00"),
        (alice.id, alice.id + 1, "0"),
        (alice.id, alice.id + 1, "-1"),
    ] {
        let err = engine.transfer(from, to, dec(amount)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransfer(_)));
    }

    // Unknown counterparty: surfaced, no mutation attempted.
    let err = engine.transfer(alice.id, 404, dec("10.00")).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(404)));

    assert_eq!(query.get_account(alice.id).await.unwrap().balance, dec("100.00"));
}
