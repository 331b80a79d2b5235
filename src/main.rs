//! Demo composition root.
//!
//! Connects to PostgreSQL, reseeds the ledger, and walks through a
//! successful transfer followed by one that must fail, printing the
//! committed state after every step.

use std::sync::Arc;

use balance_ledger::config::AppConfig;
use balance_ledger::{
    AccountStore, LedgerQueryService, NewAccount, PgAccountStore, TransferEngine, logging,
};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().expect("literal decimal")
}

async fn print_accounts<S: AccountStore>(query: &LedgerQueryService<S>) -> anyhow::Result<()> {
    let accounts = query.list_accounts().await?;
    println!("--- Current accounts ---");
    if accounts.is_empty() {
        println!("(empty)");
    }
    for a in &accounts {
        println!(
            "  [{}] {} <{}> balance {:.2}",
            a.id, a.name, a.email, a.balance
        );
    }
    println!("------------------------");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::args().nth(1).unwrap_or_else(|| "default".into());
    let config = AppConfig::load(&env);
    let _log_guard = logging::init_logging(&config);

    let store = Arc::new(PgAccountStore::connect(&config.postgres_url).await?);
    store.health_check().await?;
    store.init_schema().await?;
    store.truncate_all().await?;
    tracing::info!("ledger reset for demo run");

    let alice = store
        .insert(NewAccount::new("Alice", "alice@example.com", dec("1000.00")))
        .await?;
    let bob = store
        .insert(NewAccount::new("Bob", "bob@example.com", dec("500.00")))
        .await?;

    let engine = TransferEngine::new(store.clone());
    let query = LedgerQueryService::new(store.clone());
    print_accounts(&query).await?;

    println!(
        "\nTransferring 150.50 from {} to {}...",
        alice.name, bob.name
    );
    engine.transfer(alice.id, bob.id, dec("150.50")).await?;
    println!("Transfer successful");
    print_accounts(&query).await?;

    println!(
        "\nAttempting to transfer 10000.00 from {} to {}...",
        bob.name, alice.name
    );
    match engine.transfer(bob.id, alice.id, dec("10000.00")).await {
        Ok(()) => anyhow::bail!("transfer succeeded but should not have"),
        Err(err) => println!("Transfer failed (as expected): {}", err),
    }
    print_accounts(&query).await?;

    store.close().await;
    Ok(())
}
