//! balance-ledger - atomic balance transfers over a durable account ledger.
//!
//! The transfer engine is the only component with a correctness contract:
//! money is never created, destroyed, or left inconsistent under concurrency
//! or partial failure. Persistence is an injected capability so the engine
//! can run against PostgreSQL in production and an in-process store in tests.
//!
//! # Modules
//!
//! - [`account`] - account record and insert payload
//! - [`store`] - [`AccountStore`]/[`LedgerTx`] traits, PostgreSQL and
//!   in-memory implementations
//! - [`engine`] - [`TransferEngine`], the atomic transfer path
//! - [`query`] - [`LedgerQueryService`], read-only projections
//! - [`error`] - [`LedgerError`] taxonomy
//! - [`config`] / [`logging`] - composition-root plumbing

pub mod account;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod query;
pub mod store;

// Convenient re-exports at crate root
pub use account::{Account, AccountId, NewAccount};
pub use engine::TransferEngine;
pub use error::LedgerError;
pub use query::LedgerQueryService;
pub use store::{AccountStore, LedgerTx, MemoryStore, PgAccountStore};
