//! Account data model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Store-assigned account identifier. Immutable after insert.
pub type AccountId = i64;

/// One ledger participant.
///
/// Only `balance` mutates after creation, and only through the transfer
/// engine's debit/credit pair. A committed balance is never negative.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; the store assigns the id and creation timestamp.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    /// Opening balance, set once by the seeding process.
    pub balance: Decimal,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, email: impl Into<String>, balance: Decimal) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            balance,
        }
    }
}
