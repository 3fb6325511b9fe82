//! Wallet and ledger entry models.
//!
//! The wallet's `balance` column is a denormalized running total; the ledger
//! is the authoritative record. Every balance change writes a ledger entry in
//! the same unit of work, so `balance` always equals the sum of signed entry
//! amounts.

use chrono::{DateTime, Utc};
use copperleaf_core::{CurrencyCode, EntryId, EntryKind, OrderId, UserId, WalletId};
use rust_decimal::Decimal;
use serde::Serialize;

/// A user's wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    /// Current balance; never negative.
    pub balance: Decimal,
    pub currency: CurrencyCode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable row of the wallet ledger.
///
/// `amount` is always positive; [`EntryKind`] carries the direction.
/// `balance_before` and `balance_after` are captured at write time so the
/// history reads as a statement without replaying entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub wallet_id: WalletId,
    pub user_id: UserId,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    /// Human-readable reason, e.g. "Wallet top-up" or "Order purchase".
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<RelatedEntity>,
    pub created_at: DateTime<Utc>,
}

/// Reference from a ledger entry to the entity that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedEntity {
    pub entity_type: String,
    pub entity_id: String,
}

impl RelatedEntity {
    /// Reference to an order (used by checkout debits).
    #[must_use]
    pub fn order(id: OrderId) -> Self {
        Self {
            entity_type: "order".to_owned(),
            entity_id: id.to_string(),
        }
    }
}

/// Parameters for appending a ledger entry.
///
/// The store computes `balance_before`/`balance_after` from the locked
/// wallet row when the entry is applied.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub wallet_id: WalletId,
    pub user_id: UserId,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub description: String,
    pub related: Option<RelatedEntity>,
}
