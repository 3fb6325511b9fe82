//! Status enums for ledger entries and orders.
//!
//! Both enums are stored as `TEXT` columns (with a `CHECK` constraint in the
//! schema), so `Display` and `FromStr` define the canonical database encoding.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a wallet ledger entry.
///
/// Entry amounts are always positive; the kind says which way the money
/// moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Funds left the wallet.
    Debit,
    /// Funds entered the wallet.
    Credit,
}

impl EntryKind {
    /// The amount as a signed delta to apply to a balance.
    #[must_use]
    pub fn signed_amount(self, amount: Decimal) -> Decimal {
        match self {
            Self::Debit => -amount,
            Self::Credit => amount,
        }
    }
}

impl core::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Debit => f.write_str("DEBIT"),
            Self::Credit => f.write_str("CREDIT"),
        }
    }
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBIT" => Ok(Self::Debit),
            "CREDIT" => Ok(Self::Credit),
            _ => Err(format!("invalid entry kind: {s}")),
        }
    }
}

/// Lifecycle status of an order.
///
/// Checkout only ever creates `Confirmed` orders today; `Pending` and
/// `Cancelled` exist for payment-provider and support flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Confirmed => f.write_str("CONFIRMED"),
            Self::Cancelled => f.write_str("CANCELLED"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
