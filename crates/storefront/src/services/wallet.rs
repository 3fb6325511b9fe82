//! Wallet service: balances, top-ups, and ledger-backed debits and credits.
//!
//! The balance column is a cache of the ledger sum. Every balance change goes
//! through [`crate::db::StoreUnit::apply_entry`], which moves the balance and
//! appends the entry together, so the two can never drift apart. The
//! sufficiency check for a debit and the balance mutation happen under the
//! same wallet row lock; concurrent debits serialize there.

use copperleaf_core::{EntryKind, Page, Paginated, UserId};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use crate::config::WalletConfig;
use crate::db::{Store, StoreError, StoreUnit};
use crate::models::{LedgerEntry, NewLedgerEntry, RelatedEntity};

/// Ledger description recorded for self-service top-ups.
pub const TOP_UP_DESCRIPTION: &str = "Wallet top-up";

/// Errors surfaced by wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The user has no wallet.
    #[error("wallet not found")]
    WalletNotFound,

    /// The amount is zero or negative.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// A top-up exceeded the per-transaction cap.
    #[error("amount exceeds the per-transaction top-up cap of {cap}")]
    AmountOverCap { cap: Decimal },

    /// The balance cannot cover the requested debit.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Wallet operations over a store.
#[derive(Clone)]
pub struct WalletService<S> {
    store: S,
    config: WalletConfig,
}

impl<S: Store> WalletService<S> {
    pub const fn new(store: S, config: WalletConfig) -> Self {
        Self { store, config }
    }

    /// Current balance.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::WalletNotFound`] if the user has no wallet.
    #[instrument(skip(self))]
    pub async fn balance(&self, user_id: UserId) -> Result<Decimal, WalletError> {
        let wallet = self
            .store
            .wallet_by_user(user_id)
            .await?
            .ok_or(WalletError::WalletNotFound)?;
        Ok(wallet.balance)
    }

    /// Advisory sufficiency check.
    ///
    /// Returns `false` on a missing wallet or any lookup failure instead of
    /// an error; callers use this for hints as well as gating, and a hint
    /// must not take a page down.
    #[instrument(skip(self))]
    pub async fn has_sufficient_balance(&self, user_id: UserId, amount: Decimal) -> bool {
        match self.store.wallet_by_user(user_id).await {
            Ok(Some(wallet)) => wallet.balance >= amount,
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "balance hint lookup failed");
                false
            }
        }
    }

    /// Self-service top-up: a credit additionally bounded by the configured
    /// per-transaction cap.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::AmountOverCap`] above the cap, otherwise the
    /// errors of [`Self::credit`].
    #[instrument(skip(self))]
    pub async fn top_up(
        &self,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<LedgerEntry, WalletError> {
        if amount > self.config.top_up_cap {
            return Err(WalletError::AmountOverCap {
                cap: self.config.top_up_cap,
            });
        }
        self.credit(user_id, amount, TOP_UP_DESCRIPTION, None).await
    }

    /// Credit the wallet, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::InvalidAmount`] for non-positive amounts.
    #[instrument(skip(self))]
    pub async fn credit(
        &self,
        user_id: UserId,
        amount: Decimal,
        description: &str,
        related: Option<RelatedEntity>,
    ) -> Result<LedgerEntry, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount);
        }

        let mut unit = self.store.begin().await?;
        let wallet = unit.create_wallet(user_id, self.config.currency).await?;
        let entry = unit
            .apply_entry(NewLedgerEntry {
                wallet_id: wallet.id,
                user_id,
                kind: EntryKind::Credit,
                amount,
                description: description.to_owned(),
                related,
            })
            .await?;
        unit.commit().await?;

        tracing::info!(
            %user_id,
            %amount,
            balance = %entry.balance_after,
            "wallet credited"
        );
        Ok(entry)
    }

    /// Debit the wallet.
    ///
    /// Locks the wallet row, re-reads the balance under the lock, and only
    /// then applies the entry, all in one unit of work. Two concurrent
    /// debits that would jointly overdraw resolve as one success and one
    /// [`WalletError::InsufficientFunds`].
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::InvalidAmount`], [`WalletError::WalletNotFound`]
    /// or [`WalletError::InsufficientFunds`].
    #[instrument(skip(self))]
    pub async fn debit(
        &self,
        user_id: UserId,
        amount: Decimal,
        description: &str,
        related: Option<RelatedEntity>,
    ) -> Result<LedgerEntry, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount);
        }

        let mut unit = self.store.begin().await?;
        let wallet = unit
            .lock_wallet(user_id)
            .await?
            .ok_or(WalletError::WalletNotFound)?;
        if wallet.balance < amount {
            return Err(WalletError::InsufficientFunds {
                requested: amount,
                available: wallet.balance,
            });
        }

        let entry = unit
            .apply_entry(NewLedgerEntry {
                wallet_id: wallet.id,
                user_id,
                kind: EntryKind::Debit,
                amount,
                description: description.to_owned(),
                related,
            })
            .await?;
        unit.commit().await?;

        tracing::info!(
            %user_id,
            %amount,
            balance = %entry.balance_after,
            "wallet debited"
        );
        Ok(entry)
    }

    /// One page of the user's ledger, newest entries first.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::WalletNotFound`] if the user has no wallet.
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<Paginated<LedgerEntry>, WalletError> {
        if self.store.wallet_by_user(user_id).await?.is_none() {
            return Err(WalletError::WalletNotFound);
        }
        Ok(self.store.ledger_page(user_id, page).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::db::MemoryStore;

    fn service() -> WalletService<MemoryStore> {
        WalletService::new(MemoryStore::new(), WalletConfig::default())
    }

    #[tokio::test]
    async fn test_top_up_enforces_cap() {
        let wallets = service();
        let user = UserId::new(1);

        let err = wallets.top_up(user, dec!(1000.01)).await.unwrap_err();
        assert!(matches!(
            err,
            WalletError::AmountOverCap { cap } if cap == dec!(1000.00)
        ));

        let entry = wallets.top_up(user, dec!(1000.00)).await.unwrap();
        assert_eq!(entry.description, TOP_UP_DESCRIPTION);
        assert_eq!(entry.balance_after, dec!(1000.00));
    }

    #[tokio::test]
    async fn test_non_positive_amounts_rejected() {
        let wallets = service();
        let user = UserId::new(1);

        assert!(matches!(
            wallets.credit(user, dec!(0.00), "x", None).await.unwrap_err(),
            WalletError::InvalidAmount
        ));
        assert!(matches!(
            wallets.debit(user, dec!(-5.00), "x", None).await.unwrap_err(),
            WalletError::InvalidAmount
        ));
    }

    #[tokio::test]
    async fn test_debit_requires_existing_wallet() {
        let wallets = service();
        let err = wallets
            .debit(UserId::new(9), dec!(1.00), "x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::WalletNotFound));
    }

    #[tokio::test]
    async fn test_history_requires_existing_wallet() {
        let wallets = service();
        let err = wallets
            .history(UserId::new(9), Page::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::WalletNotFound));
    }

    #[tokio::test]
    async fn test_balance_hint_never_errors() {
        let wallets = service();
        assert!(!wallets.has_sufficient_balance(UserId::new(9), dec!(1.00)).await);

        wallets.credit(UserId::new(9), dec!(10.00), "seed", None).await.unwrap();
        assert!(wallets.has_sufficient_balance(UserId::new(9), dec!(10.00)).await);
        assert!(!wallets.has_sufficient_balance(UserId::new(9), dec!(10.01)).await);
    }
}
