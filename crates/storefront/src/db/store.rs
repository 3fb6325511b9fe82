//! Storage traits for wallets, carts, and orders.
//!
//! Services are generic over [`Store`] so the same logic runs against
//! `PostgreSQL` in production and against the in-memory store in tests.

use async_trait::async_trait;
use copperleaf_core::{CurrencyCode, OrderId, Page, Paginated, UserId};

use super::StoreError;
use crate::models::{Cart, LedgerEntry, NewLedgerEntry, NewOrder, Order, Wallet};

/// Read access plus the ability to open units of work.
#[async_trait]
pub trait Store: Send + Sync {
    type Unit: StoreUnit;

    /// Open a unit of work. Writes inside it are invisible until
    /// [`StoreUnit::commit`] and discarded if the unit is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the unit cannot be opened.
    async fn begin(&self) -> Result<Self::Unit, StoreError>;

    /// Fetch a user's wallet, if one has been created.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn wallet_by_user(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError>;

    /// One page of a user's ledger, newest entries first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn ledger_page(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<Paginated<LedgerEntry>, StoreError>;

    /// Fetch a user's cart. A user with no stored cart gets an empty one;
    /// nothing is persisted by this read.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails or stored lines are
    /// malformed.
    async fn cart_by_user(&self, user_id: UserId) -> Result<Cart, StoreError>;

    /// Fetch one of the user's own orders. Another user's order id yields
    /// `None`, indistinguishable from a missing order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails or stored documents are
    /// malformed.
    async fn order_by_id(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, StoreError>;

    /// One page of a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn orders_page(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<Paginated<Order>, StoreError>;
}

/// A unit of work: every write below is atomic with the others in the same
/// unit.
///
/// Locking methods take exclusive row locks that last until commit or drop.
/// Callers that touch both cart and wallet must lock the cart first; keeping
/// one lock order across all call sites is what prevents deadlocks.
#[async_trait]
pub trait StoreUnit: Send {
    /// Lock the user's wallet row and return its current state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn lock_wallet(&mut self, user_id: UserId) -> Result<Option<Wallet>, StoreError>;

    /// Create the user's wallet if it does not exist, then return it
    /// locked. Safe to race: concurrent creators converge on one row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn create_wallet(
        &mut self,
        user_id: UserId,
        currency: CurrencyCode,
    ) -> Result<Wallet, StoreError>;

    /// Append a ledger entry and move the wallet balance by its signed
    /// amount. The entry's `balance_before`/`balance_after` are computed
    /// here from the locked wallet row, never supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the wallet row is missing and
    /// [`StoreError::Invariant`] if the entry amount is not positive or
    /// the resulting balance would be negative.
    async fn apply_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError>;

    /// Lock the user's cart for mutation, creating an empty one first if
    /// the user has none.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails or stored lines are
    /// malformed.
    async fn cart_for_update(&mut self, user_id: UserId) -> Result<Cart, StoreError>;

    /// Persist the cart's current lines.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn put_cart(&mut self, cart: &Cart) -> Result<(), StoreError>;

    /// Drop the user's stored cart. Subsequent reads see an empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn clear_cart(&mut self, user_id: UserId) -> Result<(), StoreError>;

    /// Insert a new order and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError>;

    /// Commit every write in this unit atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the unit lost a serialization
    /// or deadlock race and should be retried.
    async fn commit(self) -> Result<(), StoreError>;
}
