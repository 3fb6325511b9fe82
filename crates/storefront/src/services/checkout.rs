//! Checkout service: turns a cart into a confirmed order and a wallet debit.
//!
//! `process` is the one place a multi-step mutation spans the wallet, the
//! orders table, and the cart. The whole sequence runs inside a single unit
//! of work, locking the cart row first and the wallet row second (the same
//! order every code path uses), so after any attempt an observer sees either
//! all of (order created, wallet debited, cart empty) or none of it.
//!
//! Cart snapshots are never trusted here: every line is re-fetched from the
//! catalog and repriced at current values before money moves.

use std::time::Duration;

use copperleaf_core::{EntryKind, OrderStatus, UserId};
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::instrument;

use crate::catalog::{Catalog, CatalogError};
use crate::config::PricingConfig;
use crate::db::{Store, StoreError, StoreUnit};
use crate::models::{
    Cart, NewLedgerEntry, NewOrder, Order, OrderItem, RelatedEntity, ShippingDetails,
    ShippingDetailsError, ShippingDetailsInput,
};

/// Ledger description recorded for checkout debits.
pub const ORDER_PURCHASE_DESCRIPTION: &str = "Order purchase";

/// How many times a checkout is retried after losing a store-level race.
const MAX_CHECKOUT_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts, scaled by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// Errors surfaced by checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// There is nothing in the cart to check out.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line references a product the catalog no longer has.
    #[error("product not found: {0}")]
    ProductNotFound(copperleaf_core::ProductId),

    /// Current stock cannot cover a cart line.
    #[error("only {available} items available in stock for product {product_id}")]
    InsufficientStock {
        product_id: copperleaf_core::ProductId,
        available: i64,
    },

    /// The wallet cannot cover the grand total.
    #[error("insufficient funds: short by {shortfall}")]
    InsufficientFunds { shortfall: Decimal },

    /// The submitted shipping details failed validation.
    #[error("invalid shipping details: {0}")]
    InvalidShippingDetails(#[from] ShippingDetailsError),

    /// Every retry lost a concurrent update race.
    #[error("checkout conflicted with concurrent updates, please retry")]
    Conflict,

    /// The catalog could not be reached.
    #[error("catalog unavailable: {0}")]
    Catalog(CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn catalog_err(err: CatalogError) -> CheckoutError {
    match err {
        CatalogError::NotFound(id) => CheckoutError::ProductNotFound(id),
        other => CheckoutError::Catalog(other),
    }
}

/// A non-mutating checkout quote.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CheckoutSummary {
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
    pub wallet_balance: Decimal,
    pub has_sufficient_balance: bool,
    /// How much is missing to cover the grand total; zero when covered.
    pub shortfall: Decimal,
}

/// Priced order amounts derived from a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OrderPricing {
    subtotal: Decimal,
    shipping: Decimal,
    tax: Decimal,
    grand_total: Decimal,
}

/// Apply the shipping and tax rules to a subtotal.
///
/// Shipping is free only when the subtotal is strictly over the threshold;
/// hitting it exactly still pays the flat fee. Tax is rounded to cents,
/// midpoints away from zero.
fn price_order(config: &PricingConfig, subtotal: Decimal) -> OrderPricing {
    let shipping = if subtotal > config.free_shipping_threshold {
        Decimal::ZERO
    } else {
        config.flat_shipping_fee
    };
    let tax = (subtotal * config.tax_rate)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    OrderPricing {
        subtotal,
        shipping,
        tax,
        grand_total: subtotal + shipping + tax,
    }
}

/// Checkout orchestration over a store and a catalog.
#[derive(Clone)]
pub struct CheckoutService<S, C> {
    store: S,
    catalog: C,
    pricing: PricingConfig,
}

impl<S: Store, C: Catalog> CheckoutService<S, C> {
    pub const fn new(store: S, catalog: C, pricing: PricingConfig) -> Self {
        Self {
            store,
            catalog,
            pricing,
        }
    }

    /// Quote the current cart at live catalog prices, with advisory wallet
    /// fields.
    ///
    /// A missing wallet degrades to a zero balance rather than an error;
    /// the point of the quote is to tell the buyer what would happen.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] when there is nothing to quote,
    /// or the catalog/store errors of repricing.
    #[instrument(skip(self))]
    pub async fn summary(&self, user_id: UserId) -> Result<CheckoutSummary, CheckoutError> {
        let cart = self.store.cart_by_user(user_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let (items, pricing) = self.reprice(&cart).await?;

        let wallet_balance = self
            .store
            .wallet_by_user(user_id)
            .await?
            .map_or(Decimal::ZERO, |wallet| wallet.balance);
        let shortfall = (pricing.grand_total - wallet_balance).max(Decimal::ZERO);

        Ok(CheckoutSummary {
            items,
            subtotal: pricing.subtotal,
            shipping: pricing.shipping,
            tax: pricing.tax,
            grand_total: pricing.grand_total,
            wallet_balance,
            has_sufficient_balance: shortfall == Decimal::ZERO,
            shortfall,
        })
    }

    /// Process the checkout: validate, reprice, debit, persist the order,
    /// clear the cart, all atomically.
    ///
    /// Store-level conflicts retry the whole sequence up to
    /// [`MAX_CHECKOUT_ATTEMPTS`] times; re-validation makes the retry safe.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidShippingDetails`],
    /// [`CheckoutError::EmptyCart`], [`CheckoutError::ProductNotFound`],
    /// [`CheckoutError::InsufficientStock`],
    /// [`CheckoutError::InsufficientFunds`] or, after exhausted retries,
    /// [`CheckoutError::Conflict`].
    #[instrument(skip(self, shipping))]
    pub async fn process(
        &self,
        user_id: UserId,
        shipping: ShippingDetailsInput,
    ) -> Result<Order, CheckoutError> {
        let shipping = shipping.parse()?;

        let mut attempt = 1;
        loop {
            match self.attempt(user_id, &shipping).await {
                Err(CheckoutError::Store(StoreError::Conflict)) => {
                    if attempt >= MAX_CHECKOUT_ATTEMPTS {
                        return Err(CheckoutError::Conflict);
                    }
                    tracing::warn!(%user_id, attempt, "checkout lost a race, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// One checkout attempt inside one unit of work.
    async fn attempt(
        &self,
        user_id: UserId,
        shipping: &ShippingDetails,
    ) -> Result<Order, CheckoutError> {
        let mut unit = self.store.begin().await?;

        // Cart row first, wallet row second. Same order everywhere.
        let cart = unit.cart_for_update(user_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let (items, pricing) = self.reprice(&cart).await?;

        let wallet = unit
            .lock_wallet(user_id)
            .await?
            .ok_or(CheckoutError::InsufficientFunds {
                shortfall: pricing.grand_total,
            })?;
        if wallet.balance < pricing.grand_total {
            return Err(CheckoutError::InsufficientFunds {
                shortfall: pricing.grand_total - wallet.balance,
            });
        }

        // The order goes in before the debit so the ledger entry can carry
        // the real order id.
        let order = unit
            .insert_order(NewOrder {
                user_id,
                items,
                total_amount: pricing.grand_total,
                shipping_details: shipping.clone(),
                status: OrderStatus::Confirmed,
            })
            .await?;

        unit.apply_entry(NewLedgerEntry {
            wallet_id: wallet.id,
            user_id,
            kind: EntryKind::Debit,
            amount: pricing.grand_total,
            description: ORDER_PURCHASE_DESCRIPTION.to_owned(),
            related: Some(RelatedEntity::order(order.id)),
        })
        .await?;

        unit.clear_cart(user_id).await?;
        unit.commit().await?;

        tracing::info!(
            %user_id,
            order_id = %order.id,
            grand_total = %pricing.grand_total,
            "checkout committed"
        );
        Ok(order)
    }

    /// Re-fetch and reprice every cart line from the catalog.
    async fn reprice(&self, cart: &Cart) -> Result<(Vec<OrderItem>, OrderPricing), CheckoutError> {
        let mut items = Vec::with_capacity(cart.lines.len());
        let mut subtotal = Decimal::ZERO;

        for line in &cart.lines {
            let product = self
                .catalog
                .product(&line.product_id)
                .await
                .map_err(catalog_err)?;
            if i64::from(line.quantity) > product.stock {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    available: product.stock,
                });
            }

            let line_total = product.price * Decimal::from(line.quantity);
            subtotal += line_total;
            items.push(OrderItem {
                product_id: product.id,
                name: product.name,
                unit_price: product.price,
                quantity: line.quantity,
                line_total,
            });
        }

        Ok((items, price_order(&self.pricing, subtotal)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use copperleaf_core::ProductId;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::catalog::{MemoryCatalog, Product};
    use crate::db::MemoryStore;

    fn pricing() -> PricingConfig {
        PricingConfig::default()
    }

    #[test]
    fn test_free_shipping_strictly_over_threshold() {
        let priced = price_order(&pricing(), dec!(60.00));
        assert_eq!(priced.shipping, dec!(0.00));
        assert_eq!(priced.tax, dec!(4.20));
        assert_eq!(priced.grand_total, dec!(64.20));
    }

    #[test]
    fn test_under_threshold_pays_flat_fee() {
        let priced = price_order(&pricing(), dec!(49.99));
        assert_eq!(priced.shipping, dec!(5.99));
        assert_eq!(priced.tax, dec!(3.50));
        assert_eq!(priced.grand_total, dec!(59.48));
    }

    #[test]
    fn test_threshold_exactly_still_pays_shipping() {
        let priced = price_order(&pricing(), dec!(50.00));
        assert_eq!(priced.shipping, dec!(5.99));
        assert_eq!(priced.grand_total, dec!(59.49));
    }

    #[test]
    fn test_tax_midpoint_rounds_away_from_zero() {
        // 7.50 * 0.07 = 0.525, a true midpoint at two decimals.
        let priced = price_order(&pricing(), dec!(7.50));
        assert_eq!(priced.tax, dec!(0.53));
    }

    #[tokio::test]
    async fn test_summary_degrades_missing_wallet_to_zero_balance() {
        let store = MemoryStore::new();
        let catalog = MemoryCatalog::new();
        catalog.insert(Product {
            id: ProductId::from("p-1"),
            name: "Widget".to_owned(),
            price: dec!(30.00),
            stock: 5,
        });
        let carts = crate::services::CartService::new(store.clone(), catalog.clone());
        let checkout = CheckoutService::new(store, catalog, pricing());

        let user = copperleaf_core::UserId::new(1);
        carts
            .add_item(user, ProductId::from("p-1"), 2)
            .await
            .unwrap();

        let summary = checkout.summary(user).await.unwrap();
        assert_eq!(summary.grand_total, dec!(64.20));
        assert_eq!(summary.wallet_balance, dec!(0.00));
        assert!(!summary.has_sufficient_balance);
        assert_eq!(summary.shortfall, dec!(64.20));
    }

    #[tokio::test]
    async fn test_summary_of_empty_cart() {
        let checkout = CheckoutService::new(MemoryStore::new(), MemoryCatalog::new(), pricing());
        let err = checkout
            .summary(copperleaf_core::UserId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }
}
