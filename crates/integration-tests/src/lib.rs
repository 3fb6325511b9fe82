//! Integration tests for Copperleaf.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p copperleaf-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `wallet` - Ledger bookkeeping, the top-up cap, concurrent debits
//! - `cart` - Line mutations validated against the catalog
//! - `checkout` - The full cart-to-order flow and its failure modes
//! - `orders` - Order history reads and access scoping
//!
//! The suites drive the real services against the in-memory store and
//! catalog, so they exercise the production business logic, unit-of-work
//! staging included, without a running `PostgreSQL` or any external service.
//! The `PostgreSQL` store implements the same [`copperleaf_storefront::db::Store`]
//! contract and is covered by the storefront crate's own tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

use copperleaf_core::{ProductId, UserId};
use copperleaf_storefront::catalog::{MemoryCatalog, Product};
use copperleaf_storefront::config::{PricingConfig, WalletConfig};
use copperleaf_storefront::db::MemoryStore;
use copperleaf_storefront::models::ShippingDetailsInput;
use copperleaf_storefront::services::{CartService, CheckoutService, WalletService};
use rust_decimal::Decimal;

/// Everything a test needs to drive the storefront end to end: one shared
/// store and catalog, and the three services wired to them.
pub struct TestContext {
    pub store: MemoryStore,
    pub catalog: MemoryCatalog,
    pub wallets: WalletService<MemoryStore>,
    pub carts: CartService<MemoryStore, MemoryCatalog>,
    pub checkouts: CheckoutService<MemoryStore, MemoryCatalog>,
}

impl TestContext {
    /// Fresh context with the default pricing and wallet limits (7% tax,
    /// $5.99 shipping at or below a $50.00 subtotal, $1000.00 top-up cap).
    #[must_use]
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let catalog = MemoryCatalog::new();
        Self {
            wallets: WalletService::new(store.clone(), WalletConfig::default()),
            carts: CartService::new(store.clone(), catalog.clone()),
            checkouts: CheckoutService::new(
                store.clone(),
                catalog.clone(),
                PricingConfig::default(),
            ),
            store,
            catalog,
        }
    }

    /// Put a product into the catalog and return its id.
    pub fn seed_product(&self, id: &str, price: Decimal, stock: i64) -> ProductId {
        let product_id = ProductId::from(id);
        self.catalog.insert(Product {
            id: product_id.clone(),
            name: format!("Product {id}"),
            price,
            stock,
        });
        product_id
    }

    /// Fund a wallet through a regular top-up.
    ///
    /// # Panics
    ///
    /// Panics if the top-up fails; fixture amounts stay within the cap.
    pub async fn fund_wallet(&self, user: UserId, amount: Decimal) {
        self.wallets
            .top_up(user, amount)
            .await
            .expect("fixture top-up failed");
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Shipping details that pass validation, for checkout calls.
#[must_use]
pub fn shipping_input() -> ShippingDetailsInput {
    ShippingDetailsInput {
        recipient: "Grace Hopper".to_owned(),
        email: "grace@example.com".to_owned(),
        address_line1: "1 Harbor Lane".to_owned(),
        address_line2: None,
        city: "Arlington".to_owned(),
        postal_code: "22201".to_owned(),
        country: "US".to_owned(),
    }
}
