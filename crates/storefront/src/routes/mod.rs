//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness check
//! GET    /health/ready                - Readiness check (database ping)
//!
//! # Wallet
//! GET    /api/wallet                  - Current balance
//! POST   /api/wallet/top-up           - Add funds
//! GET    /api/wallet/transactions     - Ledger history (paginated)
//!
//! # Cart
//! GET    /api/cart                    - Cart with totals
//! POST   /api/cart/items              - Add item (merges quantities)
//! PUT    /api/cart/items/{product_id} - Set item quantity (0 removes)
//! DELETE /api/cart/items/{product_id} - Remove item
//! DELETE /api/cart                    - Clear cart
//!
//! # Checkout
//! GET    /api/checkout                - Non-mutating checkout summary
//! POST   /api/checkout                - Place the order
//!
//! # Orders
//! GET    /api/orders                  - Order history (paginated)
//! GET    /api/orders/{order_id}       - Single order
//! ```
//!
//! Everything under `/api` requires a bearer token resolvable by the
//! identity service; handlers take [`crate::middleware::AuthUser`].

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod wallet;

use axum::{
    Router,
    routing::{get, post, put},
};
use copperleaf_core::Page;
use serde::Deserialize;

use crate::state::AppState;

/// Pagination query parameters shared by the list endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    page_size: Option<u32>,
}

impl PageParams {
    /// Resolve to a validated [`Page`], defaulting and clamping as needed.
    fn page(self) -> Page {
        Page::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(Page::DEFAULT_SIZE),
        )
    }
}

/// Create the wallet routes router.
pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wallet::balance))
        .route("/top-up", post(wallet::top_up))
        .route("/transactions", get(wallet::transactions))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{product_id}",
            put(cart::update_item).delete(cart::remove_item),
        )
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/", get(checkout::summary).post(checkout::process))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{order_id}", get(orders::show))
}

/// Create all API routes for the storefront.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/wallet", wallet_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
}
