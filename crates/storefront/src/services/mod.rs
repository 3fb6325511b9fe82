//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `wallet` - Balance queries, top-ups, and ledger-backed debits/credits
//! - `cart` - Cart mutations validated against the live catalog
//! - `checkout` - Turns a cart into a confirmed order and a wallet debit,
//!   atomically
//!
//! Services are stateless handles: each holds a store (and a catalog client
//! where needed) plus its slice of configuration, and is `Clone` so the app
//! state and tests can share them freely. All mutation goes through
//! [`crate::db::StoreUnit`] units of work.

pub mod cart;
pub mod checkout;
pub mod wallet;

pub use cart::{CartError, CartService};
pub use checkout::{CheckoutError, CheckoutService, CheckoutSummary};
pub use wallet::{WalletError, WalletService};
