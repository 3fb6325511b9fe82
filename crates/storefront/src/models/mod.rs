//! Domain models for wallets, carts and orders.
//!
//! These are the shapes the services and the storage layer agree on. API
//! request/response types live next to their route handlers instead.

pub mod cart;
pub mod order;
pub mod wallet;

pub use cart::{Cart, CartLine, CartTotals};
pub use order::{
    NewOrder, Order, OrderItem, ShippingDetails, ShippingDetailsError, ShippingDetailsInput,
};
pub use wallet::{LedgerEntry, NewLedgerEntry, RelatedEntity, Wallet};
