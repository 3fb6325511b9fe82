//! Copperleaf Core - Shared types library.
//!
//! This crate provides common types used across all Copperleaf components:
//! - `storefront` - Checkout and wallet API service
//! - `cli` - Command-line tools for migrations and wallet administration
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, currency codes, ledger/order statuses,
//!   pagination and email types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
