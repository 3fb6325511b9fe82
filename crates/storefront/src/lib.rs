//! Copperleaf Storefront library.
//!
//! This crate provides the checkout and wallet backend as a library, allowing
//! it to be tested and reused by the CLI and the integration test suite.
//!
//! # Architecture
//!
//! - Axum JSON API over the wallet, cart, checkout and order operations
//! - `PostgreSQL` for wallets, the append-only ledger, carts and orders
//! - External catalog service for product names, prices and stock
//! - External identity service for access-token introspection
//!
//! Services are generic over the [`db::Store`] trait so the same business
//! logic runs against `PostgreSQL` in production and the in-memory store in
//! tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
