//! Persistence for the storefront `PostgreSQL` database.
//!
//! # Database: `copperleaf_storefront`
//!
//! ## Tables
//!
//! - `wallets` - One balance row per user, updated under row locks
//! - `wallet_entries` - Append-only double-entry style ledger
//! - `carts` - One JSONB line-item document per user
//! - `orders` - Immutable records of completed checkouts
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p copperleaf-cli -- migrate
//! ```
//!
//! # Access pattern
//!
//! All reads and writes go through the [`Store`] trait. Multi-step writes
//! happen inside a [`StoreUnit`], which maps to a `PostgreSQL` transaction in
//! production ([`PgStore`]) and to a staged in-memory write set in tests
//! ([`MemoryStore`]).

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod postgres;
mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{Store, StoreUnit};

/// Errors surfaced by the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error during query execution.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend infrastructure failure outside a specific query.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Stored data failed to parse back into domain types.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A database-enforced invariant rejected the write.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// The unit of work lost a serialization or lock conflict and the
    /// caller may retry.
    #[error("transaction conflict, retry the operation")]
    Conflict,

    /// A row the operation requires does not exist.
    #[error("record not found")]
    NotFound,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
