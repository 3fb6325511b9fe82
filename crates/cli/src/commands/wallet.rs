//! Wallet management commands.
//!
//! The `credit` command is the out-of-band funding path (support
//! adjustments, promotional credits). It bypasses the API's per-transaction
//! top-up cap but still writes through the ledger, so every adjustment
//! shows up in the user's transaction history.
//!
//! # Usage
//!
//! ```bash
//! cl-cli wallet credit --user 42 --amount 25.00 --description "Goodwill credit"
//! cl-cli wallet balance --user 42
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)
//! - `WALLET_CURRENCY` - Currency for wallets created on first credit

use copperleaf_core::UserId;
use copperleaf_storefront::config::{ConfigError, WalletConfig};
use copperleaf_storefront::db::{self, PgStore};
use copperleaf_storefront::services::{WalletError, WalletService};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletCommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Wallet configuration failed to load.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Wallet operation error.
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Credit a user's wallet and print the resulting ledger entry.
///
/// Creates the wallet on first use, like the API top-up path does.
///
/// # Errors
///
/// Returns [`WalletCommandError`] if configuration is missing, the
/// database is unreachable, or the amount is rejected.
pub async fn credit(
    user: i32,
    amount: Decimal,
    description: &str,
) -> Result<(), WalletCommandError> {
    let wallets = wallet_service().await?;
    let user_id = UserId::new(user);

    tracing::info!("Crediting wallet for user {user_id}...");
    let entry = wallets.credit(user_id, amount, description, None).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Credited {} to user {}", entry.amount, user_id);
        println!("  entry id:       {}", entry.id);
        println!("  balance before: {}", entry.balance_before);
        println!("  balance after:  {}", entry.balance_after);
    }
    Ok(())
}

/// Print a user's wallet balance.
///
/// # Errors
///
/// Returns [`WalletCommandError`] if the user has no wallet or the
/// database is unreachable.
pub async fn balance(user: i32) -> Result<(), WalletCommandError> {
    let wallets = wallet_service().await?;
    let user_id = UserId::new(user);

    let balance = wallets.balance(user_id).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("User {user_id} balance: {balance}");
    }
    Ok(())
}

/// Build a wallet service over the configured database.
async fn wallet_service() -> Result<WalletService<PgStore>, WalletCommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| WalletCommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;
    let config = WalletConfig::from_env()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&SecretString::from(database_url)).await?;

    Ok(WalletService::new(PgStore::new(pool), config))
}
