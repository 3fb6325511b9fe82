//! Copperleaf CLI - Database migrations and wallet management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! cl-cli migrate
//!
//! # Credit a wallet out of band (support path, bypasses the top-up cap)
//! cl-cli wallet credit --user 42 --amount 25.00 --description "Goodwill credit"
//!
//! # Inspect a wallet
//! cl-cli wallet balance --user 42
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `wallet credit` - Credit a user's wallet through the ledger
//! - `wallet balance` - Show a user's current balance

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "cl-cli")]
#[command(author, version, about = "Copperleaf CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect and adjust user wallets
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    /// Credit a user's wallet (out-of-band funding, no top-up cap)
    Credit {
        /// Numeric user id
        #[arg(short, long)]
        user: i32,

        /// Amount to credit, e.g. 25.00
        #[arg(short, long)]
        amount: Decimal,

        /// Ledger description recorded on the entry
        #[arg(short, long, default_value = "Manual credit")]
        description: String,
    },
    /// Show a user's wallet balance
    Balance {
        /// Numeric user id
        #[arg(short, long)]
        user: i32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Wallet { action } => match action {
            WalletAction::Credit {
                user,
                amount,
                description,
            } => {
                commands::wallet::credit(user, amount, &description).await?;
            }
            WalletAction::Balance { user } => {
                commands::wallet::balance(user).await?;
            }
        },
    }
    Ok(())
}
