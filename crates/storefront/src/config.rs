//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string
//! - `CATALOG_BASE_URL` - Base URL of the catalog service
//! - `IDENTITY_BASE_URL` - Base URL of the identity service
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `CHECKOUT_TAX_RATE` - Tax rate applied to the subtotal (default: 0.07)
//! - `CHECKOUT_FLAT_SHIPPING_FEE` - Shipping fee below the threshold (default: 5.99)
//! - `CHECKOUT_FREE_SHIPPING_THRESHOLD` - Subtotal above which shipping is free (default: 50.00)
//! - `WALLET_TOP_UP_CAP` - Maximum amount per top-up (default: 1000.00)
//! - `WALLET_CURRENCY` - Currency for newly created wallets (default: USD)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Sentry tracing sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use copperleaf_core::CurrencyCode;
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Base URL of the catalog service
    pub catalog_base_url: String,
    /// Base URL of the identity service
    pub identity_base_url: String,
    /// Checkout pricing parameters
    pub pricing: PricingConfig,
    /// Wallet limits and defaults
    pub wallet: WalletConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry tracing sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Checkout pricing parameters.
///
/// All three values are amounts or rates in the wallet currency. Checkout
/// computes `tax = round half-away-from-zero(subtotal * tax_rate, 2)` and
/// charges `flat_shipping_fee` unless the subtotal is strictly greater than
/// `free_shipping_threshold`.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Tax rate applied to the subtotal (e.g. 0.07 for 7%)
    pub tax_rate: Decimal,
    /// Shipping fee charged below the free-shipping threshold
    pub flat_shipping_fee: Decimal,
    /// Subtotal above which shipping is free
    pub free_shipping_threshold: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(7, 2),
            flat_shipping_fee: Decimal::new(599, 2),
            free_shipping_threshold: Decimal::new(5000, 2),
        }
    }
}

/// Wallet limits and defaults.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Maximum amount a single top-up may add
    pub top_up_cap: Decimal,
    /// Currency assigned to newly created wallets
    pub currency: CurrencyCode,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            top_up_cap: Decimal::new(100_000, 2),
            currency: CurrencyCode::USD,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any value
    /// fails to parse or validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;

        let catalog_base_url = get_base_url("CATALOG_BASE_URL")?;
        let identity_base_url = get_base_url("IDENTITY_BASE_URL")?;

        let pricing = PricingConfig::from_env()?;
        let wallet = WalletConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_f32_env("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = get_f32_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;

        Ok(Self {
            database_url,
            host,
            port,
            catalog_base_url,
            identity_base_url,
            pricing,
            wallet,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl PricingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let tax_rate = get_decimal_env("CHECKOUT_TAX_RATE", "0.07")?;
        let flat_shipping_fee = get_decimal_env("CHECKOUT_FLAT_SHIPPING_FEE", "5.99")?;
        let free_shipping_threshold = get_decimal_env("CHECKOUT_FREE_SHIPPING_THRESHOLD", "50.00")?;

        let config = Self {
            tax_rate,
            flat_shipping_fee,
            free_shipping_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar(
                "CHECKOUT_TAX_RATE".to_string(),
                "must be at least 0 and less than 1".to_string(),
            ));
        }
        if self.flat_shipping_fee < Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                "CHECKOUT_FLAT_SHIPPING_FEE".to_string(),
                "must not be negative".to_string(),
            ));
        }
        if self.free_shipping_threshold < Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                "CHECKOUT_FREE_SHIPPING_THRESHOLD".to_string(),
                "must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl WalletConfig {
    /// Load wallet limits from environment variables.
    ///
    /// Public because the CLI's wallet commands honor the same variables as
    /// the server.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value fails to parse or validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let top_up_cap = get_decimal_env("WALLET_TOP_UP_CAP", "1000.00")?;
        if top_up_cap <= Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                "WALLET_TOP_UP_CAP".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let currency = get_env_or_default("WALLET_CURRENCY", "USD");
        let currency = CurrencyCode::from_str(&currency)
            .map_err(|e| ConfigError::InvalidEnvVar("WALLET_CURRENCY".to_string(), e))?;

        Ok(Self {
            top_up_cap,
            currency,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first (e.g., STOREFRONT_DATABASE_URL)
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    // Fallback to generic DATABASE_URL (set by Fly.io postgres attach)
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed as a `Decimal`, with a default.
fn get_decimal_env(key: &str, default: &str) -> Result<Decimal, ConfigError> {
    let raw = get_env_or_default(key, default);
    Decimal::from_str(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get an environment variable parsed as an `f32`, with a default.
fn get_f32_env(key: &str, default: &str) -> Result<f32, ConfigError> {
    let raw = get_env_or_default(key, default);
    raw.parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a required environment variable holding a service base URL.
fn get_base_url(key: &str) -> Result<String, ConfigError> {
    let raw = get_required_env(key)?;
    parse_base_url(key, &raw)
}

/// Validate a service base URL.
///
/// Requires an http(s) URL with a host and strips any trailing slash so
/// callers can join paths with plain `format!`.
fn parse_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme: {}", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "missing host".to_string(),
        ));
    }

    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_pricing_defaults() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.tax_rate, dec!(0.07));
        assert_eq!(pricing.flat_shipping_fee, dec!(5.99));
        assert_eq!(pricing.free_shipping_threshold, dec!(50.00));
    }

    #[test]
    fn test_pricing_validate_rejects_out_of_range_tax() {
        let pricing = PricingConfig {
            tax_rate: dec!(1.0),
            ..PricingConfig::default()
        };
        assert!(pricing.validate().is_err());

        let pricing = PricingConfig {
            tax_rate: dec!(-0.01),
            ..PricingConfig::default()
        };
        assert!(pricing.validate().is_err());
    }

    #[test]
    fn test_pricing_validate_rejects_negative_amounts() {
        let pricing = PricingConfig {
            flat_shipping_fee: dec!(-1),
            ..PricingConfig::default()
        };
        assert!(pricing.validate().is_err());

        let pricing = PricingConfig {
            free_shipping_threshold: dec!(-1),
            ..PricingConfig::default()
        };
        assert!(pricing.validate().is_err());
    }

    #[test]
    fn test_wallet_defaults() {
        let wallet = WalletConfig::default();
        assert_eq!(wallet.top_up_cap, dec!(1000.00));
        assert_eq!(wallet.currency, CurrencyCode::USD);
    }

    #[test]
    fn test_parse_base_url() {
        assert_eq!(
            parse_base_url("TEST", "http://catalog.internal:4000/").unwrap(),
            "http://catalog.internal:4000"
        );
        assert_eq!(
            parse_base_url("TEST", "https://catalog.example.com/api").unwrap(),
            "https://catalog.example.com/api"
        );
        assert!(parse_base_url("TEST", "ftp://catalog.example.com").is_err());
        assert!(parse_base_url("TEST", "not a url").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            catalog_base_url: "http://localhost:4000".to_string(),
            identity_base_url: "http://localhost:5000".to_string(),
            pricing: PricingConfig::default(),
            wallet: WalletConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }
}
