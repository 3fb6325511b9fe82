//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::catalog::{CatalogError, HttpCatalog};
use crate::config::StorefrontConfig;
use crate::db::PgStore;
use crate::identity::{HttpIdentity, IdentityError};
use crate::services::{CartService, CheckoutService, WalletService};

/// Error assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("catalog client: {0}")]
    Catalog(#[from] CatalogError),
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the store, the upstream clients and the domain
/// services built over them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    store: PgStore,
    identity: HttpIdentity,
    wallets: WalletService<PgStore>,
    carts: CartService<PgStore, HttpCatalog>,
    checkouts: CheckoutService<PgStore, HttpCatalog>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if an upstream HTTP client fails to build.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let store = PgStore::new(pool.clone());
        let catalog = HttpCatalog::new(&config.catalog_base_url)?;
        let identity = HttpIdentity::new(&config.identity_base_url)?;

        let wallets = WalletService::new(store.clone(), config.wallet.clone());
        let carts = CartService::new(store.clone(), catalog.clone());
        let checkouts = CheckoutService::new(store.clone(), catalog, config.pricing.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                store,
                identity,
                wallets,
                carts,
                checkouts,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the backing store.
    #[must_use]
    pub fn store(&self) -> &PgStore {
        &self.inner.store
    }

    /// Get a reference to the identity client.
    #[must_use]
    pub fn identity(&self) -> &HttpIdentity {
        &self.inner.identity
    }

    /// Get a reference to the wallet service.
    #[must_use]
    pub fn wallets(&self) -> &WalletService<PgStore> {
        &self.inner.wallets
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn carts(&self) -> &CartService<PgStore, HttpCatalog> {
        &self.inner.carts
    }

    /// Get a reference to the checkout service.
    #[must_use]
    pub fn checkouts(&self) -> &CheckoutService<PgStore, HttpCatalog> {
        &self.inner.checkouts
    }
}
