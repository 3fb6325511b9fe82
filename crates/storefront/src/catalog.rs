//! Catalog service client.
//!
//! The catalog is an external, read-only service; this subsystem never writes
//! to it. Product lookups are deliberately not cached: price and stock gate
//! money movement, so cart validation and checkout must see current values.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use copperleaf_core::ProductId;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

/// A product as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub stock: i64,
}

/// Errors that can occur when looking up products.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog has no product with this id.
    #[error("product not found: {0}")]
    NotFound(ProductId),

    /// The catalog answered with a status this client does not understand.
    #[error("catalog returned unexpected status: {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

/// Read-only product lookup.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch the current product record.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the id is unknown, or a
    /// transport error if the catalog is unreachable.
    async fn product(&self, id: &ProductId) -> Result<Product, CatalogError>;
}

/// Client for the catalog service's HTTP API.
#[derive(Clone)]
pub struct HttpCatalog {
    inner: Arc<HttpCatalogInner>,
}

struct HttpCatalogInner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpCatalogInner {
                client,
                base_url: base_url.trim_end_matches('/').to_owned(),
            }),
        })
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    #[instrument(skip(self))]
    async fn product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let url = format!("{}/products/{}", self.inner.base_url, id);
        let response = self.inner.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(id.clone()));
        }
        if !status.is_success() {
            return Err(CatalogError::UnexpectedStatus(status));
        }

        Ok(response.json::<Product>().await?)
    }
}

/// In-memory catalog for tests and local development.
///
/// `set_price` and `set_stock` let tests change a product between cart and
/// checkout, which is how the repricing and stock-drop behavior is exercised.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a product.
    pub fn insert(&self, product: Product) {
        self.write().insert(product.id.clone(), product);
    }

    /// Delete a product, as if it was removed from sale.
    pub fn remove(&self, id: &ProductId) {
        self.write().remove(id);
    }

    /// Change a product's price in place.
    pub fn set_price(&self, id: &ProductId, price: Decimal) {
        if let Some(product) = self.write().get_mut(id) {
            product.price = price;
        }
    }

    /// Change a product's stock level in place.
    pub fn set_stock(&self, id: &ProductId, stock: i64) {
        if let Some(product) = self.write().get_mut(id) {
            product.stock = stock;
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ProductId, Product>> {
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn widget() -> Product {
        Product {
            id: ProductId::from("p-widget"),
            name: "Widget".to_owned(),
            price: dec!(19.99),
            stock: 5,
        }
    }

    #[tokio::test]
    async fn test_memory_catalog_lookup_and_mutation() {
        let catalog = MemoryCatalog::new();
        catalog.insert(widget());

        let id = ProductId::from("p-widget");
        assert_eq!(catalog.product(&id).await.unwrap().price, dec!(19.99));

        catalog.set_price(&id, dec!(25.00));
        catalog.set_stock(&id, 1);
        let product = catalog.product(&id).await.unwrap();
        assert_eq!(product.price, dec!(25.00));
        assert_eq!(product.stock, 1);
    }

    #[tokio::test]
    async fn test_memory_catalog_missing_product() {
        let catalog = MemoryCatalog::new();
        let err = catalog
            .product(&ProductId::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn test_product_wire_format() {
        let product: Product = serde_json::from_str(
            r#"{"id": "p-widget", "name": "Widget", "price": "19.99", "stock": 5}"#,
        )
        .unwrap();
        assert_eq!(product, widget());
    }
}
