//! Cart service: line mutations validated against the live catalog.
//!
//! Every mutation is one unit of work over the user's cart row: lock, apply
//! the change to the line sequence, write the whole document back, commit.
//! The store serializes writes per user row, so two edits to the same cart
//! never interleave. Reads take no lock.

use copperleaf_core::{ProductId, UserId};
use thiserror::Error;
use tracing::instrument;

use crate::catalog::{Catalog, CatalogError};
use crate::db::{Store, StoreError, StoreUnit};
use crate::models::Cart;

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity must be greater than zero here.
    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    /// The catalog has no such product.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Requested (or merged) quantity exceeds current stock.
    #[error("only {available} items available in stock")]
    InsufficientStock { available: i64 },

    /// The cart has no line for this product.
    #[error("item is not in the cart")]
    ItemNotInCart,

    /// The catalog could not be reached.
    #[error("catalog unavailable: {0}")]
    Catalog(CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn catalog_err(err: CatalogError) -> CartError {
    match err {
        CatalogError::NotFound(id) => CartError::ProductNotFound(id),
        other => CartError::Catalog(other),
    }
}

/// Cart operations over a store and a catalog.
#[derive(Clone)]
pub struct CartService<S, C> {
    store: S,
    catalog: C,
}

impl<S: Store, C: Catalog> CartService<S, C> {
    pub const fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// The user's current cart. A user who never added anything gets an
    /// empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the read fails.
    #[instrument(skip(self))]
    pub async fn summary(&self, user_id: UserId) -> Result<Cart, CartError> {
        Ok(self.store.cart_by_user(user_id).await?)
    }

    /// Add a product to the cart, merging into an existing line by summing
    /// quantities. The line's name/price/stock snapshots are refreshed from
    /// the catalog either way.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for zero quantity,
    /// [`CartError::ProductNotFound`] for an unknown product, and
    /// [`CartError::InsufficientStock`] when the merged quantity exceeds
    /// current stock.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let product = self.catalog.product(&product_id).await.map_err(catalog_err)?;

        let mut unit = self.store.begin().await?;
        let mut cart = unit.cart_for_update(user_id).await?;

        let existing = cart.line(&product_id).map_or(0, |line| line.quantity);
        let merged = existing.saturating_add(quantity);
        if i64::from(merged) > product.stock {
            return Err(CartError::InsufficientStock {
                available: product.stock,
            });
        }

        cart.put_line(&product, merged);
        unit.put_cart(&cart).await?;
        unit.commit().await?;

        tracing::info!(%user_id, %product_id, quantity = merged, "cart line added");
        Ok(cart)
    }

    /// Set the quantity of an existing line. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotInCart`] if the product has no line, and
    /// otherwise re-validates against the catalog like
    /// [`Self::add_item`].
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        let mut unit = self.store.begin().await?;
        let mut cart = unit.cart_for_update(user_id).await?;

        if cart.line(&product_id).is_none() {
            return Err(CartError::ItemNotInCart);
        }

        if quantity == 0 {
            cart.remove_line(&product_id);
        } else {
            let product = self.catalog.product(&product_id).await.map_err(catalog_err)?;
            if i64::from(quantity) > product.stock {
                return Err(CartError::InsufficientStock {
                    available: product.stock,
                });
            }
            cart.put_line(&product, quantity);
        }

        unit.put_cart(&cart).await?;
        unit.commit().await?;

        tracing::info!(%user_id, %product_id, quantity, "cart line updated");
        Ok(cart)
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotInCart`] if the product has no line.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, CartError> {
        let mut unit = self.store.begin().await?;
        let mut cart = unit.cart_for_update(user_id).await?;

        if !cart.remove_line(&product_id) {
            return Err(CartError::ItemNotInCart);
        }

        unit.put_cart(&cart).await?;
        unit.commit().await?;

        tracing::info!(%user_id, %product_id, "cart line removed");
        Ok(cart)
    }

    /// Drop every line from the cart. Clearing an already-empty cart is a
    /// no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the write fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        let mut unit = self.store.begin().await?;
        unit.clear_cart(user_id).await?;
        unit.commit().await?;

        tracing::info!(%user_id, "cart cleared");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use copperleaf_core::UserId;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::catalog::{MemoryCatalog, Product};
    use crate::db::MemoryStore;

    fn service() -> (CartService<MemoryStore, MemoryCatalog>, MemoryCatalog) {
        let catalog = MemoryCatalog::new();
        catalog.insert(Product {
            id: ProductId::from("p-1"),
            name: "Widget".to_owned(),
            price: dec!(30.00),
            stock: 5,
        });
        (
            CartService::new(MemoryStore::new(), catalog.clone()),
            catalog,
        )
    }

    #[tokio::test]
    async fn test_add_merges_quantities_and_checks_merged_stock() {
        let (carts, _) = service();
        let user = UserId::new(1);

        let cart = carts
            .add_item(user, ProductId::from("p-1"), 2)
            .await
            .unwrap();
        assert_eq!(cart.line(&ProductId::from("p-1")).unwrap().quantity, 2);

        let cart = carts
            .add_item(user, ProductId::from("p-1"), 3)
            .await
            .unwrap();
        assert_eq!(cart.line(&ProductId::from("p-1")).unwrap().quantity, 5);

        // Stock is 5; one more would merge to 6.
        let err = carts
            .add_item(user, ProductId::from("p-1"), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CartError::InsufficientStock { available: 5 }
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_zero_quantity_and_unknown_product() {
        let (carts, _) = service();
        let user = UserId::new(1);

        assert!(matches!(
            carts
                .add_item(user, ProductId::from("p-1"), 0)
                .await
                .unwrap_err(),
            CartError::InvalidQuantity
        ));
        assert!(matches!(
            carts
                .add_item(user, ProductId::from("ghost"), 1)
                .await
                .unwrap_err(),
            CartError::ProductNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_update_missing_line_wins_over_unknown_product() {
        let (carts, _) = service();
        let user = UserId::new(1);

        // Even for a product the catalog has never heard of, an absent line
        // reports ItemNotInCart.
        let err = carts
            .update_item(user, ProductId::from("ghost"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::ItemNotInCart));
    }

    #[tokio::test]
    async fn test_update_zero_removes_line() {
        let (carts, _) = service();
        let user = UserId::new(1);
        carts
            .add_item(user, ProductId::from("p-1"), 2)
            .await
            .unwrap();

        let cart = carts
            .update_item(user, ProductId::from("p-1"), 0)
            .await
            .unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_update_refreshes_snapshots() {
        let (carts, catalog) = service();
        let user = UserId::new(1);
        carts
            .add_item(user, ProductId::from("p-1"), 2)
            .await
            .unwrap();

        catalog.set_price(&ProductId::from("p-1"), dec!(35.00));
        let cart = carts
            .update_item(user, ProductId::from("p-1"), 3)
            .await
            .unwrap();
        let line = cart.line(&ProductId::from("p-1")).unwrap();
        assert_eq!(line.unit_price, dec!(35.00));
        assert_eq!(line.quantity, 3);
    }

    #[tokio::test]
    async fn test_remove_missing_line() {
        let (carts, _) = service();
        let err = carts
            .remove_item(UserId::new(1), ProductId::from("p-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::ItemNotInCart));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (carts, _) = service();
        let user = UserId::new(1);

        carts.clear(user).await.unwrap();
        carts
            .add_item(user, ProductId::from("p-1"), 1)
            .await
            .unwrap();
        carts.clear(user).await.unwrap();
        assert!(carts.summary(user).await.unwrap().is_empty());
    }
}
