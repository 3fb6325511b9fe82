//! Cart integration tests.
//!
//! Exercises cart mutations against live catalog state: add merges
//! quantities, update replaces them, both are gated on current stock, and
//! line snapshots refresh whenever a line is touched.

#![allow(clippy::unwrap_used)]

use copperleaf_core::UserId;
use copperleaf_integration_tests::TestContext;
use copperleaf_storefront::services::CartError;
use rust_decimal_macros::dec;

// =============================================================================
// Adding Lines
// =============================================================================

#[tokio::test]
async fn test_add_merges_into_existing_line() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let pen = ctx.seed_product("pen", dec!(2.50), 10);

    ctx.carts.add_item(user, pen.clone(), 2).await.unwrap();
    let cart = ctx.carts.add_item(user, pen.clone(), 3).await.unwrap();

    assert_eq!(cart.lines.len(), 1);
    let line = cart.line(&pen).unwrap();
    assert_eq!(line.quantity, 5);
    assert_eq!(line.unit_price, dec!(2.50));
}

#[tokio::test]
async fn test_add_rejects_merged_quantity_over_stock() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let pen = ctx.seed_product("pen", dec!(2.50), 4);

    ctx.carts.add_item(user, pen.clone(), 3).await.unwrap();
    let err = ctx.carts.add_item(user, pen.clone(), 2).await.unwrap_err();
    assert!(matches!(err, CartError::InsufficientStock { available: 4 }));

    // The refused add leaves the existing line untouched.
    let cart = ctx.carts.summary(user).await.unwrap();
    assert_eq!(cart.line(&pen).unwrap().quantity, 3);
}

#[tokio::test]
async fn test_add_unknown_product() {
    let ctx = TestContext::new();
    let err = ctx
        .carts
        .add_item(UserId::new(1), "ghost".into(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::ProductNotFound(_)));
}

#[tokio::test]
async fn test_add_zero_quantity() {
    let ctx = TestContext::new();
    let pen = ctx.seed_product("pen", dec!(2.50), 10);
    let err = ctx
        .carts
        .add_item(UserId::new(1), pen, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::InvalidQuantity));
}

// =============================================================================
// Updating and Removing Lines
// =============================================================================

#[tokio::test]
async fn test_update_replaces_quantity() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let pen = ctx.seed_product("pen", dec!(2.50), 10);

    ctx.carts.add_item(user, pen.clone(), 2).await.unwrap();
    let cart = ctx.carts.update_item(user, pen.clone(), 7).await.unwrap();
    assert_eq!(cart.line(&pen).unwrap().quantity, 7);
}

#[tokio::test]
async fn test_update_to_zero_removes_the_line() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let pen = ctx.seed_product("pen", dec!(2.50), 10);

    ctx.carts.add_item(user, pen.clone(), 2).await.unwrap();
    let cart = ctx.carts.update_item(user, pen, 0).await.unwrap();
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_update_respects_current_stock() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let pen = ctx.seed_product("pen", dec!(2.50), 10);

    ctx.carts.add_item(user, pen.clone(), 2).await.unwrap();
    ctx.catalog.set_stock(&pen, 5);

    let err = ctx.carts.update_item(user, pen, 6).await.unwrap_err();
    assert!(matches!(err, CartError::InsufficientStock { available: 5 }));
}

#[tokio::test]
async fn test_update_missing_line() {
    let ctx = TestContext::new();
    let pen = ctx.seed_product("pen", dec!(2.50), 10);
    let err = ctx
        .carts
        .update_item(UserId::new(1), pen, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::ItemNotInCart));
}

#[tokio::test]
async fn test_remove_and_clear() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let pen = ctx.seed_product("pen", dec!(2.50), 10);
    let ink = ctx.seed_product("ink", dec!(8.00), 10);

    ctx.carts.add_item(user, pen.clone(), 1).await.unwrap();
    ctx.carts.add_item(user, ink.clone(), 1).await.unwrap();

    let cart = ctx.carts.remove_item(user, pen).await.unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert!(cart.line(&ink).is_some());

    ctx.carts.clear(user).await.unwrap();
    assert!(ctx.carts.summary(user).await.unwrap().is_empty());

    // Clearing an already-empty cart is a no-op, not an error.
    ctx.carts.clear(user).await.unwrap();
}

#[tokio::test]
async fn test_remove_missing_line() {
    let ctx = TestContext::new();
    let err = ctx
        .carts
        .remove_item(UserId::new(1), "ghost".into())
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::ItemNotInCart));
}

// =============================================================================
// Snapshots and Totals
// =============================================================================

#[tokio::test]
async fn test_touching_a_line_refreshes_its_snapshot() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let pen = ctx.seed_product("pen", dec!(2.50), 10);

    ctx.carts.add_item(user, pen.clone(), 1).await.unwrap();
    ctx.catalog.set_price(&pen, dec!(3.00));

    // The next add re-reads the catalog and refreshes the stored snapshot.
    let cart = ctx.carts.add_item(user, pen.clone(), 1).await.unwrap();
    assert_eq!(cart.line(&pen).unwrap().unit_price, dec!(3.00));
}

#[tokio::test]
async fn test_totals_sum_quantities_and_prices() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let pen = ctx.seed_product("pen", dec!(2.50), 10);
    let ink = ctx.seed_product("ink", dec!(8.00), 10);

    ctx.carts.add_item(user, pen, 3).await.unwrap();
    let cart = ctx.carts.add_item(user, ink, 2).await.unwrap();

    let totals = cart.totals();
    assert_eq!(totals.total_items, 5);
    assert_eq!(totals.total_price, dec!(23.50));
}

#[tokio::test]
async fn test_carts_are_scoped_to_the_user() {
    let ctx = TestContext::new();
    let alice = UserId::new(1);
    let bob = UserId::new(2);
    let pen = ctx.seed_product("pen", dec!(2.50), 10);

    ctx.carts.add_item(alice, pen, 1).await.unwrap();

    assert!(ctx.carts.summary(bob).await.unwrap().is_empty());
    assert!(!ctx.carts.summary(alice).await.unwrap().is_empty());
}
