//! Order history integration tests.
//!
//! Orders only ever come out of checkout, so each fixture runs the full
//! flow and then reads back through the store the way the API handlers do.

#![allow(clippy::unwrap_used)]

use copperleaf_core::{OrderId, Page, ProductId, UserId};
use copperleaf_integration_tests::{TestContext, shipping_input};
use copperleaf_storefront::db::Store;
use copperleaf_storefront::models::Order;
use rust_decimal_macros::dec;

async fn place_order(ctx: &TestContext, user: UserId, product: &ProductId) -> Order {
    ctx.carts.add_item(user, product.clone(), 1).await.unwrap();
    ctx.checkouts
        .process(user, shipping_input())
        .await
        .unwrap()
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_orders_page_newest_first() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let book = ctx.seed_product("book", dec!(30.00), 50);
    ctx.fund_wallet(user, dec!(500.00)).await;

    let oldest = place_order(&ctx, user, &book).await;
    let middle = place_order(&ctx, user, &book).await;
    let newest = place_order(&ctx, user, &book).await;

    let first = ctx.store.orders_page(user, Page::new(1, 2)).await.unwrap();
    assert_eq!(first.total_items, 3);
    assert_eq!(first.total_pages, 2);
    let ids: Vec<OrderId> = first.items.iter().map(|order| order.id).collect();
    assert_eq!(ids, [newest.id, middle.id]);

    let second = ctx.store.orders_page(user, Page::new(2, 2)).await.unwrap();
    let ids: Vec<OrderId> = second.items.iter().map(|order| order.id).collect();
    assert_eq!(ids, [oldest.id]);
}

#[tokio::test]
async fn test_orders_page_of_a_user_with_no_orders() {
    let ctx = TestContext::new();
    let page = ctx
        .store
        .orders_page(UserId::new(1), Page::default())
        .await
        .unwrap();
    assert_eq!(page.total_items, 0);
    assert!(page.items.is_empty());
}

// =============================================================================
// Access Scoping
// =============================================================================

#[tokio::test]
async fn test_order_lookup_is_scoped_to_the_owner() {
    let ctx = TestContext::new();
    let alice = UserId::new(1);
    let bob = UserId::new(2);
    let book = ctx.seed_product("book", dec!(30.00), 50);
    ctx.fund_wallet(alice, dec!(100.00)).await;

    let order = place_order(&ctx, alice, &book).await;

    // Bob's lookup of Alice's order is indistinguishable from a miss.
    assert!(ctx.store.order_by_id(bob, order.id).await.unwrap().is_none());
    assert!(
        ctx.store
            .order_by_id(alice, order.id)
            .await
            .unwrap()
            .is_some()
    );
    assert!(
        ctx.store
            .orders_page(bob, Page::default())
            .await
            .unwrap()
            .items
            .is_empty()
    );
}

#[tokio::test]
async fn test_unknown_order_id() {
    let ctx = TestContext::new();
    let missing = ctx
        .store
        .order_by_id(UserId::new(1), OrderId::new(999))
        .await
        .unwrap();
    assert!(missing.is_none());
}

// =============================================================================
// Immutability
// =============================================================================

#[tokio::test]
async fn test_order_keeps_its_prices_after_catalog_changes() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let book = ctx.seed_product("book", dec!(30.00), 50);
    ctx.fund_wallet(user, dec!(100.00)).await;

    let order = place_order(&ctx, user, &book).await;

    // 30.00 + 5.99 shipping + 2.10 tax.
    assert_eq!(order.total_amount, dec!(38.09));

    ctx.catalog.set_price(&book, dec!(99.00));

    let stored = ctx.store.order_by_id(user, order.id).await.unwrap().unwrap();
    assert_eq!(stored.items.first().unwrap().unit_price, dec!(30.00));
    assert_eq!(stored.total_amount, dec!(38.09));
}
