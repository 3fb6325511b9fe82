//! Order API routes.
//!
//! Orders are immutable once placed; these endpoints only read. Both are
//! scoped to the authenticated user, so another user's order id behaves
//! exactly like a missing one.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use copperleaf_core::{OrderId, Paginated};

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::Order;
use crate::routes::PageParams;
use crate::state::AppState;

/// List the user's orders, newest first.
///
/// GET /api/orders?page=&page_size=
///
/// # Errors
///
/// Returns 500 if the read fails.
pub async fn index(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<Order>>> {
    let orders = state.store().orders_page(user_id, params.page()).await?;
    Ok(Json(orders))
}

/// Get one of the user's orders.
///
/// GET /api/orders/{order_id}
///
/// # Errors
///
/// Returns 404 when the order does not exist or belongs to someone else.
pub async fn show(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = state
        .store()
        .order_by_id(user_id, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    Ok(Json(order))
}
