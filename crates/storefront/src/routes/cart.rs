//! Cart API routes.
//!
//! Every mutation responds with the full updated cart so clients never need
//! a follow-up read to stay in sync.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use copperleaf_core::ProductId;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{Cart, CartTotals};
use crate::state::AppState;

/// Cart with derived totals.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: Cart,
    pub totals: CartTotals,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        let totals = cart.totals();
        Self { cart, totals }
    }
}

/// Get the current cart.
///
/// GET /api/cart
///
/// Totals are computed from the stored price snapshots; checkout reprices
/// from the live catalog.
///
/// # Errors
///
/// Returns 500 if the stored cart cannot be read.
pub async fn show(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CartResponse>> {
    let cart = state.carts().summary(user_id).await?;
    Ok(Json(cart.into()))
}

/// Request to add an item to the cart.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Add a product to the cart, merging quantities with any existing line.
///
/// POST /api/cart/items
///
/// # Errors
///
/// Returns 400 for a zero quantity, 404 for an unknown product and 409 when
/// the merged quantity exceeds the available stock.
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>> {
    let cart = state
        .carts()
        .add_item(user_id, req.product_id, req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// Request to set a cart line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// Set the quantity of a line already in the cart. Zero removes the line.
///
/// PUT /api/cart/items/{product_id}
///
/// # Errors
///
/// Returns 404 when the line is not in the cart and 409 when the requested
/// quantity exceeds the available stock.
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(product_id): Path<ProductId>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>> {
    let cart = state
        .carts()
        .update_item(user_id, product_id, req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// Remove a line from the cart.
///
/// DELETE /api/cart/items/{product_id}
///
/// # Errors
///
/// Returns 404 when the line is not in the cart.
pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartResponse>> {
    let cart = state.carts().remove_item(user_id, product_id).await?;
    Ok(Json(cart.into()))
}

/// Empty the cart. Idempotent.
///
/// DELETE /api/cart
///
/// # Errors
///
/// Returns 500 if the write fails.
pub async fn clear(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> Result<StatusCode> {
    state.carts().clear(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
