//! Checkout API routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{Order, ShippingDetailsInput};
use crate::services::CheckoutSummary;
use crate::state::AppState;

/// Quote the current cart without committing anything.
///
/// GET /api/checkout
///
/// Prices come from the live catalog, not the cart snapshots, so the quote
/// matches what `POST /api/checkout` would charge right now.
///
/// # Errors
///
/// Returns 400 for an empty cart and 404 when a cart line references a
/// product the catalog no longer has.
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CheckoutSummary>> {
    let summary = state.checkouts().summary(user_id).await?;
    Ok(Json(summary))
}

/// Request to place an order.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_details: ShippingDetailsInput,
}

/// Place the order: reprice, debit the wallet, persist the order and clear
/// the cart atomically.
///
/// POST /api/checkout
///
/// # Errors
///
/// Returns 400 for an empty cart or invalid shipping details, 402 when the
/// wallet cannot cover the total, 409 for stock shortfalls or exhausted
/// concurrency retries.
pub async fn process(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state
        .checkouts()
        .process(user_id, req.shipping_details)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}
