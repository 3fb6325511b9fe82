//! Wallet API routes.
//!
//! JSON endpoints for reading the balance, adding funds and listing the
//! ledger. All amounts are decimal strings on the wire.

use axum::{
    Json,
    extract::{Query, State},
};
use copperleaf_core::Paginated;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::LedgerEntry;
use crate::routes::PageParams;
use crate::state::AppState;

/// Wallet balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
}

/// Get the current wallet balance.
///
/// GET /api/wallet
///
/// # Errors
///
/// Returns 404 if the user has never funded a wallet.
pub async fn balance(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<BalanceResponse>> {
    let balance = state.wallets().balance(user_id).await?;
    Ok(Json(BalanceResponse { balance }))
}

/// Request to add funds to the wallet.
#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub amount: Decimal,
}

/// Add funds to the wallet, creating it on first use.
///
/// POST /api/wallet/top-up
///
/// Responds with the resulting ledger entry, whose `balance_after` is the
/// new balance.
///
/// # Errors
///
/// Returns 400 for non-positive amounts or amounts over the per-transaction
/// cap.
pub async fn top_up(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<TopUpRequest>,
) -> Result<Json<LedgerEntry>> {
    let entry = state.wallets().top_up(user_id, req.amount).await?;
    Ok(Json(entry))
}

/// List the wallet's ledger entries, newest first.
///
/// GET /api/wallet/transactions?page=&page_size=
///
/// # Errors
///
/// Returns 404 if the user has never funded a wallet.
pub async fn transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<LedgerEntry>>> {
    let entries = state.wallets().history(user_id, params.page()).await?;
    Ok(Json(entries))
}
