//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side failures to
//! Sentry before responding to the client. All route handlers should return
//! `Result<T, AppError>`. Responses are JSON (`{"error": "<message>"}`);
//! business failures keep their domain message, infrastructure failures are
//! reduced to a generic one.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::db::StoreError;
use crate::identity::IdentityError;
use crate::services::{CartError, CheckoutError, WalletError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Catalog lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Token introspection failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Wallet operation failed.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Checkout operation failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Conflict => StatusCode::CONFLICT,
        StoreError::Database(_)
        | StoreError::Backend(_)
        | StoreError::DataCorruption(_)
        | StoreError::Invariant(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => store_status(err),
            Self::Catalog(err) => match err {
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Http(_) | CatalogError::UnexpectedStatus(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::Identity(err) => match err {
                IdentityError::Unauthorized => StatusCode::UNAUTHORIZED,
                IdentityError::Http(_) | IdentityError::UnexpectedStatus(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::Wallet(err) => match err {
                WalletError::WalletNotFound => StatusCode::NOT_FOUND,
                WalletError::InvalidAmount | WalletError::AmountOverCap { .. } => {
                    StatusCode::BAD_REQUEST
                }
                WalletError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
                WalletError::Store(err) => store_status(err),
            },
            Self::Cart(err) => match err {
                CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
                CartError::ProductNotFound(_) | CartError::ItemNotInCart => StatusCode::NOT_FOUND,
                CartError::InsufficientStock { .. } => StatusCode::CONFLICT,
                CartError::Catalog(_) => StatusCode::BAD_GATEWAY,
                CartError::Store(err) => store_status(err),
            },
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart | CheckoutError::InvalidShippingDetails(_) => {
                    StatusCode::BAD_REQUEST
                }
                CheckoutError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::InsufficientStock { .. } | CheckoutError::Conflict => {
                    StatusCode::CONFLICT
                }
                CheckoutError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
                CheckoutError::Catalog(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::Store(err) => store_status(err),
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_owned()
        } else if status == StatusCode::BAD_GATEWAY {
            "External service error".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a resolved user id.
///
/// Called by the auth extractor so server errors are associated with the
/// user whose request triggered them.
pub fn set_sentry_user(user_id: copperleaf_core::UserId) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 42".to_owned());
        assert_eq!(err.to_string(), "Not found: order 42");

        let err = AppError::BadRequest("invalid input".to_owned());
        assert_eq!(err.to_string(), "Bad request: invalid input");

        // Transparent wrappers surface the domain message untouched.
        let err = AppError::from(WalletError::WalletNotFound);
        assert_eq!(err.to_string(), "wallet not found");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_owned())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::from(IdentityError::Unauthorized)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::from(WalletError::InsufficientFunds {
                requested: dec!(64.20),
                available: dec!(10.00),
            })),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            get_status(AppError::from(WalletError::AmountOverCap {
                cap: dec!(1000.00)
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::from(CartError::InsufficientStock { available: 3 })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::from(CartError::ItemNotInCart)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::from(CheckoutError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::from(CheckoutError::InsufficientFunds {
                shortfall: dec!(54.20)
            })),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            get_status(AppError::from(CheckoutError::Conflict)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::from(StoreError::Conflict)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::from(StoreError::Backend("pool down".to_owned()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        // Infrastructure faults wrapped by a service still map to 500.
        assert_eq!(
            get_status(AppError::from(WalletError::Store(StoreError::Invariant(
                "balance".to_owned()
            )))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
