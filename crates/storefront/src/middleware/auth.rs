//! Bearer-token authentication extractor.
//!
//! The storefront does not manage credentials itself; callers present an
//! opaque token issued by the identity service and every API route resolves
//! it to a [`UserId`] through [`AuthUser`]. Wallet, cart and order rows are
//! keyed by that id, so the extractor is the only place a request's identity
//! is established.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use copperleaf_core::UserId;
use tracing::Span;

use crate::error::{AppError, set_sentry_user};
use crate::identity::IdentityProvider;
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// Rejects with 401 when the `Authorization` header is missing or
/// malformed, or when the identity service does not recognize the token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(State(state): State<AppState>, AuthUser(user_id): AuthUser) {
///     // user_id is the verified caller
/// }
/// ```
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_owned()))?;

        let user_id = state.identity().resolve(token).await?;

        // Tie the rest of the request's telemetry to the caller.
        Span::current().record("user_id", user_id.as_i32());
        set_sentry_user(user_id);

        Ok(Self(user_id))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/api/wallet");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extraction() {
        let parts = parts_with_auth(Some("Bearer tok-123"));
        assert_eq!(bearer_token(&parts), Some("tok-123"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token(&parts_with_auth(None)), None);
        assert_eq!(bearer_token(&parts_with_auth(Some("Basic dXNlcg=="))), None);
        assert_eq!(bearer_token(&parts_with_auth(Some("bearer tok"))), None);
    }
}
