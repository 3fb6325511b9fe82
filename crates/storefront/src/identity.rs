//! Identity provider client.
//!
//! Resolves the opaque bearer tokens carried by API requests to stable user
//! ids. Successful introspections are cached for a short window (`moka`) so a
//! busy client does not hit the identity service on every request; rejected
//! tokens are never cached and get re-checked each time.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use copperleaf_core::UserId;
use moka::future::Cache;
use serde::Deserialize;
use thiserror::Error;

/// How long a resolved token stays cached.
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(60);

/// Upper bound on cached tokens.
const TOKEN_CACHE_CAPACITY: u64 = 10_000;

/// Errors that can occur when resolving a token.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The identity provider rejected the token.
    #[error("token not recognized by the identity provider")]
    Unauthorized,

    /// The identity provider answered with an unexpected status.
    #[error("identity provider returned unexpected status: {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

/// Token-to-user resolution.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to the user it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Unauthorized`] for unknown or expired
    /// tokens, or a transport error if the provider is unreachable.
    async fn resolve(&self, token: &str) -> Result<UserId, IdentityError>;
}

/// Client for the identity provider's introspection endpoint.
#[derive(Clone)]
pub struct HttpIdentity {
    inner: Arc<HttpIdentityInner>,
}

struct HttpIdentityInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, UserId>,
}

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    user_id: i32,
}

impl HttpIdentity {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(TOKEN_CACHE_CAPACITY)
            .time_to_live(TOKEN_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(HttpIdentityInner {
                client,
                base_url: base_url.trim_end_matches('/').to_owned(),
                cache,
            }),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentity {
    async fn resolve(&self, token: &str) -> Result<UserId, IdentityError> {
        if let Some(user_id) = self.inner.cache.get(token).await {
            return Ok(user_id);
        }

        let url = format!("{}/sessions/introspect", self.inner.base_url);
        let response = self.inner.client.get(&url).bearer_auth(token).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(IdentityError::Unauthorized);
        }
        if !status.is_success() {
            return Err(IdentityError::UnexpectedStatus(status));
        }

        let body = response.json::<IntrospectionResponse>().await?;
        let user_id = UserId::new(body.user_id);
        self.inner.cache.insert(token.to_owned(), user_id).await;
        Ok(user_id)
    }
}

/// In-memory identity provider for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentity {
    tokens: Arc<RwLock<HashMap<String, UserId>>>,
}

impl MemoryIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a user.
    pub fn issue(&self, token: impl Into<String>, user_id: UserId) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), user_id);
    }

    /// Invalidate a token.
    pub fn revoke(&self, token: &str) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn resolve(&self, token: &str) -> Result<UserId, IdentityError> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .copied()
            .ok_or(IdentityError::Unauthorized)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_identity_issue_and_revoke() {
        let identity = MemoryIdentity::new();
        identity.issue("tok-alice", UserId::new(1));

        assert_eq!(
            identity.resolve("tok-alice").await.unwrap(),
            UserId::new(1)
        );

        identity.revoke("tok-alice");
        assert!(matches!(
            identity.resolve("tok-alice").await.unwrap_err(),
            IdentityError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let identity = MemoryIdentity::new();
        assert!(matches!(
            identity.resolve("nope").await.unwrap_err(),
            IdentityError::Unauthorized
        ));
    }
}
