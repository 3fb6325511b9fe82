//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! Authentication is an extractor rather than a layer: routes opt in by
//! taking [`AuthUser`] as a handler argument.

pub mod auth;
pub mod request_id;

pub use auth::AuthUser;
pub use request_id::request_id_middleware;
