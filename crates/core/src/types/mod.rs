//! Core types for Copperleaf.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod currency;
pub mod email;
pub mod id;
pub mod page;
pub mod status;

pub use currency::CurrencyCode;
pub use email::{Email, EmailError};
pub use id::*;
pub use page::{Page, Paginated};
pub use status::{EntryKind, OrderStatus};
