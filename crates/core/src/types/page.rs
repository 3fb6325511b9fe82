//! Pagination primitives shared by list endpoints and repositories.

use serde::{Deserialize, Serialize};

/// A validated page request.
///
/// Page numbers are 1-based. Construction clamps out-of-range input instead
/// of failing: page 0 becomes page 1, a zero or oversized page size is pulled
/// into `1..=MAX_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    number: u32,
    size: u32,
}

impl Page {
    /// Page size used when the client does not ask for one.
    pub const DEFAULT_SIZE: u32 = 20;
    /// Upper bound on the page size a client may request.
    pub const MAX_SIZE: u32 = 100;

    /// Create a page request, clamping out-of-range values.
    #[must_use]
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }

    /// 1-based page number.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Items per page.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// SQL `LIMIT` value.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    /// SQL `OFFSET` value.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_SIZE)
    }
}

/// One page of results plus the metadata needed to render pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<T> Paginated<T> {
    /// Assemble a page of results from the items and the total row count.
    #[must_use]
    pub fn new(items: Vec<T>, page: Page, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(u64::from(page.size()));
        Self {
            items,
            page: page.number(),
            page_size: page.size(),
            total_items,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        }
    }
}
