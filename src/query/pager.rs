//! Pagination metadata and filter results

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_LIMIT;
use crate::document::Document;

/// Sentinel for "no such page"
pub const NO_PAGE: i64 = -1;

/// Pagination metadata derived from `(total, limit, offset)`
///
/// `pages` counts one page more than the exact division even when `total`
/// is a multiple of `limit` (10 rows at limit 10 report 2 pages). Existing
/// clients depend on it. That notional trailing page is never offered as
/// `next`: a next page must start before `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pager {
    pub pages: u64,
    pub current: i64,
    pub next: i64,
    pub prev: i64,
}

impl Pager {
    /// Compute the pager; a non-positive limit counts as the default limit
    pub fn compute(total: u64, limit: i64, offset: i64) -> Self {
        let limit = if limit < 1 { DEFAULT_LIMIT } else { limit };

        let pages = if total < 1 {
            0
        } else {
            total / limit as u64 + 1
        };

        let current = (offset / limit).saturating_add(1);

        let mut next = current.saturating_add(1);
        let next_start = current.saturating_mul(limit);
        if next < 0 || next as u64 > pages || next_start < 0 || next_start as u64 >= total {
            next = NO_PAGE;
        }

        let mut prev = current - 1;
        if prev < 1 {
            prev = NO_PAGE;
        }

        Self {
            pages,
            current,
            next,
            prev,
        }
    }

    pub fn has_next(&self) -> bool {
        self.next != NO_PAGE
    }

    pub fn has_prev(&self) -> bool {
        self.prev != NO_PAGE
    }
}

/// Result of a filter call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    /// Matching documents, ignoring the window
    pub total: u64,

    /// Documents in the requested window, in sort order
    pub hits: Vec<Document>,

    /// Zero when the filter was not paginated
    pub pager: Pager,
}
