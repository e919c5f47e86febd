//! Filter specification
//!
//! What a caller asks `Datastore::filter` for: a predicate fragment, its
//! named parameters, sort directives and the pagination window.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One ORDER BY directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// Physical column name or payload key
    pub field: String,

    /// Passed to the engine upper-cased (`ASC`/`DESC`)
    pub direction: String,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: direction.into(),
        }
    }
}

/// Filter options
///
/// The predicate is a boolean SQL expression (no `WHERE` keyword) written by
/// the caller and passed through verbatim, with values referenced as
/// `:name` placeholders bound from `params`. Collection scoping is part of
/// the predicate; nothing is added implicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOpts {
    pub predicate: String,
    pub params: BTreeMap<String, Value>,
    pub order: Vec<Sort>,
    pub offset: i64,
    pub limit: i64,
    /// Apply `limit`/`offset`; when false every matching row is returned
    pub paginate: bool,
}

impl Default for FilterOpts {
    fn default() -> Self {
        Self {
            predicate: String::new(),
            params: BTreeMap::new(),
            order: Vec::new(),
            offset: 0,
            limit: 0,
            paginate: true,
        }
    }
}

impl FilterOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the predicate fragment
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = predicate.into();
        self
    }

    /// Bind a value to the `:name` placeholder
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Append a sort directive
    pub fn order_by(mut self, field: impl Into<String>, direction: impl Into<String>) -> Self {
        self.order.push(Sort::new(field, direction));
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn paginate(mut self, paginate: bool) -> Self {
        self.paginate = paginate;
        self
    }

    /// Point the window at a 1-based page number
    ///
    /// A non-positive limit is first defaulted to `default_limit`; pages
    /// below 1 clamp to the first page.
    pub fn offset_from_page(&mut self, page: i64, default_limit: i64) {
        if self.limit < 1 {
            self.limit = default_limit;
        }

        self.offset = (page - 1).saturating_mul(self.limit).max(0);
    }

    /// Trim the predicate and fill in the window defaults
    pub(crate) fn normalize(&mut self, default_limit: i64) {
        self.predicate = self.predicate.trim().to_string();

        if self.limit < 1 {
            self.limit = default_limit;
        }

        if self.offset < 0 {
            self.offset = 0;
        }
    }
}
