//! Statement builder
//!
//! Turns datastore requests into parameterized SQL against one collection
//! table.
//!
//! ## Interpolation Rules
//! - Table and index names come from a validated collection name and are
//!   always double-quoted
//! - Payload keys are emitted inside single-quoted literals with quotes
//!   doubled
//! - Caller values only ever travel as bound parameters
//! - Predicate fragments are passed through; their `:name` placeholders are
//!   rewritten to positional `$n`

use std::collections::BTreeMap;

use serde_json::Value;

use crate::backend::{SqlValue, Statement};
use crate::document::{encode_payload, is_reserved, is_timestamp_column, Document, Payload, COLUMNS};
use crate::error::{DocstoreError, Result};

use super::FilterOpts;

/// Longest accepted collection name; leaves room for the index suffixes
/// within PostgreSQL's 63-byte identifier limit
pub const MAX_NAME_LEN: usize = 40;

/// How an update combines the new payload with the stored one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Shallow union; supplied keys win, other stored keys are kept
    #[default]
    Merge,

    /// Stored payload is discarded
    Replace,
}

impl UpdateMode {
    pub fn from_replace(replace: bool) -> Self {
        if replace {
            UpdateMode::Replace
        } else {
            UpdateMode::Merge
        }
    }
}

// =============================================================================
// Identifiers and Fields
// =============================================================================

/// Check a collection name against `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= MAX_NAME_LEN {
        Ok(())
    } else {
        Err(DocstoreError::InvalidCollectionName(name.to_string()))
    }
}

/// SQL expression addressing `field`: the column itself for reserved names,
/// otherwise the text value at that key of the payload
pub fn field_expr(field: &str) -> String {
    if is_reserved(field) {
        field.to_string()
    } else {
        format!("payload->>{}", quote_literal(field))
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

// =============================================================================
// Named Parameters
// =============================================================================

/// Rewrite `:name` placeholders to `$n`, numbering from `first_index`
///
/// Repeated names share one position. `::` casts and anything inside single
/// or double quotes are left untouched.
pub fn bind_named(
    fragment: &str,
    params: &BTreeMap<String, Value>,
    first_index: usize,
) -> Result<(String, Vec<SqlValue>)> {
    let mut sql = String::with_capacity(fragment.len());
    let mut values: Vec<SqlValue> = Vec::new();
    let mut positions: BTreeMap<&str, usize> = BTreeMap::new();

    let bytes = fragment.as_bytes();
    let mut quote: Option<u8> = None;
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        if b == b'\'' || b == b'"' {
            quote = Some(b);
            i += 1;
            continue;
        }

        if b != b':' {
            i += 1;
            continue;
        }

        // `::type` cast
        if bytes.get(i + 1) == Some(&b':') {
            i += 2;
            continue;
        }

        let starts_name = bytes
            .get(i + 1)
            .map_or(false, |c| c.is_ascii_alphabetic() || *c == b'_');
        if !starts_name {
            i += 1;
            continue;
        }

        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
            end += 1;
        }
        let name = &fragment[start..end];

        let position = match positions.get(name) {
            Some(&p) => p,
            None => {
                let value = params
                    .get(name)
                    .ok_or_else(|| DocstoreError::MissingParameter(name.to_string()))?;
                values.push(SqlValue::from(value.clone()));
                let p = first_index + values.len() - 1;
                positions.insert(name, p);
                p
            }
        };

        sql.push_str(&fragment[copied..i]);
        sql.push('$');
        sql.push_str(&position.to_string());
        copied = end;
        i = end;
    }

    sql.push_str(&fragment[copied..]);

    Ok((sql, values))
}

// =============================================================================
// Table Statements
// =============================================================================

/// A validated, quoted collection table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    quoted: String,
}

/// A filter turned into SQL pieces shared by the count and select queries
#[derive(Debug, Clone, PartialEq)]
pub struct BoundFilter {
    pub where_clause: String,
    pub params: Vec<SqlValue>,
    pub order_clause: String,
    pub window: Option<(i64, i64)>,
}

impl Table {
    pub fn new(name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            quoted: format!("\"{}\"", name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Double-quoted table identifier
    pub fn quoted(&self) -> &str {
        &self.quoted
    }

    /// Double-quoted identifier for the index `<table>_<suffix>`
    pub fn index_name(&self, suffix: &str) -> String {
        format!("\"{}_{}\"", self.name, suffix)
    }

    pub fn insert(&self, doc: &Document) -> Statement {
        Statement::with_params(
            format!(
                "INSERT INTO {} (id, collection, payload, created_at, updated_at, deleted_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                self.quoted
            ),
            vec![
                SqlValue::Text(doc.id.clone()),
                SqlValue::Text(doc.collection.clone()),
                encode_payload(&doc.payload),
                SqlValue::Int(doc.created_at),
                SqlValue::Int(doc.updated_at),
                SqlValue::Int(doc.deleted_at),
            ],
        )
    }

    /// `updated_at` never moves backwards, even if the clock does
    pub fn update(&self, id: &str, payload: &Payload, mode: UpdateMode, now: i64) -> Statement {
        let payload_expr = match mode {
            UpdateMode::Merge => "COALESCE(payload, '{}'::jsonb) || $1",
            UpdateMode::Replace => "$1",
        };

        Statement::with_params(
            format!(
                "UPDATE {} SET payload = {}, updated_at = GREATEST(updated_at, $2) WHERE id = $3",
                self.quoted, payload_expr
            ),
            vec![
                encode_payload(payload),
                SqlValue::Int(now),
                SqlValue::Text(id.to_string()),
            ],
        )
    }

    /// Soft delete; already-deleted rows keep their original `deleted_at`
    pub fn soft_delete(&self, id: &str, now: i64) -> Statement {
        Statement::with_params(
            format!(
                "UPDATE {} SET deleted_at = $1, updated_at = GREATEST(updated_at, $1) \
                 WHERE id = $2 AND deleted_at = 0",
                self.quoted
            ),
            vec![SqlValue::Int(now), SqlValue::Text(id.to_string())],
        )
    }

    pub fn select_by_id(&self, id: &str) -> Statement {
        Statement::with_params(
            format!("SELECT {} FROM {} WHERE id = $1", COLUMNS, self.quoted),
            vec![SqlValue::Text(id.to_string())],
        )
    }

    /// Documents tagged `collection` whose `remote_key` equals the text `value`
    pub fn select_related(&self, collection: &str, remote_key: &str, value: String) -> Statement {
        let lhs = if is_timestamp_column(remote_key) {
            format!("CAST({} AS text)", remote_key)
        } else {
            field_expr(remote_key)
        };

        Statement::with_params(
            format!(
                "SELECT {} FROM {} WHERE collection = $1 AND {} = $2",
                COLUMNS, self.quoted, lhs
            ),
            vec![SqlValue::Text(collection.to_string()), SqlValue::Text(value)],
        )
    }

    /// Bind a normalized filter
    pub fn bind_filter(&self, opts: &FilterOpts) -> Result<BoundFilter> {
        let (where_clause, params) = if opts.predicate.is_empty() {
            (String::new(), Vec::new())
        } else {
            let (predicate, params) = bind_named(&opts.predicate, &opts.params, 1)?;
            (format!(" WHERE ({})", predicate), params)
        };

        let order_clause = if opts.order.is_empty() {
            String::new()
        } else {
            let sorts: Vec<String> = opts
                .order
                .iter()
                .map(|sort| {
                    let direction = sort.direction.trim().to_uppercase();
                    if direction.is_empty() {
                        field_expr(&sort.field)
                    } else {
                        format!("{} {}", field_expr(&sort.field), direction)
                    }
                })
                .collect();
            format!(" ORDER BY {}", sorts.join(", "))
        };

        let window = opts.paginate.then_some((opts.limit, opts.offset));

        Ok(BoundFilter {
            where_clause,
            params,
            order_clause,
            window,
        })
    }

    pub fn count(&self, filter: &BoundFilter) -> Statement {
        Statement::with_params(
            format!(
                "SELECT count(id) AS total FROM {}{}",
                self.quoted, filter.where_clause
            ),
            filter.params.clone(),
        )
    }

    pub fn select(&self, filter: &BoundFilter) -> Statement {
        let mut sql = format!(
            "SELECT {} FROM {}{}{}",
            COLUMNS, self.quoted, filter.where_clause, filter.order_clause
        );
        if let Some((limit, offset)) = filter.window {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }
        Statement::with_params(sql, filter.params.clone())
    }
}
