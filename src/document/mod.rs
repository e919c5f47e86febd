//! Document Module
//!
//! The entity stored in a collection table and its mapping to table rows.
//!
//! ## Physical Layout
//! ```text
//! ┌──────┬────────────┬─────────┬────────────┬────────────┬────────────┐
//! │  id  │ collection │ payload │ created_at │ updated_at │ deleted_at │
//! │ text │    text    │  jsonb  │   bigint   │   bigint   │   bigint   │
//! └──────┴────────────┴─────────┴────────────┴────────────┴────────────┘
//! ```
//!
//! Everything the caller stores lives in `payload`; the other columns are
//! maintained by the datastore.

mod codec;
mod model;

pub use codec::{check_payload_keys, decode_row, encode_payload};
pub use model::{Document, Payload, DEFAULT_COLLECTION};

/// Physical column names; a field with one of these names addresses the
/// column instead of a payload path
pub const RESERVED_KEYS: [&str; 5] = ["id", "collection", "created_at", "updated_at", "deleted_at"];

/// Columns in select order
pub const COLUMNS: &str = "id, collection, payload, created_at, updated_at, deleted_at";

/// Whether `key` names a physical column
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Whether `key` names one of the bigint timestamp columns
pub fn is_timestamp_column(key: &str) -> bool {
    matches!(key, "created_at" | "updated_at" | "deleted_at")
}
