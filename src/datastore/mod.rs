//! Datastore Module
//!
//! Per-collection accessor over one backing table.
//!
//! ## Responsibilities
//! - Bootstrap the table and its indexes (idempotent)
//! - Create, update, soft-delete and fetch documents
//! - Run filters: count, sort, window, pager
//! - Resolve relation descriptors for returned documents

mod relation;
mod schema;
mod store;

pub use relation::Relation;
pub use schema::{bootstrap, bootstrap_statements};
pub use store::Datastore;
