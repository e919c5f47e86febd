//! # docstore
//!
//! A schemaless document store on top of PostgreSQL JSONB columns:
//! - One table per collection, bootstrapped on first use
//! - Documents are an opaque JSON payload plus identity and timestamps
//! - Filters with caller predicates, named parameters, payload-path sorting
//!   and pagination
//! - Merge or replace updates, soft delete
//! - Relation descriptors resolved at query time
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Manager                              │
//! │              (name → Datastore, opened once)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Datastore                             │
//! │     create / update / delete / get / filter / relations      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Query    │          │  Document   │
//!   │ (SQL, pager)│          │   (codec)   │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │   Backend   │
//!   │ (PostgreSQL)│
//!   └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use docstore::{Config, Document, FilterOpts, Manager};
//!
//! # fn main() -> docstore::Result<()> {
//! let manager = Manager::connect(Config::builder().database_url("postgres://localhost/app").build())?;
//! let posts = manager.get("posts")?;
//!
//! let mut doc = Document::new("posts").with("title", "hello").with("score", 3);
//! posts.create(&mut doc)?;
//!
//! let page = posts.filter(
//!     FilterOpts::new()
//!         .predicate("collection = :c")
//!         .param("c", "posts")
//!         .order_by("score", "desc")
//!         .limit(20),
//! )?;
//! println!("{} of {}", page.hits.len(), page.total);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod backend;
pub mod document;
pub mod query;
pub mod datastore;
pub mod manager;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DocstoreError, Operation, Result};
pub use config::Config;
pub use backend::{Backend, Row, SqlValue, Statement};
pub use document::{Document, Payload};
pub use query::{FilterOpts, FilterResult, Pager, Sort, UpdateMode};
pub use datastore::{Datastore, Relation};
pub use manager::Manager;

#[cfg(feature = "postgres")]
pub use backend::PgBackend;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of docstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
