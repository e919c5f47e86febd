//! Query Module
//!
//! Builds the SQL a datastore issues and derives pagination metadata.
//!
//! ## Responsibilities
//! - Filter specification and its normalization
//! - Field resolution: reserved names address columns, everything else a
//!   payload path
//! - Named parameter binding for caller predicates
//! - Pager arithmetic

mod builder;
mod filter;
mod pager;

pub use builder::{
    bind_named, field_expr, validate_name, BoundFilter, Table, UpdateMode, MAX_NAME_LEN,
};
pub use filter::{FilterOpts, Sort};
pub use pager::{FilterResult, Pager, NO_PAGE};
