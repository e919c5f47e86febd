//! Table bootstrap
//!
//! Idempotent DDL for a collection table and its indexes. Every statement
//! uses `IF NOT EXISTS`, so running it against an existing table is a no-op.

use crate::backend::{Backend, Statement};
use crate::document::DEFAULT_COLLECTION;
use crate::error::{DocstoreError, Operation, Result};
use crate::query::Table;

/// Index suffix and the column list (or method clause) it covers
const INDEXES: [(&str, &str); 5] = [
    ("collection", "(collection)"),
    ("collection_updated_at", "(collection, updated_at)"),
    ("collection_created_at", "(collection, created_at)"),
    ("collection_deleted_at", "(collection, deleted_at)"),
    ("payload_gin", "USING gin (payload)"),
];

/// The DDL for `table`, table first
pub fn bootstrap_statements(table: &Table) -> Vec<Statement> {
    let mut statements = Vec::with_capacity(INDEXES.len() + 1);

    statements.push(Statement::new(format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         id text PRIMARY KEY, \
         collection text DEFAULT '{}', \
         payload jsonb DEFAULT NULL, \
         created_at bigint DEFAULT 0, \
         updated_at bigint DEFAULT 0, \
         deleted_at bigint DEFAULT 0)",
        table.quoted(),
        DEFAULT_COLLECTION
    )));

    for (suffix, columns) in INDEXES {
        statements.push(Statement::new(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} {}",
            table.index_name(suffix),
            table.quoted(),
            columns
        )));
    }

    statements
}

/// Run the bootstrap DDL, stopping at the first failure
pub fn bootstrap(backend: &dyn Backend, table: &Table) -> Result<()> {
    for statement in bootstrap_statements(table) {
        tracing::debug!("[{}] bootstrap: {}", table.name(), statement.sql);
        backend
            .execute(&statement)
            .map_err(|e| DocstoreError::storage(Operation::Bootstrap, e))?;
    }

    tracing::info!("Collection table {} ready", table.name());
    Ok(())
}
