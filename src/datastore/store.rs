//! Collection datastore
//!
//! One `Datastore` per collection table. It translates document operations
//! into statements, runs them on the shared backend and maps rows back into
//! documents.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::backend::{Backend, Row, SqlValue, Statement};
use crate::config::Config;
use crate::document::{check_payload_keys, decode_row, Document, Payload, DEFAULT_COLLECTION};
use crate::error::{DocstoreError, Operation, Result};
use crate::query::{FilterOpts, FilterResult, Pager, Table, UpdateMode};

use super::relation::Relation;
use super::schema;

/// Accessor for one collection table
///
/// ## Concurrency:
/// - Every operation takes `&self`; the backend pool serializes nothing
/// - `relations`: RwLock, written only when a relation is registered
/// - Consistency between concurrent writers is the backing engine's job
pub struct Datastore {
    /// Validated, quoted table name
    table: Table,

    /// Shared handle to the backing engine
    backend: Arc<dyn Backend>,

    /// Limit applied when a filter has none
    default_limit: i64,

    /// Relation descriptors by name
    relations: RwLock<BTreeMap<String, Relation>>,
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore")
            .field("table", &self.table)
            .field("default_limit", &self.default_limit)
            .finish_non_exhaustive()
    }
}

impl Datastore {
    /// Open the datastore for `name`, creating its table and indexes if
    /// needed
    pub fn open(name: &str, backend: Arc<dyn Backend>) -> Result<Self> {
        Self::open_with_config(name, backend, &Config::default())
    }

    /// Open with explicit configuration
    ///
    /// A bootstrap failure is returned as-is; no datastore is produced.
    pub fn open_with_config(name: &str, backend: Arc<dyn Backend>, config: &Config) -> Result<Self> {
        config.validate()?;
        let table = Table::new(name)?;

        schema::bootstrap(backend.as_ref(), &table)?;

        Ok(Self {
            table,
            backend,
            default_limit: config.default_limit,
            relations: RwLock::new(BTreeMap::new()),
        })
    }

    /// Insert a new document
    ///
    /// Assigns a fresh id, `created_at = updated_at = now` and
    /// `deleted_at = 0` on `doc` itself. An empty collection tag becomes
    /// `"default"`. If the insert fails, `doc` is left as it was.
    pub fn create(&self, doc: &mut Document) -> Result<()> {
        check_payload_keys(&doc.payload)?;

        let id = generate_id()?;
        let now = now_nanos();

        let previous = (
            std::mem::replace(&mut doc.id, id),
            doc.collection.clone(),
            doc.created_at,
            doc.updated_at,
            doc.deleted_at,
        );

        if doc.collection.is_empty() {
            doc.collection = DEFAULT_COLLECTION.to_string();
        }
        doc.created_at = now;
        doc.updated_at = now;
        doc.deleted_at = 0;

        let statement = self.table.insert(doc);
        if let Err(e) = self.execute(Operation::Create, &statement) {
            doc.id = previous.0;
            doc.collection = previous.1;
            doc.created_at = previous.2;
            doc.updated_at = previous.3;
            doc.deleted_at = previous.4;
            return Err(e);
        }

        Ok(())
    }

    /// Update a document's payload and return it as stored afterwards
    pub fn update(&self, id: &str, payload: Payload, mode: UpdateMode) -> Result<Document> {
        check_payload_keys(&payload)?;

        let statement = self.table.update(id, &payload, mode, now_nanos());
        self.execute(Operation::Update, &statement)?;

        self.get(id)
    }

    /// Soft-delete a document and return it as stored afterwards
    ///
    /// Deleting an already-deleted document keeps its first `deleted_at`.
    pub fn delete(&self, id: &str) -> Result<Document> {
        let statement = self.table.soft_delete(id, now_nanos());
        self.execute(Operation::Delete, &statement)?;

        self.get(id)
    }

    /// Fetch a document by id
    pub fn get(&self, id: &str) -> Result<Document> {
        let rows = self.query(Operation::Get, &self.table.select_by_id(id))?;

        match rows.first() {
            Some(row) => decode_row(row),
            None => Err(DocstoreError::NotFound {
                collection: self.name().to_string(),
                id: id.to_string(),
            }),
        }
    }

    /// Fetch a document by id with its relations loaded
    pub fn get_with_relations(&self, id: &str) -> Result<Document> {
        let mut doc = self.get(id)?;
        let relations = self.relations();
        self.attach_relations(&mut doc, &relations)?;
        Ok(doc)
    }

    /// Run a filter
    ///
    /// Steps:
    /// 1. Normalize the options (trim predicate, default the window)
    /// 2. Count every match, ignoring the window
    /// 3. Select the window (or everything when not paginating)
    /// 4. Load relations for each hit
    /// 5. Derive the pager
    ///
    /// Any failing round trip aborts the whole call.
    pub fn filter(&self, opts: FilterOpts) -> Result<FilterResult> {
        // Step 1: Normalize and bind
        let mut opts = opts;
        opts.normalize(self.default_limit);
        let bound = self.table.bind_filter(&opts)?;

        // Step 2: Total, independent of the window
        let count_rows = self.query(Operation::Count, &self.table.count(&bound))?;
        let total = count_rows
            .first()
            .and_then(|row| row.get("total"))
            .and_then(SqlValue::as_i64)
            .ok_or_else(|| {
                DocstoreError::Serialization(format!("[{}] count returned no integer total", self.name()))
            })?
            .max(0) as u64;

        // Step 3: The page itself
        let rows = self.query(Operation::Filter, &self.table.select(&bound))?;

        // Step 4: Documents and their relations
        let relations = self.relations();
        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut doc = decode_row(row)?;
            self.attach_relations(&mut doc, &relations)?;
            hits.push(doc);
        }

        // Step 5: Pager only describes a windowed result
        let pager = if opts.paginate {
            Pager::compute(total, opts.limit, opts.offset)
        } else {
            Pager::default()
        };

        Ok(FilterResult { total, hits, pager })
    }

    /// Register (or replace) a relation descriptor
    pub fn add_relation(&self, relation: Relation) {
        tracing::debug!(
            "[{}] relation {} -> {}.{}",
            self.name(),
            relation.name,
            relation.target_collection,
            relation.remote_key
        );
        self.relations.write().insert(relation.name.clone(), relation);
    }

    /// Snapshot of the registered relation descriptors
    pub fn relations(&self) -> Vec<Relation> {
        self.relations.read().values().cloned().collect()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Collection (table) name
    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn default_limit(&self) -> i64 {
        self.default_limit
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn attach_relations(&self, doc: &mut Document, relations: &[Relation]) -> Result<()> {
        for relation in relations {
            if !relation.applies_to(doc) {
                continue;
            }
            let related = self.load_relation(doc, relation)?;
            doc.relations.insert(relation.name.clone(), related);
        }
        Ok(())
    }

    /// One query per call; a missing local value short-circuits to empty
    fn load_relation(&self, doc: &Document, relation: &Relation) -> Result<Vec<Document>> {
        let value = match relation.local_value(doc) {
            Some(value) => value,
            None => return Ok(Vec::new()),
        };

        let statement =
            self.table
                .select_related(&relation.target_collection, &relation.remote_key, value);

        self.query(Operation::Relation, &statement)?
            .iter()
            .map(decode_row)
            .collect()
    }

    fn execute(&self, op: Operation, statement: &Statement) -> Result<u64> {
        tracing::debug!("[{}] {}: {}", self.name(), op, statement.sql);
        self.backend
            .execute(statement)
            .map_err(|e| DocstoreError::storage(op, e))
    }

    fn query(&self, op: Operation, statement: &Statement) -> Result<Vec<Row>> {
        tracing::debug!("[{}] {}: {}", self.name(), op, statement.sql);
        self.backend
            .query(statement)
            .map_err(|e| DocstoreError::storage(op, e))
    }
}

/// Random version 4 UUID from the OS entropy source
fn generate_id() -> Result<String> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| DocstoreError::IdentityGeneration(e.to_string()))?;

    Ok(uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string())
}

/// Wall clock as epoch nanoseconds
fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
