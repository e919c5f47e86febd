//! Relation descriptors and loading
//!
//! A relation is a static join rule registered on a datastore. When a
//! filter returns a document the rule applies to, the related documents are
//! fetched with one extra query per relation per document and attached to
//! `Document::relations`. There is no batching across documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{is_reserved, Document};

/// "Documents relate via `local_key` to documents tagged
/// `target_collection` whose `remote_key` holds the same value."
///
/// Both keys follow the usual resolution: a reserved name addresses the
/// physical column, anything else a payload key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub target_collection: String,
    pub local_key: String,
    pub remote_key: String,

    /// Only documents tagged with this collection get the relation; `None`
    /// applies it to every document in the table
    pub source_collection: Option<String>,
}

impl Relation {
    /// A relation applied to every document the datastore returns, whatever
    /// its collection tag
    ///
    /// Several collections usually share one table, so a relation meant for
    /// one of them should be narrowed with [`Relation::from_collection`].
    pub fn new(
        name: impl Into<String>,
        target_collection: impl Into<String>,
        local_key: impl Into<String>,
        remote_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_collection: target_collection.into(),
            local_key: local_key.into(),
            remote_key: remote_key.into(),
            source_collection: None,
        }
    }

    /// Restrict the relation to documents tagged `collection`
    pub fn from_collection(mut self, collection: impl Into<String>) -> Self {
        self.source_collection = Some(collection.into());
        self
    }

    pub fn applies_to(&self, doc: &Document) -> bool {
        match &self.source_collection {
            Some(collection) => *collection == doc.collection,
            None => true,
        }
    }

    /// The value to match on the remote side, as text
    ///
    /// `None` when the source document has no usable local value; such a
    /// document has no related documents.
    pub fn local_value(&self, doc: &Document) -> Option<String> {
        if is_reserved(&self.local_key) {
            return match self.local_key.as_str() {
                "id" => Some(doc.id.clone()),
                "collection" => Some(doc.collection.clone()),
                "created_at" => Some(doc.created_at.to_string()),
                "updated_at" => Some(doc.updated_at.to_string()),
                _ => Some(doc.deleted_at.to_string()),
            };
        }

        match doc.payload.get(&self.local_key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
