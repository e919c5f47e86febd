//! Document definition

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection tag applied when a document is created without one
pub const DEFAULT_COLLECTION: &str = "default";

/// Schema-free document content
pub type Payload = Map<String, Value>;

/// A stored document
///
/// `relations` is transient: it is filled in by filter/get calls that
/// resolve relation descriptors and is never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub collection: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: i64,
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, Vec<Document>>,
}

impl Document {
    /// Create an unsaved document in `collection`
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            collection: collection.into(),
            created_at: 0,
            updated_at: 0,
            deleted_at: 0,
            payload: Payload::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Replace the payload (builder style)
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Set a single payload value (builder style)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Whether the document has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at > 0
    }

    /// Related documents loaded under `relation`, empty if none were loaded
    pub fn related(&self, relation: &str) -> &[Document] {
        self.relations
            .get(relation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTION)
    }
}
