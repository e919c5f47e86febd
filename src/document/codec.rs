//! Row codec
//!
//! Maps documents to statement parameters and result rows back to documents.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::backend::{Row, SqlValue};
use crate::error::{DocstoreError, Result};

use super::{is_reserved, Document, Payload};

/// Encode a payload as a JSON object parameter
pub fn encode_payload(payload: &Payload) -> SqlValue {
    SqlValue::Json(Value::Object(payload.clone()))
}

/// Reject payload keys that would shadow a physical column
pub fn check_payload_keys(payload: &Payload) -> Result<()> {
    match payload.keys().find(|key| is_reserved(key)) {
        Some(key) => Err(DocstoreError::ReservedKey(key.clone())),
        None => Ok(()),
    }
}

/// Decode a `SELECT id, collection, payload, ...` row into a document
pub fn decode_row(row: &Row) -> Result<Document> {
    Ok(Document {
        id: text_column(row, "id")?,
        collection: text_column(row, "collection")?,
        created_at: int_column(row, "created_at")?,
        updated_at: int_column(row, "updated_at")?,
        deleted_at: int_column(row, "deleted_at")?,
        payload: payload_column(row)?,
        relations: BTreeMap::new(),
    })
}

fn text_column(row: &Row, name: &str) -> Result<String> {
    match row.get(name) {
        Some(SqlValue::Text(s)) => Ok(s.clone()),
        Some(SqlValue::Null) => Ok(String::new()),
        Some(other) => Err(DocstoreError::Serialization(format!(
            "column {} holds {:?}, expected text",
            name, other
        ))),
        None => Err(DocstoreError::Serialization(format!(
            "row has no column {}",
            name
        ))),
    }
}

fn int_column(row: &Row, name: &str) -> Result<i64> {
    match row.get(name) {
        Some(SqlValue::Int(i)) => Ok(*i),
        Some(SqlValue::Null) => Ok(0),
        Some(other) => Err(DocstoreError::Serialization(format!(
            "column {} holds {:?}, expected bigint",
            name, other
        ))),
        None => Err(DocstoreError::Serialization(format!(
            "row has no column {}",
            name
        ))),
    }
}

/// A NULL payload decodes as an empty map; a JSON column read back as text
/// is parsed.
fn payload_column(row: &Row) -> Result<Payload> {
    let value = match row.get("payload") {
        Some(SqlValue::Json(v)) => v.clone(),
        Some(SqlValue::Text(s)) => {
            serde_json::from_str(s).map_err(|e| DocstoreError::Serialization(e.to_string()))?
        }
        Some(SqlValue::Null) | None => return Ok(Payload::new()),
        Some(other) => {
            return Err(DocstoreError::Serialization(format!(
                "payload holds {:?}, expected a JSON object",
                other
            )))
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Payload::new()),
        other => Err(DocstoreError::Serialization(format!(
            "payload is not a JSON object: {}",
            other
        ))),
    }
}
