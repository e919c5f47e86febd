//! Backend Module
//!
//! The contract between the document layer and the relational engine that
//! actually stores the rows.
//!
//! ## Responsibilities
//! - Execute parameterized statements (DDL, insert, update)
//! - Run parameterized queries and hand back rows of named columns
//! - Surface engine errors unchanged
//!
//! Statements use positional placeholders (`$1`, `$2`, ...). Named
//! parameters are rewritten before a statement reaches the backend.

#[cfg(feature = "postgres")]
mod pg;

#[cfg(feature = "postgres")]
pub use self::pg::PgBackend;

use serde_json::Value;

use crate::error::BackendError;

/// Result type for backend round trips
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A parameter or column value exchanged with the backend
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(Value),
}

impl SqlValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// Caller-supplied JSON parameters map onto the closest column type
impl From<Value> for SqlValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => SqlValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => SqlValue::Text(s),
            other => SqlValue::Json(other),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A result row: column names paired with their values, in select order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column (builder style)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Look up a column by name
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> &[(String, SqlValue)] {
        &self.columns
    }
}

/// A relational engine capable of running the statements this crate builds
///
/// Implementations must be safe to share across threads; accessors call
/// into the same backend concurrently without further synchronization.
pub trait Backend: Send + Sync {
    /// Run a statement that returns no rows, yielding the affected row count
    fn execute(&self, statement: &Statement) -> BackendResult<u64>;

    /// Run a query and return every row it produces
    fn query(&self, statement: &Statement) -> BackendResult<Vec<Row>>;
}
