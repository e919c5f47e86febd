//! PostgreSQL backend
//!
//! Runs statements over an r2d2 pool of synchronous `postgres` connections.

use std::error::Error;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use postgres::NoTls;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;
use serde_json::Value;

use crate::config::Config;
use crate::error::{DocstoreError, Result};

use super::{Backend, BackendResult, Row, SqlValue, Statement};

type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Backend over a pooled PostgreSQL connection set
///
/// Cloning is cheap: clones share the same pool.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Build the pool described by `config`
    ///
    /// Fails if the URL does not parse or the pool cannot open its first
    /// connection within the configured timeout.
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;

        let pg_config: postgres::Config = config
            .database_url
            .parse()
            .map_err(|e: postgres::Error| DocstoreError::Config(e.to_string()))?;

        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(|e| DocstoreError::Config(format!("connection pool: {}", e)))?;

        tracing::info!(
            "PostgreSQL pool ready (max_connections={})",
            config.max_connections
        );

        Ok(Self { pool })
    }

    /// Wrap an already-built pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Backend for PgBackend {
    fn execute(&self, statement: &Statement) -> BackendResult<u64> {
        let mut conn = self.pool.get()?;
        let params = param_refs(&statement.params);
        Ok(conn.execute(statement.sql.as_str(), &params)?)
    }

    fn query(&self, statement: &Statement) -> BackendResult<Vec<Row>> {
        let mut conn = self.pool.get()?;
        let params = param_refs(&statement.params);
        let rows = conn.query(statement.sql.as_str(), &params)?;
        rows.iter().map(convert_row).collect()
    }
}

fn param_refs(params: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

// =============================================================================
// Row Conversion
// =============================================================================

fn convert_row(row: &postgres::Row) -> BackendResult<Row> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_value(row, idx, column.type_())
            .map_err(|e| format!("column {}: {}", column.name(), e))?;
        out.push(column.name(), value);
    }
    Ok(out)
}

fn column_value(row: &postgres::Row, idx: usize, ty: &Type) -> BackendResult<SqlValue> {
    let value = if *ty == Type::TEXT
        || *ty == Type::VARCHAR
        || *ty == Type::BPCHAR
        || *ty == Type::NAME
    {
        row.try_get::<_, Option<String>>(idx)?.map(SqlValue::Text)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(SqlValue::Int)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?
            .map(|i| SqlValue::Int(i64::from(i)))
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?
            .map(|i| SqlValue::Int(i64::from(i)))
    } else if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?.map(SqlValue::Bool)
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?.map(SqlValue::Float)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)?
            .map(|f| SqlValue::Float(f64::from(f)))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<Value>>(idx)?.map(SqlValue::Json)
    } else {
        return Err(format!("unsupported column type {}", ty).into());
    };

    Ok(value.unwrap_or(SqlValue::Null))
}

// =============================================================================
// Parameter Encoding
// =============================================================================

type EncodeResult<T> = std::result::Result<T, Box<dyn Error + Sync + Send>>;

/// `sign` field of a binary NUMERIC
const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;

/// Parameters are encoded according to the type the server inferred for the
/// placeholder, so a JSON number bound against a text expression is sent as
/// text and a string bound against jsonb is sent as a JSON string.
///
/// Placeholder types outside `accepts` are refused, and a value that cannot
/// be represented in the inferred type is an error rather than a
/// reinterpretation of its bytes.
impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> EncodeResult<IsNull> {
        if self.is_null() {
            return Ok(IsNull::Yes);
        }

        if is_json(ty) {
            return json_value(self).to_sql(ty, out);
        }
        if is_text(ty) {
            return text_value(self).to_sql(ty, out);
        }

        match (self, ty) {
            (SqlValue::Int(i), t) if *t == Type::INT8 => i.to_sql(ty, out),
            (SqlValue::Int(i), t) if *t == Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
            (SqlValue::Int(i), t) if *t == Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
            (SqlValue::Int(i), t) if *t == Type::FLOAT8 => (*i as f64).to_sql(ty, out),
            (SqlValue::Int(i), t) if *t == Type::FLOAT4 => (*i as f32).to_sql(ty, out),
            (SqlValue::Int(i), t) if *t == Type::NUMERIC => {
                write_numeric(&i.to_string(), out)?;
                Ok(IsNull::No)
            }

            (SqlValue::Float(f), t) if *t == Type::FLOAT8 => f.to_sql(ty, out),
            (SqlValue::Float(f), t) if *t == Type::FLOAT4 => (*f as f32).to_sql(ty, out),
            (SqlValue::Float(f), t) if *t == Type::NUMERIC => {
                write_float_numeric(*f, out)?;
                Ok(IsNull::No)
            }

            (SqlValue::Bool(b), t) if *t == Type::BOOL => b.to_sql(ty, out),

            (SqlValue::Text(s), t) if *t == Type::INT8 => s.trim().parse::<i64>()?.to_sql(ty, out),
            (SqlValue::Text(s), t) if *t == Type::INT4 => s.trim().parse::<i32>()?.to_sql(ty, out),
            (SqlValue::Text(s), t) if *t == Type::INT2 => s.trim().parse::<i16>()?.to_sql(ty, out),
            (SqlValue::Text(s), t) if *t == Type::FLOAT8 => s.trim().parse::<f64>()?.to_sql(ty, out),
            (SqlValue::Text(s), t) if *t == Type::FLOAT4 => s.trim().parse::<f32>()?.to_sql(ty, out),
            (SqlValue::Text(s), t) if *t == Type::BOOL => s.trim().parse::<bool>()?.to_sql(ty, out),
            (SqlValue::Text(s), t) if *t == Type::NUMERIC => {
                write_numeric(s.trim(), out)?;
                Ok(IsNull::No)
            }

            (SqlValue::Json(Value::Number(n)), t) if *t == Type::NUMERIC => {
                write_numeric(&n.to_string(), out)?;
                Ok(IsNull::No)
            }

            (value, ty) => Err(format!("cannot bind {:?} as {}", value, ty).into()),
        }
    }

    fn accepts(ty: &Type) -> bool {
        is_text(ty)
            || is_json(ty)
            || *ty == Type::BOOL
            || *ty == Type::INT2
            || *ty == Type::INT4
            || *ty == Type::INT8
            || *ty == Type::FLOAT4
            || *ty == Type::FLOAT8
            || *ty == Type::NUMERIC
    }

    to_sql_checked!();
}

fn is_text(ty: &Type) -> bool {
    *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
}

fn is_json(ty: &Type) -> bool {
    *ty == Type::JSON || *ty == Type::JSONB
}

fn json_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Bool(*b),
        SqlValue::Int(i) => Value::from(*i),
        SqlValue::Float(f) => Value::from(*f),
        SqlValue::Text(s) => Value::String(s.clone()),
        SqlValue::Json(v) => v.clone(),
    }
}

fn text_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Bool(b) => b.to_string(),
        SqlValue::Int(i) => i.to_string(),
        SqlValue::Float(f) => f.to_string(),
        SqlValue::Text(s) => s.clone(),
        SqlValue::Json(v) => v.to_string(),
    }
}

fn write_float_numeric(f: f64, out: &mut BytesMut) -> EncodeResult<()> {
    if f.is_nan() {
        write_numeric_header(0, 0, NUMERIC_NAN, 0, out);
        return Ok(());
    }
    if f.is_infinite() {
        return Err(format!("cannot bind {} as numeric", f).into());
    }
    // Display never uses exponent notation for f64
    write_numeric(&f.to_string(), out)
}

/// Binary NUMERIC from a plain decimal literal (`-12.50`, `.5`, `7`)
///
/// Layout: ndigits, weight, sign, dscale, then ndigits base-10000 digits.
/// `weight` is the power of 10000 of the first digit.
fn write_numeric(literal: &str, out: &mut BytesMut) -> EncodeResult<()> {
    let (negative, unsigned) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal.strip_prefix('+').unwrap_or(literal)),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let well_formed = !(int_part.is_empty() && frac_part.is_empty())
        && int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(format!("invalid numeric literal {:?}", literal).into());
    }

    let dscale = u16::try_from(frac_part.len())?;
    let int_pad = (4 - int_part.len() % 4) % 4;
    let frac_pad = (4 - frac_part.len() % 4) % 4;

    let padded = "0".repeat(int_pad) + int_part + frac_part + &"0".repeat(frac_pad);
    let mut digits: Vec<i16> = padded
        .as_bytes()
        .chunks(4)
        .map(|group| group.iter().fold(0i16, |acc, b| acc * 10 + i16::from(b - b'0')))
        .collect();
    let mut weight = i16::try_from((int_pad + int_part.len()) / 4)? - 1;

    let leading = digits.iter().take_while(|d| **d == 0).count();
    digits.drain(..leading);
    weight -= i16::try_from(leading)?;
    while digits.last() == Some(&0) {
        digits.pop();
    }

    let (weight, sign) = if digits.is_empty() {
        (0, NUMERIC_POS)
    } else if negative {
        (weight, NUMERIC_NEG)
    } else {
        (weight, NUMERIC_POS)
    };

    write_numeric_header(i16::try_from(digits.len())?, weight, sign, dscale, out);
    for digit in digits {
        out.put_i16(digit);
    }
    Ok(())
}

fn write_numeric_header(ndigits: i16, weight: i16, sign: u16, dscale: u16, out: &mut BytesMut) {
    out.put_i16(ndigits);
    out.put_i16(weight);
    out.put_u16(sign);
    out.put_u16(dscale);
}
