//! PostgreSQL-specific binding and extraction

use crate::error::Result;
use crate::value::SqlValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Bind a SqlValue to a PostgreSQL query
///
/// Temporal and UUID values arrive as strings and are parsed into their
/// native types before binding; values that fail to parse are bound as
/// text and left to the server to coerce.
pub(crate) fn bind<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    value: SqlValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::BigInt(i) => query.bind(i),
        SqlValue::Double(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Bytes(b) => query.bind(b),
        SqlValue::Uuid(s) => match sqlx::types::Uuid::parse_str(&s) {
            Ok(uuid) => query.bind(uuid),
            Err(_) => query.bind(s),
        },
        SqlValue::Json(j) => query.bind(j),
        SqlValue::Date(s) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(date) => query.bind(date),
            Err(_) => query.bind(s),
        },
        SqlValue::Time(s) => match NaiveTime::parse_from_str(&s, "%H:%M:%S%.f") {
            Ok(time) => query.bind(time),
            Err(_) => query.bind(s),
        },
        SqlValue::DateTime(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
                query.bind(dt.with_timezone(&Utc))
            } else if let Ok(ndt) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f") {
                query.bind(ndt)
            } else if let Ok(ndt) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f") {
                query.bind(ndt)
            } else {
                query.bind(s)
            }
        }
        SqlValue::Timestamp(ts) => match DateTime::from_timestamp(ts, 0) {
            Some(dt) => query.bind(dt),
            None => query.bind(ts),
        },
    }
}

/// Convert a PostgreSQL row to a JSON object keyed by column name
pub(crate) fn row_to_json(row: &PgRow) -> Result<JsonValue> {
    let mut obj = serde_json::Map::new();

    for (i, column) in row.columns().iter().enumerate() {
        let value = extract_column(row, i, column.name(), column.type_info().name())?;
        obj.insert(column.name().to_string(), value.to_json());
    }

    Ok(JsonValue::Object(obj))
}

/// Extract one column, dispatching on the PostgreSQL type name
fn extract_column(row: &PgRow, index: usize, name: &str, type_name: &str) -> Result<SqlValue> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(SqlValue::Null);
    }

    match type_name {
        "BOOL" => Ok(SqlValue::Bool(row.try_get(index)?)),
        "INT2" => Ok(SqlValue::Int(row.try_get::<i16, _>(index)? as i32)),
        "INT4" => Ok(SqlValue::Int(row.try_get(index)?)),
        "INT8" => Ok(SqlValue::BigInt(row.try_get(index)?)),
        "FLOAT4" => Ok(SqlValue::Double(row.try_get::<f32, _>(index)? as f64)),
        "FLOAT8" => Ok(SqlValue::Double(row.try_get(index)?)),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
            Ok(SqlValue::Text(row.try_get(index)?))
        }
        "JSON" | "JSONB" => Ok(SqlValue::Json(row.try_get(index)?)),
        "TIMESTAMP" | "TIMESTAMPTZ" => extract_timestamp(row, index, name),
        "DATE" => {
            if let Ok(date) = row.try_get::<NaiveDate, _>(index) {
                Ok(SqlValue::Date(date.to_string()))
            } else {
                Ok(SqlValue::Date(row.try_get(index)?))
            }
        }
        "TIME" | "TIMETZ" => {
            if let Ok(time) = row.try_get::<NaiveTime, _>(index) {
                Ok(SqlValue::Time(time.to_string()))
            } else {
                Ok(SqlValue::Time(row.try_get(index)?))
            }
        }
        "UUID" => {
            let uuid: sqlx::types::Uuid = row.try_get(index)?;
            Ok(SqlValue::Uuid(uuid.to_string()))
        }
        "BYTEA" => Ok(SqlValue::Bytes(row.try_get(index)?)),
        other => {
            // NUMERIC and everything else: fall back to text, then give up
            if let Ok(s) = row.try_get::<String, _>(index) {
                Ok(SqlValue::Text(s))
            } else {
                log::warn!(
                    "Could not extract column '{}' of PostgreSQL type '{}', returning NULL",
                    name,
                    other
                );
                Ok(SqlValue::Null)
            }
        }
    }
}

/// Extract TIMESTAMP/TIMESTAMPTZ, which sqlx may decode either way
fn extract_timestamp(row: &PgRow, index: usize, name: &str) -> Result<SqlValue> {
    if let Ok(dt) = row.try_get::<DateTime<Utc>, _>(index) {
        return Ok(SqlValue::DateTime(dt.to_rfc3339()));
    }

    if let Ok(ndt) = row.try_get::<NaiveDateTime, _>(index) {
        let dt = DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc);
        return Ok(SqlValue::DateTime(dt.to_rfc3339()));
    }

    if let Ok(s) = row.try_get::<String, _>(index) {
        return Ok(SqlValue::DateTime(s));
    }

    log::warn!("Could not extract timestamp column '{}', returning NULL", name);
    Ok(SqlValue::Null)
}
