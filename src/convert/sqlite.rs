//! SQLite-specific binding and extraction

use crate::error::Result;
use crate::value::SqlValue;
use chrono::DateTime;
use serde_json::Value as JsonValue;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// SQLite type affinity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Affinity {
    Text,
    Numeric,
    Integer,
    Real,
    Blob,
}

// SQLite type affinity rules (https://www.sqlite.org/datatype3.html)
fn affinity_of(type_name: &str) -> Affinity {
    let upper = type_name.to_uppercase();

    if upper.contains("INT") {
        Affinity::Integer
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        Affinity::Text
    } else if upper.contains("BLOB") || upper.is_empty() {
        Affinity::Blob
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        Affinity::Real
    } else {
        Affinity::Numeric
    }
}

/// Bind a SqlValue to a SQLite query
pub(crate) fn bind<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    value: SqlValue,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<i32>), // SQLite accepts NULL for any type
        SqlValue::Bool(b) => query.bind(if b { 1i32 } else { 0i32 }), // stored as INTEGER
        SqlValue::Int(i) => query.bind(i),
        SqlValue::BigInt(i) => query.bind(i),
        SqlValue::Double(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Bytes(b) => query.bind(b),

        // Semantic types are all stored as text in SQLite
        SqlValue::Uuid(s) => query.bind(s),
        SqlValue::Json(j) => query.bind(j.to_string()),
        SqlValue::Date(s) => query.bind(s),
        SqlValue::Time(s) => query.bind(s),
        SqlValue::DateTime(s) => query.bind(s),
        SqlValue::Timestamp(ts) => match DateTime::from_timestamp(ts, 0) {
            Some(dt) => query.bind(dt.to_rfc3339()),
            None => query.bind(ts.to_string()),
        },
    }
}

/// Convert a SQLite row to a JSON object keyed by column name
pub(crate) fn row_to_json(row: &SqliteRow) -> Result<JsonValue> {
    let mut obj = serde_json::Map::new();

    for (i, column) in row.columns().iter().enumerate() {
        let value = extract_column(row, i, column.name(), column.type_info().name())?;
        obj.insert(column.name().to_string(), value.to_json());
    }

    Ok(JsonValue::Object(obj))
}

/// Extract one column, dispatching on the declared type's affinity
///
/// SQLite uses type affinity, not strict types, so the column name is
/// consulted as a secondary hint for booleans, JSON and datetime text.
fn extract_column(row: &SqliteRow, index: usize, name: &str, type_name: &str) -> Result<SqlValue> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(SqlValue::Null);
    }

    match affinity_of(type_name) {
        Affinity::Integer => {
            if let Ok(val) = row.try_get::<i64, _>(index) {
                // SQLite stores booleans as integers (0 or 1)
                let lower = name.to_lowercase();
                if lower.contains("bool") || lower.starts_with("is_") || lower.starts_with("has_") {
                    return Ok(SqlValue::Bool(val != 0));
                }
                if val >= i32::MIN as i64 && val <= i32::MAX as i64 {
                    Ok(SqlValue::Int(val as i32))
                } else {
                    Ok(SqlValue::BigInt(val))
                }
            } else {
                Ok(SqlValue::Null)
            }
        }
        Affinity::Text => {
            if let Ok(val) = row.try_get::<String, _>(index) {
                let lower = name.to_lowercase();
                if lower.contains("json") {
                    if let Ok(json_val) = serde_json::from_str(&val) {
                        return Ok(SqlValue::Json(json_val));
                    }
                }
                if lower.contains("uuid") || lower.contains("guid") {
                    return Ok(SqlValue::Uuid(val));
                }
                Ok(SqlValue::Text(val))
            } else {
                Ok(SqlValue::Null)
            }
        }
        Affinity::Real => {
            if let Ok(val) = row.try_get::<f64, _>(index) {
                Ok(SqlValue::Double(val))
            } else {
                Ok(SqlValue::Null)
            }
        }
        Affinity::Blob => {
            if let Ok(val) = row.try_get::<Vec<u8>, _>(index) {
                Ok(SqlValue::Bytes(val))
            } else {
                Ok(SqlValue::Null)
            }
        }
        Affinity::Numeric => {
            // NUMERIC affinity can hold INTEGER, REAL, or TEXT; try in order
            if let Ok(val) = row.try_get::<i64, _>(index) {
                if val >= i32::MIN as i64 && val <= i32::MAX as i64 {
                    Ok(SqlValue::Int(val as i32))
                } else {
                    Ok(SqlValue::BigInt(val))
                }
            } else if let Ok(val) = row.try_get::<f64, _>(index) {
                Ok(SqlValue::Double(val))
            } else if let Ok(val) = row.try_get::<String, _>(index) {
                Ok(SqlValue::Text(val))
            } else {
                Ok(SqlValue::Null)
            }
        }
    }
}
