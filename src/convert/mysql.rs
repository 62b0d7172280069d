//! MySQL-specific binding and extraction

use crate::error::Result;
use crate::value::SqlValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Bind a SqlValue to a MySQL query
pub(crate) fn bind<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    value: SqlValue,
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(b), // TINYINT(1)
        SqlValue::Int(i) => query.bind(i),
        SqlValue::BigInt(i) => query.bind(i),
        SqlValue::Double(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Bytes(b) => query.bind(b),
        SqlValue::Uuid(s) => query.bind(s), // stored as CHAR(36)
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
                query.bind(dt.naive_utc())
            } else if let Ok(ndt) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f") {
                query.bind(ndt)
            } else if let Ok(ndt) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f") {
                query.bind(ndt)
            } else {
                query.bind(s)
            }
        }
        SqlValue::Timestamp(ts) => match DateTime::from_timestamp(ts, 0) {
            Some(dt) => query.bind(dt.naive_utc()),
            None => query.bind(ts),
        },
    }
}

/// Convert a MySQL row to a JSON object keyed by column name
pub(crate) fn row_to_json(row: &MySqlRow) -> Result<JsonValue> {
    let mut obj = serde_json::Map::new();

    for (i, column) in row.columns().iter().enumerate() {
        let value = extract_column(row, i, column.name(), column.type_info().name())?;
        obj.insert(column.name().to_string(), value.to_json());
    }

    Ok(JsonValue::Object(obj))
}

/// Extract one column, dispatching on the MySQL type name
fn extract_column(row: &MySqlRow, index: usize, name: &str, type_name: &str) -> Result<SqlValue> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(SqlValue::Null);
    }

    match type_name {
        // TINYINT(1) is routinely a boolean; newer drivers decode it as bool
        "TINYINT" | "BOOLEAN" | "BOOL" => {
            if let Ok(val) = row.try_get::<bool, _>(index) {
                Ok(SqlValue::Bool(val))
            } else if let Ok(val) = row.try_get::<i8, _>(index) {
                Ok(SqlValue::Int(val as i32))
            } else {
                log::warn!("Could not extract TINYINT column '{}', returning NULL", name);
                Ok(SqlValue::Null)
            }
        }
        "SMALLINT" => Ok(SqlValue::Int(row.try_get::<i16, _>(index)? as i32)),
        "INT" | "INTEGER" | "MEDIUMINT" => Ok(SqlValue::Int(row.try_get(index)?)),
        "BIGINT" => Ok(SqlValue::BigInt(row.try_get(index)?)),
        "TINYINT UNSIGNED" => Ok(SqlValue::Int(row.try_get::<u8, _>(index)? as i32)),
        "SMALLINT UNSIGNED" => Ok(SqlValue::Int(row.try_get::<u16, _>(index)? as i32)),
        "INT UNSIGNED" | "MEDIUMINT UNSIGNED" => {
            Ok(SqlValue::BigInt(row.try_get::<u32, _>(index)? as i64))
        }
        "BIGINT UNSIGNED" => {
            let val: u64 = row.try_get(index)?;
            if val <= i64::MAX as u64 {
                Ok(SqlValue::BigInt(val as i64))
            } else {
                Ok(SqlValue::Text(val.to_string()))
            }
        }
        "FLOAT" => Ok(SqlValue::Double(row.try_get::<f32, _>(index)? as f64)),
        "DOUBLE" => Ok(SqlValue::Double(row.try_get(index)?)),
        "VARCHAR" | "CHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" => {
            Ok(SqlValue::Text(row.try_get(index)?))
        }
        "JSON" => Ok(SqlValue::Json(row.try_get(index)?)),
        "TIMESTAMP" | "DATETIME" => extract_datetime(row, index, name),
        "DATE" => {
            if let Ok(date) = row.try_get::<NaiveDate, _>(index) {
                Ok(SqlValue::Date(date.to_string()))
            } else {
                Ok(SqlValue::Date(row.try_get(index)?))
            }
        }
        "TIME" => {
            if let Ok(time) = row.try_get::<NaiveTime, _>(index) {
                Ok(SqlValue::Time(time.to_string()))
            } else {
                Ok(SqlValue::Time(row.try_get(index)?))
            }
        }
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            Ok(SqlValue::Bytes(row.try_get(index)?))
        }
        other => {
            if let Ok(s) = row.try_get::<String, _>(index) {
                Ok(SqlValue::Text(s))
            } else {
                log::warn!(
                    "Could not extract column '{}' of MySQL type '{}', returning NULL",
                    name,
                    other
                );
                Ok(SqlValue::Null)
            }
        }
    }
}

/// Extract TIMESTAMP/DATETIME, which MySQL reports in several shapes
fn extract_datetime(row: &MySqlRow, index: usize, name: &str) -> Result<SqlValue> {
    // TIMESTAMP fields decode as DateTime<Utc>
    if let Ok(dt) = row.try_get::<DateTime<Utc>, _>(index) {
        return Ok(SqlValue::DateTime(dt.to_rfc3339()));
    }

    // DATETIME fields decode as NaiveDateTime
    if let Ok(ndt) = row.try_get::<NaiveDateTime, _>(index) {
        let dt = DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc);
        return Ok(SqlValue::DateTime(dt.to_rfc3339()));
    }

    // Some configurations hand back "2025-09-03 19:35:50" as text
    if let Ok(s) = row.try_get::<String, _>(index) {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f") {
            let dt = DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc);
            return Ok(SqlValue::DateTime(dt.to_rfc3339()));
        }
        return Ok(SqlValue::DateTime(s));
    }

    log::warn!("Could not extract datetime column '{}', returning NULL", name);
    Ok(SqlValue::Null)
}
