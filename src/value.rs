//! Unified SQL value type for parameter binding and result extraction
//!
//! This module provides the single source of truth for SQL values passed
//! into engines and sessions and extracted back out as JSON.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Generic SQL value for parameter binding and result extraction
///
/// This enum represents the SQL data types shared by PostgreSQL, MySQL,
/// and SQLite, providing one interface for type handling across backends.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SqlValue {
    // Null
    Null,

    // Boolean
    Bool(bool),

    // Integers
    Int(i32),    // -2,147,483,648 to 2,147,483,647
    BigInt(i64), // full 64-bit range

    // Floating point
    Double(f64),

    // Text
    Text(String),

    // Binary
    Bytes(Vec<u8>),

    // Semantic types
    Uuid(String),     // UUID as string
    Json(JsonValue),  // JSON data
    Date(String),     // ISO date: "2024-01-15"
    Time(String),     // ISO time: "14:30:00" or "14:30:00.123"
    DateTime(String), // ISO datetime: "2024-01-15T10:30:00Z"
    Timestamp(i64),   // Unix timestamp (seconds since epoch)
}

impl SqlValue {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Convert to a boolean if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Int(i) => Some(*i != 0),
            SqlValue::BigInt(i) => Some(*i != 0),
            SqlValue::Text(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Convert to an i64 if possible
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i as i64),
            SqlValue::BigInt(i) => Some(*i),
            SqlValue::Text(s) => s.parse().ok(),
            SqlValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Convert to a String
    pub fn as_string(&self) -> Option<String> {
        match self {
            SqlValue::Text(s) | SqlValue::Uuid(s) => Some(s.clone()),
            SqlValue::Date(s) | SqlValue::Time(s) | SqlValue::DateTime(s) => Some(s.clone()),
            SqlValue::Json(j) => Some(j.to_string()),
            SqlValue::Bool(b) => Some(b.to_string()),
            SqlValue::Int(i) => Some(i.to_string()),
            SqlValue::BigInt(i) => Some(i.to_string()),
            SqlValue::Double(f) => Some(f.to_string()),
            SqlValue::Timestamp(ts) => Some(ts.to_string()),
            SqlValue::Null => None,
            SqlValue::Bytes(_) => None,
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            SqlValue::Null => JsonValue::Null,
            SqlValue::Bool(b) => JsonValue::Bool(*b),
            SqlValue::Int(i) => JsonValue::Number((*i).into()),
            SqlValue::BigInt(i) => JsonValue::Number((*i).into()),
            SqlValue::Double(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Text(s) => JsonValue::String(s.clone()),
            SqlValue::Uuid(s) => JsonValue::String(s.clone()),
            SqlValue::Date(s) | SqlValue::Time(s) | SqlValue::DateTime(s) => {
                JsonValue::String(s.clone())
            }
            SqlValue::Json(j) => j.clone(),
            SqlValue::Timestamp(ts) => JsonValue::Number((*ts).into()),
            SqlValue::Bytes(bytes) => JsonValue::String(base64_encode(bytes)),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::BigInt(i) => write!(f, "{}", i),
            SqlValue::Double(d) => write!(f, "{}", d),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Uuid(s) => write!(f, "{}", s),
            SqlValue::Date(s) | SqlValue::Time(s) | SqlValue::DateTime(s) => write!(f, "{}", s),
            SqlValue::Json(j) => write!(f, "{}", j),
            SqlValue::Timestamp(ts) => write!(f, "{}", ts),
            SqlValue::Bytes(b) => write!(f, "<binary:{} bytes>", b.len()),
        }
    }
}

// Helper functions
fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

// From trait implementations for common types
impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::BigInt(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Double(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<&[u8]> for SqlValue {
    fn from(v: &[u8]) -> Self {
        SqlValue::Bytes(v.to_vec())
    }
}

impl From<JsonValue> for SqlValue {
    fn from(v: JsonValue) -> Self {
        SqlValue::Json(v)
    }
}

impl From<uuid::Uuid> for SqlValue {
    fn from(v: uuid::Uuid) -> Self {
        SqlValue::Uuid(v.to_string())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::DateTime(v.to_rfc3339())
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v.format("%Y-%m-%d").to_string())
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v.format("%H:%M:%S%.f").to_string())
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_primitives() {
        assert!(matches!(SqlValue::from(true), SqlValue::Bool(true)));
        assert!(matches!(SqlValue::from(42i32), SqlValue::Int(42)));
        assert!(matches!(SqlValue::from(42i64), SqlValue::BigInt(42)));
        assert!(matches!(SqlValue::from("hello"), SqlValue::Text(_)));
        assert!(matches!(SqlValue::from(None::<i32>), SqlValue::Null));
        assert!(matches!(SqlValue::from(Some(7i32)), SqlValue::Int(7)));
    }

    #[test]
    fn test_from_uuid_and_chrono() {
        let id = uuid::Uuid::new_v4();
        let value = SqlValue::from(id);
        assert_eq!(value.as_string(), Some(id.to_string()));

        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert!(matches!(SqlValue::from(date), SqlValue::Date(s) if s == "2024-01-15"));
    }

    #[test]
    fn test_as_bool_from_text() {
        assert_eq!(SqlValue::from("yes").as_bool(), Some(true));
        assert_eq!(SqlValue::from("f").as_bool(), Some(false));
        assert_eq!(SqlValue::from("maybe").as_bool(), None);
        assert_eq!(SqlValue::Int(0).as_bool(), Some(false));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(SqlValue::Null.to_json(), JsonValue::Null);
        assert_eq!(SqlValue::Int(5).to_json(), json!(5));
        assert_eq!(SqlValue::from("x").to_json(), json!("x"));
        assert_eq!(
            SqlValue::Bytes(vec![1, 2, 3]).to_json(),
            json!("AQID")
        );
        assert_eq!(SqlValue::Json(json!({"a": 1})).to_json(), json!({"a": 1}));
    }

    #[test]
    fn test_display() {
        assert_eq!(SqlValue::Null.to_string(), "NULL");
        assert_eq!(SqlValue::Bytes(vec![0; 4]).to_string(), "<binary:4 bytes>");
        assert_eq!(SqlValue::Timestamp(1700000000).to_string(), "1700000000");
    }
}
