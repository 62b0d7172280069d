//! Backend-specific parameter binding and row extraction
//!
//! Each backend module exposes two operations: `bind`, which attaches a
//! [`SqlValue`](crate::value::SqlValue) to a sqlx query, and `row_to_json`,
//! which converts one result row into a JSON object keyed by column name.
//! Extraction dispatches on the column's reported type (PostgreSQL, MySQL)
//! or declared-type affinity (SQLite), with a string fallback for types
//! outside the supported set.

pub(crate) mod mysql;
pub(crate) mod postgres;
pub(crate) mod sqlite;
