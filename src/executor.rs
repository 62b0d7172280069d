//! A common statement-level interface over engines and sessions
//!
//! [`SqlExecutor`] lets calling code accept either an [`Engine`]
//! (pool execution, autocommit per statement) or a [`Session`]
//! (transactional execution) without caring which one it holds.

use crate::engine::{Engine, ExecResult};
use crate::error::Result;
use crate::session::Session;
use crate::value::SqlValue;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Anything that can run parameterized SQL and return JSON rows
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Execute a statement, returning the affected-row count and, where
    /// the backend reports one, the last insert id
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<ExecResult>;

    /// Fetch all rows as JSON objects keyed by column name
    async fn fetch_all(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<JsonValue>>;

    /// Fetch at most one row
    async fn fetch_one(&self, sql: &str, params: Vec<SqlValue>) -> Result<Option<JsonValue>>;
}

#[async_trait]
impl SqlExecutor for Engine {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<ExecResult> {
        Engine::execute(self, sql, params).await
    }

    async fn fetch_all(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<JsonValue>> {
        Engine::fetch_all(self, sql, params).await
    }

    async fn fetch_one(&self, sql: &str, params: Vec<SqlValue>) -> Result<Option<JsonValue>> {
        Engine::fetch_one(self, sql, params).await
    }
}

#[async_trait]
impl SqlExecutor for Session {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<ExecResult> {
        Session::execute(self, sql, params).await
    }

    async fn fetch_all(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<JsonValue>> {
        Session::fetch_all(self, sql, params).await
    }

    async fn fetch_one(&self, sql: &str, params: Vec<SqlValue>) -> Result<Option<JsonValue>> {
        Session::fetch_one(self, sql, params).await
    }
}
