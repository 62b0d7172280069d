//! Typed handles on the registry's default bind
//!
//! [`SessionProxy`] and [`EngineProxy`] stand in for framework-level
//! `db.session` and `db.engine` attributes. They are plain structs with
//! explicit methods rather than dynamic forwarding, so call sites are
//! compiler checked. Every method resolves through the registry again,
//! which means a handle created before [`BindRegistry::close`] picks up
//! the rebuilt engine on its next use.

use crate::engine::{Backend, Engine, ExecResult};
use crate::error::Result;
use crate::registry::BindRegistry;
use crate::session::Session;
use crate::value::SqlValue;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Handle on the default session
#[derive(Clone, Copy)]
pub struct SessionProxy<'a> {
    registry: &'a BindRegistry,
}

impl<'a> SessionProxy<'a> {
    pub(crate) fn new(registry: &'a BindRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a session by bind key, creating it on first use
    ///
    /// `None` means the `default` bind, making this the callable form of
    /// the handle: `registry.session().get(Some("reports"))`.
    pub async fn get(&self, bind_key: Option<&str>) -> Result<Arc<Session>> {
        self.registry.get_session(bind_key).await
    }

    /// Execute a statement inside the default session's transaction
    pub async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<ExecResult> {
        self.get(None).await?.execute(sql, params).await
    }

    /// Fetch all rows inside the default session's transaction
    pub async fn fetch_all(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<JsonValue>> {
        self.get(None).await?.fetch_all(sql, params).await
    }

    /// Fetch at most one row inside the default session's transaction
    pub async fn fetch_one(&self, sql: &str, params: Vec<SqlValue>) -> Result<Option<JsonValue>> {
        self.get(None).await?.fetch_one(sql, params).await
    }

    /// Commit the default session
    pub async fn commit(&self) -> Result<()> {
        self.get(None).await?.commit().await
    }

    /// Roll back the default session
    pub async fn rollback(&self) -> Result<()> {
        self.get(None).await?.rollback().await
    }

    /// Whether the default session has an open transaction
    pub async fn in_transaction(&self) -> Result<bool> {
        Ok(self.get(None).await?.in_transaction().await)
    }
}

/// Handle on the default engine
#[derive(Clone, Copy)]
pub struct EngineProxy<'a> {
    registry: &'a BindRegistry,
}

impl<'a> EngineProxy<'a> {
    pub(crate) fn new(registry: &'a BindRegistry) -> Self {
        Self { registry }
    }

    /// Resolve an engine by bind key, connecting on first use
    ///
    /// `None` means the `default` bind.
    pub async fn get(&self, bind_key: Option<&str>) -> Result<Arc<Engine>> {
        self.registry.get_engine(bind_key).await
    }

    /// Execute a statement directly on the pool, outside any session
    pub async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<ExecResult> {
        self.get(None).await?.execute(sql, params).await
    }

    /// Fetch all rows directly from the pool
    pub async fn fetch_all(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<JsonValue>> {
        self.get(None).await?.fetch_all(sql, params).await
    }

    /// Fetch at most one row directly from the pool
    pub async fn fetch_one(&self, sql: &str, params: Vec<SqlValue>) -> Result<Option<JsonValue>> {
        self.get(None).await?.fetch_one(sql, params).await
    }

    /// Round-trip check against the default engine
    pub async fn ping(&self) -> Result<()> {
        self.get(None).await?.ping().await
    }

    /// Backend of the default engine
    pub async fn backend(&self) -> Result<Backend> {
        Ok(self.get(None).await?.backend())
    }
}
