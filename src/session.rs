//! Sessions, the per-bind unit of work
//!
//! A [`Session`] pairs the engine for its bind key with transaction
//! state, following the scoped-session model: the first statement begins
//! a transaction, later statements join it, and nothing becomes durable
//! until [`Session::commit`]. [`Session::remove`] discards the state
//! entirely and the session then behaves like a brand new one.

use crate::convert;
use crate::engine::{Engine, ExecResult};
use crate::error::Result;
use crate::value::SqlValue;
use serde_json::Value as JsonValue;
use sqlx::{MySql, Postgres, Sqlite, Transaction};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// An open transaction on whichever backend the engine runs
pub(crate) enum AnyTransaction {
    Postgres(Transaction<'static, Postgres>),
    MySql(Transaction<'static, MySql>),
    Sqlite(Transaction<'static, Sqlite>),
}

impl AnyTransaction {
    pub(crate) async fn execute(&mut self, sql: &str, params: Vec<SqlValue>) -> Result<ExecResult> {
        match self {
            AnyTransaction::Postgres(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = convert::postgres::bind(query, param);
                }
                let result = query.execute(&mut **tx).await?;
                Ok(ExecResult {
                    rows_affected: result.rows_affected(),
                    last_insert_id: None,
                })
            }
            AnyTransaction::MySql(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = convert::mysql::bind(query, param);
                }
                let result = query.execute(&mut **tx).await?;
                Ok(ExecResult {
                    rows_affected: result.rows_affected(),
                    last_insert_id: Some(result.last_insert_id() as i64),
                })
            }
            AnyTransaction::Sqlite(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = convert::sqlite::bind(query, param);
                }
                let result = query.execute(&mut **tx).await?;
                Ok(ExecResult {
                    rows_affected: result.rows_affected(),
                    last_insert_id: Some(result.last_insert_rowid()),
                })
            }
        }
    }

    pub(crate) async fn fetch_all(
        &mut self,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> Result<Vec<JsonValue>> {
        match self {
            AnyTransaction::Postgres(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = convert::postgres::bind(query, param);
                }
                let rows = query.fetch_all(&mut **tx).await?;
                rows.iter().map(convert::postgres::row_to_json).collect()
            }
            AnyTransaction::MySql(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = convert::mysql::bind(query, param);
                }
                let rows = query.fetch_all(&mut **tx).await?;
                rows.iter().map(convert::mysql::row_to_json).collect()
            }
            AnyTransaction::Sqlite(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = convert::sqlite::bind(query, param);
                }
                let rows = query.fetch_all(&mut **tx).await?;
                rows.iter().map(convert::sqlite::row_to_json).collect()
            }
        }
    }

    pub(crate) async fn fetch_one(
        &mut self,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> Result<Option<JsonValue>> {
        match self {
            AnyTransaction::Postgres(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = convert::postgres::bind(query, param);
                }
                let row = query.fetch_optional(&mut **tx).await?;
                row.as_ref().map(convert::postgres::row_to_json).transpose()
            }
            AnyTransaction::MySql(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = convert::mysql::bind(query, param);
                }
                let row = query.fetch_optional(&mut **tx).await?;
                row.as_ref().map(convert::mysql::row_to_json).transpose()
            }
            AnyTransaction::Sqlite(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = convert::sqlite::bind(query, param);
                }
                let row = query.fetch_optional(&mut **tx).await?;
                row.as_ref().map(convert::sqlite::row_to_json).transpose()
            }
        }
    }

    pub(crate) async fn commit(self) -> Result<()> {
        match self {
            AnyTransaction::Postgres(tx) => tx.commit().await?,
            AnyTransaction::MySql(tx) => tx.commit().await?,
            AnyTransaction::Sqlite(tx) => tx.commit().await?,
        }
        Ok(())
    }

    pub(crate) async fn rollback(self) -> Result<()> {
        match self {
            AnyTransaction::Postgres(tx) => tx.rollback().await?,
            AnyTransaction::MySql(tx) => tx.rollback().await?,
            AnyTransaction::Sqlite(tx) => tx.rollback().await?,
        }
        Ok(())
    }
}

/// A unit-of-work object bound to one engine
///
/// Sessions are created lazily by the registry and cached per bind key,
/// so the same `Arc<Session>` comes back for the lifetime of the
/// registry. Statements on one session serialize; the transaction state
/// sits behind a mutex.
pub struct Session {
    bind: String,
    engine: Arc<Engine>,
    tx: Mutex<Option<AnyTransaction>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("bind", &self.bind)
            .field("engine", &self.engine)
            .finish()
    }
}

impl Session {
    /// Create a session bound to the given engine
    pub(crate) fn new(bind: &str, engine: Arc<Engine>) -> Self {
        Self {
            bind: bind.to_string(),
            engine,
            tx: Mutex::new(None),
        }
    }

    /// The bind key this session was created for
    pub fn bind(&self) -> &str {
        &self.bind
    }

    /// The engine this session is bound to
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Whether a transaction is currently open
    pub async fn in_transaction(&self) -> bool {
        self.tx.lock().await.is_some()
    }

    /// Execute a statement inside the session's transaction
    ///
    /// Begins a transaction on the bound engine if none is open yet.
    pub async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<ExecResult> {
        let mut guard = self.tx.lock().await;
        let mut tx = match guard.take() {
            Some(tx) => tx,
            None => {
                log::debug!("Session '{}' beginning transaction", self.bind);
                self.engine.begin().await?
            }
        };
        let result = tx.execute(sql, params).await;
        *guard = Some(tx);
        result
    }

    /// Fetch all rows inside the session's transaction
    pub async fn fetch_all(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<JsonValue>> {
        let mut guard = self.tx.lock().await;
        let mut tx = match guard.take() {
            Some(tx) => tx,
            None => {
                log::debug!("Session '{}' beginning transaction", self.bind);
                self.engine.begin().await?
            }
        };
        let result = tx.fetch_all(sql, params).await;
        *guard = Some(tx);
        result
    }

    /// Fetch at most one row inside the session's transaction
    pub async fn fetch_one(&self, sql: &str, params: Vec<SqlValue>) -> Result<Option<JsonValue>> {
        let mut guard = self.tx.lock().await;
        let mut tx = match guard.take() {
            Some(tx) => tx,
            None => {
                log::debug!("Session '{}' beginning transaction", self.bind);
                self.engine.begin().await?
            }
        };
        let result = tx.fetch_one(sql, params).await;
        *guard = Some(tx);
        result
    }

    /// Commit the open transaction
    ///
    /// A session with no open transaction commits nothing and succeeds.
    pub async fn commit(&self) -> Result<()> {
        let tx = self.tx.lock().await.take();
        match tx {
            Some(tx) => {
                log::debug!("Session '{}' committing", self.bind);
                tx.commit().await
            }
            None => Ok(()),
        }
    }

    /// Roll back the open transaction
    ///
    /// A session with no open transaction rolls back nothing and succeeds.
    pub async fn rollback(&self) -> Result<()> {
        let tx = self.tx.lock().await.take();
        match tx {
            Some(tx) => {
                log::debug!("Session '{}' rolling back", self.bind);
                tx.rollback().await
            }
            None => Ok(()),
        }
    }

    /// Discard the session's state, rolling back anything uncommitted
    ///
    /// The session object stays usable afterwards; the next statement
    /// begins a fresh transaction. This mirrors scoped-session removal,
    /// where the storage is handed back and lazily rebuilt on next use.
    pub async fn remove(&self) -> Result<()> {
        let tx = self.tx.lock().await.take();
        match tx {
            Some(tx) => {
                log::debug!("Session '{}' discarding transaction state", self.bind);
                tx.rollback().await
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindSpec;

    async fn memory_engine() -> Arc<Engine> {
        // One connection so the in-memory database is shared across uses
        let spec = BindSpec::from("sqlite::memory:").with_max_connections(1);
        Arc::new(Engine::connect("default", &spec, false).await.unwrap())
    }

    #[tokio::test]
    async fn test_lazy_begin_and_commit() {
        let session = Session::new("default", memory_engine().await);
        assert!(!session.in_transaction().await);

        session
            .execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)", vec![])
            .await
            .unwrap();
        assert!(session.in_transaction().await);

        session
            .execute("INSERT INTO notes (body) VALUES (?)", vec!["first".into()])
            .await
            .unwrap();
        session.commit().await.unwrap();
        assert!(!session.in_transaction().await);

        let rows = session.fetch_all("SELECT body FROM notes", vec![]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["body"], "first");
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let session = Session::new("default", memory_engine().await);
        session
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", vec![])
            .await
            .unwrap();
        session.commit().await.unwrap();

        session
            .execute("INSERT INTO t (id) VALUES (?)", vec![1i32.into()])
            .await
            .unwrap();
        session.rollback().await.unwrap();

        let rows = session.fetch_all("SELECT * FROM t", vec![]).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_commit_without_transaction_is_noop() {
        let session = Session::new("default", memory_engine().await);
        session.commit().await.unwrap();
        session.rollback().await.unwrap();
        session.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_resets_state() {
        let session = Session::new("default", memory_engine().await);
        session
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", vec![])
            .await
            .unwrap();
        assert!(session.in_transaction().await);

        session.remove().await.unwrap();
        assert!(!session.in_transaction().await);

        // Still usable afterwards
        session
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", vec![])
            .await
            .unwrap();
        session.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_last_insert_id_on_sqlite() {
        let session = Session::new("default", memory_engine().await);
        session
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", vec![])
            .await
            .unwrap();
        let result = session
            .execute("INSERT INTO t (v) VALUES (?)", vec!["x".into()])
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, Some(1));
    }
}
