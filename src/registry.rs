//! The bind registry: named engines and sessions from one config
//!
//! A [`BindRegistry`] owns a [`BindConfig`] plus two lazy caches, one
//! for engines and one for sessions, both keyed by bind key. Lookups
//! construct on first use and return the same `Arc` on every later
//! call, so application code can treat `get_engine("reports")` as a
//! stable handle rather than a factory.

use crate::config::BindConfig;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::proxy::{EngineProxy, SessionProxy};
use crate::session::Session;
use indexmap::IndexMap;
use std::sync::RwLock as StdRwLock;
use std::sync::{Arc, PoisonError};
use tokio::sync::RwLock;

/// Bind key used when a caller passes `None`
pub const DEFAULT_BIND_KEY: &str = "default";

/// Registry of named database binds with lazy engine and session caches
///
/// Engines and sessions are created on first lookup and cached for the
/// registry's lifetime; [`BindRegistry::reset`] clears session state
/// without evicting either cache, and [`BindRegistry::close`] tears
/// both caches down while keeping the configuration.
pub struct BindRegistry {
    /// Merged configuration; later [`BindRegistry::configure`] calls
    /// overlay earlier ones
    config: StdRwLock<BindConfig>,
    /// Engine cache, in creation order
    engines: RwLock<IndexMap<String, Arc<Engine>>>,
    /// Session cache, in creation order
    sessions: RwLock<IndexMap<String, Arc<Session>>>,
}

impl BindRegistry {
    /// Create a registry with no binds configured
    pub fn new() -> Self {
        Self {
            config: StdRwLock::new(BindConfig::new()),
            engines: RwLock::new(IndexMap::new()),
            sessions: RwLock::new(IndexMap::new()),
        }
    }

    /// Create a registry from an initial configuration
    pub fn with_config(config: BindConfig) -> Self {
        let registry = Self::new();
        registry.configure(config);
        registry
    }

    /// Create a registry from a TOML configuration file
    #[cfg(feature = "config")]
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::with_config(BindConfig::from_path(path)?))
    }

    /// Merge configuration into the registry
    ///
    /// Later calls overlay earlier ones key by key; binds that were
    /// already configured and are absent from `config` stay untouched.
    /// Engines built before a bind's URI changed keep their original
    /// connection; the new URI only applies if the engine cache entry
    /// is rebuilt after [`BindRegistry::close`].
    pub fn configure(&self, config: BindConfig) {
        let mut current = self
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        current.merge(config);
        log::debug!("Registry configured, {} bind(s) known", current.len());
    }

    /// Whether statement echo is enabled for engines built from now on
    pub fn echo(&self) -> bool {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .echo_enabled()
    }

    /// Whether a bind key is present in the configuration
    pub fn has_bind(&self, key: &str) -> bool {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some()
    }

    /// All configured bind keys, in configuration order
    pub fn bind_keys(&self) -> Vec<String> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .bind_keys()
    }

    /// Get or create the engine for a bind key
    ///
    /// `None` means the `default` bind. The same `Arc<Engine>` comes
    /// back on every call for a given key; an unknown key is an
    /// [`Error::UnknownBind`]. A failed connection attempt caches
    /// nothing, so the next call retries.
    pub async fn get_engine(&self, bind_key: Option<&str>) -> Result<Arc<Engine>> {
        let key = bind_key.unwrap_or(DEFAULT_BIND_KEY);

        {
            let engines = self.engines.read().await;
            if let Some(engine) = engines.get(key) {
                return Ok(engine.clone());
            }
        }

        // Connect while holding the write lock so concurrent lookups for
        // the same key end up sharing one engine.
        let mut engines = self.engines.write().await;
        if let Some(engine) = engines.get(key) {
            return Ok(engine.clone());
        }

        let (spec, echo) = {
            let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
            let spec = config
                .get(key)
                .cloned()
                .ok_or_else(|| Error::unknown_bind(key))?;
            (spec, config.echo_enabled())
        };

        log::debug!("Engine cache miss for bind '{}', connecting", key);
        let engine = Arc::new(Engine::connect(key, &spec, echo).await?);
        engines.insert(key.to_string(), engine.clone());
        Ok(engine)
    }

    /// Get or create the session for a bind key
    ///
    /// `None` means the `default` bind. Creating a session pulls the
    /// engine for the same key through [`BindRegistry::get_engine`]
    /// first, so an unknown key fails here the same way.
    pub async fn get_session(&self, bind_key: Option<&str>) -> Result<Arc<Session>> {
        let key = bind_key.unwrap_or(DEFAULT_BIND_KEY);

        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(key) {
                return Ok(session.clone());
            }
        }

        let engine = self.get_engine(Some(key)).await?;

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(key) {
            return Ok(session.clone());
        }
        log::debug!("Session cache miss for bind '{}', creating", key);
        let session = Arc::new(Session::new(key, engine));
        sessions.insert(key.to_string(), session.clone());
        Ok(session)
    }

    /// The engine for the `default` bind
    pub async fn default_engine(&self) -> Result<Arc<Engine>> {
        self.get_engine(None).await
    }

    /// The session for the `default` bind
    pub async fn default_session(&self) -> Result<Arc<Session>> {
        self.get_session(None).await
    }

    /// Typed handle on the default session, resolved per call
    pub fn session(&self) -> SessionProxy<'_> {
        SessionProxy::new(self)
    }

    /// Typed handle on the default engine, resolved per call
    pub fn engine(&self) -> EngineProxy<'_> {
        EngineProxy::new(self)
    }

    /// Commit every active session, in creation order
    ///
    /// Stops at the first failure and returns it. Sessions earlier in
    /// the order are already committed at that point; later ones keep
    /// their transactions open for the caller to retry or roll back.
    pub async fn commit_all(&self) -> Result<()> {
        for (key, session) in self.session_snapshot().await {
            session.commit().await.map_err(|err| {
                log::error!("Commit failed for bind '{}': {}", key, err);
                err
            })?;
        }
        Ok(())
    }

    /// Roll back every active session, in creation order
    ///
    /// Stops at the first failure and returns it.
    pub async fn rollback_all(&self) -> Result<()> {
        for (key, session) in self.session_snapshot().await {
            session.rollback().await.map_err(|err| {
                log::error!("Rollback failed for bind '{}': {}", key, err);
                err
            })?;
        }
        Ok(())
    }

    /// Discard transaction state on every active session
    ///
    /// Uncommitted work is rolled back. The session and engine caches
    /// keep their entries; callers holding a session `Arc` keep a live,
    /// reusable object whose next statement starts fresh.
    pub async fn reset(&self) -> Result<()> {
        log::debug!("Resetting all sessions");
        for (key, session) in self.session_snapshot().await {
            session.remove().await.map_err(|err| {
                log::error!("Reset failed for bind '{}': {}", key, err);
                err
            })?;
        }
        Ok(())
    }

    /// Close every engine and empty both caches
    ///
    /// Open sessions are discarded first, rolling back uncommitted
    /// work, then each engine pool shuts down. Configuration survives,
    /// so the next lookup reconnects from scratch.
    pub async fn close(&self) -> Result<()> {
        let sessions: Vec<(String, Arc<Session>)> = {
            let mut guard = self.sessions.write().await;
            guard.drain(..).collect()
        };
        for (_, session) in sessions {
            session.remove().await?;
        }

        let engines: Vec<(String, Arc<Engine>)> = {
            let mut guard = self.engines.write().await;
            guard.drain(..).collect()
        };
        for (_, engine) in engines {
            engine.close().await;
        }
        Ok(())
    }

    /// Point-in-time counters for diagnostics
    pub async fn stats(&self) -> RegistryStats {
        let engines = self.engines.read().await;
        let sessions = self.sessions.read().await;

        RegistryStats {
            configured_binds: self
                .config
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            active_engines: engines.len(),
            active_sessions: sessions.len(),
            bind_keys: self.bind_keys(),
        }
    }

    /// Sessions in creation order, cloned out so bulk operations never
    /// hold the cache lock across a database round trip
    async fn session_snapshot(&self) -> Vec<(String, Arc<Session>)> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .map(|(key, session)| (key.clone(), session.clone()))
            .collect()
    }
}

impl Default for BindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about a bind registry
#[derive(Debug, Clone)]
pub struct RegistryStats {
    /// Number of binds present in the configuration
    pub configured_binds: usize,
    /// Number of engines built so far
    pub active_engines: usize,
    /// Number of sessions built so far
    pub active_sessions: usize,
    /// Configured bind keys, in configuration order
    pub bind_keys: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindSpec;

    fn memory_config() -> BindConfig {
        // One connection per bind so each in-memory database is stable
        BindConfig::new().with_bind(
            DEFAULT_BIND_KEY,
            BindSpec::from("sqlite::memory:").with_max_connections(1),
        )
    }

    #[tokio::test]
    async fn test_registry_creation() {
        let registry = BindRegistry::new();
        let stats = registry.stats().await;

        assert_eq!(stats.configured_binds, 0);
        assert_eq!(stats.active_engines, 0);
        assert_eq!(stats.active_sessions, 0);
        assert!(stats.bind_keys.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_bind() {
        let registry = BindRegistry::with_config(memory_config());

        let err = registry.get_engine(Some("missing")).await.unwrap_err();
        assert!(matches!(err, Error::UnknownBind(key) if key == "missing"));

        let err = registry.get_session(Some("missing")).await.unwrap_err();
        assert!(matches!(err, Error::UnknownBind(_)));
    }

    #[tokio::test]
    async fn test_engine_identity_per_key() {
        let registry = BindRegistry::with_config(
            memory_config().with_bind(
                "analytics",
                BindSpec::from("sqlite::memory:").with_max_connections(1),
            ),
        );

        let first = registry.get_engine(None).await.unwrap();
        let second = registry.get_engine(Some("default")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = registry.get_engine(Some("analytics")).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &other));

        let stats = registry.stats().await;
        assert_eq!(stats.active_engines, 2);
    }

    #[tokio::test]
    async fn test_session_identity_per_key() {
        let registry = BindRegistry::with_config(memory_config());

        let first = registry.get_session(None).await.unwrap();
        let second = registry.default_session().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(first.engine(), &registry.default_engine().await.unwrap()));
    }

    #[tokio::test]
    async fn test_configure_merges_later_wins() {
        let registry = BindRegistry::new();
        registry.configure(
            BindConfig::new()
                .with_echo(false)
                .with_bind("default", "sqlite::memory:"),
        );
        registry.configure(BindConfig::new().with_bind("reports", "sqlite::memory:"));

        // Second call added a bind without disturbing the first
        assert!(registry.has_bind("default"));
        assert!(registry.has_bind("reports"));
        assert!(!registry.echo());
        assert_eq!(registry.bind_keys(), vec!["default", "reports"]);
    }

    #[tokio::test]
    async fn test_commit_all_with_no_sessions() {
        let registry = BindRegistry::with_config(memory_config());
        registry.commit_all().await.unwrap();
        registry.rollback_all().await.unwrap();
        registry.reset().await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_keeps_caches() {
        let registry = BindRegistry::with_config(memory_config());

        let session = registry.default_session().await.unwrap();
        session
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", vec![])
            .await
            .unwrap();
        assert!(session.in_transaction().await);

        registry.reset().await.unwrap();
        assert!(!session.in_transaction().await);

        let again = registry.default_session().await.unwrap();
        assert!(Arc::ptr_eq(&session, &again));

        let stats = registry.stats().await;
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.active_engines, 1);
    }

    #[tokio::test]
    async fn test_close_empties_caches_and_allows_rebuild() {
        let registry = BindRegistry::with_config(memory_config());

        let before = registry.default_engine().await.unwrap();
        registry.default_session().await.unwrap();
        registry.close().await.unwrap();

        let stats = registry.stats().await;
        assert_eq!(stats.active_engines, 0);
        assert_eq!(stats.active_sessions, 0);
        assert_eq!(stats.configured_binds, 1);

        let after = registry.default_engine().await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }
}
