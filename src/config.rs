//! Bind configuration structures and parsing
//!
//! This module holds the registry's configuration: the echo flag and the
//! map from bind key to connection spec. The map keeps insertion order so
//! bulk operations walk binds in a stable, predictable sequence.

#[cfg(feature = "config")]
use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Configuration for a single bind
///
/// Everything except the URL has a sensible default, so a bare URI string
/// converts straight into a spec via `From`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "BindSpecSource")]
pub struct BindSpec {
    /// Database connection URL (required)
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connect_timeout: u64,

    /// Idle timeout in seconds (how long a connection can sit idle before being closed)
    pub idle_timeout: u64,

    /// Maximum lifetime of a connection in seconds
    pub max_lifetime: u64,
}

impl BindSpec {
    /// Create a spec for the given URL with default pool parameters
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
            max_lifetime: default_max_lifetime(),
        }
    }

    /// Set maximum connections
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set minimum connections
    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set connection timeout in seconds
    pub fn with_connect_timeout(mut self, timeout: u64) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set idle timeout in seconds
    pub fn with_idle_timeout(mut self, timeout: u64) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set maximum connection lifetime in seconds
    pub fn with_max_lifetime(mut self, lifetime: u64) -> Self {
        self.max_lifetime = lifetime;
        self
    }
}

impl From<&str> for BindSpec {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for BindSpec {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

/// Accepts either a bare URI string or a full table when deserializing,
/// the same shape Cargo uses for dependency entries.
#[derive(Deserialize)]
#[serde(untagged)]
enum BindSpecSource {
    Url(String),
    Table {
        url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        #[serde(default = "default_min_connections")]
        min_connections: u32,
        #[serde(default = "default_connect_timeout")]
        connect_timeout: u64,
        #[serde(default = "default_idle_timeout")]
        idle_timeout: u64,
        #[serde(default = "default_max_lifetime")]
        max_lifetime: u64,
    },
}

impl From<BindSpecSource> for BindSpec {
    fn from(source: BindSpecSource) -> Self {
        match source {
            BindSpecSource::Url(url) => Self::new(url),
            BindSpecSource::Table {
                url,
                max_connections,
                min_connections,
                connect_timeout,
                idle_timeout,
                max_lifetime,
            } => Self {
                url,
                max_connections,
                min_connections,
                connect_timeout,
                idle_timeout,
                max_lifetime,
            },
        }
    }
}

/// Configuration for the whole registry
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BindConfig {
    /// Whether engines log every executed statement. Unset means enabled;
    /// the value is snapshotted when an engine is first created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo: Option<bool>,

    /// Map of bind key to connection spec, in insertion order
    #[serde(default)]
    pub binds: IndexMap<String, BindSpec>,
}

impl BindConfig {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the echo flag, chainable
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = Some(echo);
        self
    }

    /// Add a bind, chainable
    pub fn with_bind(mut self, key: impl Into<String>, spec: impl Into<BindSpec>) -> Self {
        self.binds.insert(key.into(), spec.into());
        self
    }

    /// Add a bind in place
    pub fn add_bind(&mut self, key: impl Into<String>, spec: impl Into<BindSpec>) {
        self.binds.insert(key.into(), spec.into());
    }

    /// Get a bind spec by key
    pub fn get(&self, key: &str) -> Option<&BindSpec> {
        self.binds.get(key)
    }

    /// Effective echo value (defaults to enabled when never set)
    pub fn echo_enabled(&self) -> bool {
        self.echo.unwrap_or(true)
    }

    /// Check if any binds are configured
    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    /// Get the number of configured binds
    pub fn len(&self) -> usize {
        self.binds.len()
    }

    /// List all bind keys in insertion order
    pub fn bind_keys(&self) -> Vec<String> {
        self.binds.keys().cloned().collect()
    }

    /// Merge with another configuration (other takes precedence)
    ///
    /// Bind entries from `other` overlay entries with the same key and
    /// leave the rest untouched. The echo flag is only overwritten when
    /// `other` actually set it.
    pub fn merge(&mut self, other: BindConfig) {
        if other.echo.is_some() {
            self.echo = other.echo;
        }
        for (key, spec) in other.binds {
            self.binds.insert(key, spec);
        }
    }
}

#[cfg(feature = "config")]
impl BindConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration from a TOML file
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

// Default values for configuration
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_idle_timeout() -> u64 {
    600
} // 10 minutes
fn default_max_lifetime() -> u64 {
    1800
} // 30 minutes
