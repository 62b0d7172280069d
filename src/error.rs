use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bind registry.
#[derive(Error, Debug)]
pub enum Error {
    /// A bind key that the configuration does not contain, including the
    /// required `default` key when it was never configured.
    #[error("Unknown bind key: {0}")]
    UnknownBind(String),

    #[error("Unsupported database URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine, session and statement failures pass through unwrapped so
    /// callers see the driver's own failure type.
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn unknown_bind(key: impl Into<String>) -> Self {
        Self::UnknownBind(key.into())
    }

    pub fn unsupported_scheme(url: impl Into<String>) -> Self {
        Self::UnsupportedScheme(url.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Sqlx(sqlx::Error::PoolTimedOut)
                | Error::Sqlx(sqlx::Error::Io(_))
                | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_bind_display() {
        let err = Error::unknown_bind("analytics");
        assert_eq!(err.to_string(), "Unknown bind key: analytics");
    }

    #[test]
    fn test_unsupported_scheme_display() {
        let err = Error::unsupported_scheme("oracle://db/x");
        assert_eq!(err.to_string(), "Unsupported database URL scheme: oracle://db/x");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Sqlx(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!Error::unknown_bind("default").is_retryable());
        assert!(!Error::config("bad shape").is_retryable());
    }
}
