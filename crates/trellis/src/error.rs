//! Error types for Trellis.

use std::path::PathBuf;

use thiserror::Error;
use trellis_core::CoreError;

/// Failure reported by a [`ResourceFetcher`](crate::cell::ResourceFetcher).
///
/// Cells absorb these and fall back to their placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The request was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,
    /// The entity has no resource to fetch.
    #[error("resource unavailable for entity {0}")]
    Unavailable(String),
    /// No connectivity and the request did not wait for it.
    #[error("offline")]
    Offline,
    /// The fetch failed.
    #[error("fetch failed: {0}")]
    Failed(String),
}

/// Failure loading or validating a [`TrellisConfig`](crate::config::TrellisConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config syntax")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Any error raised by Trellis.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for Trellis operations.
pub type Result<T> = std::result::Result<T, TrellisError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use trellis_core::PoolError;

    #[test]
    fn test_display() {
        assert_eq!(ResourceError::Unavailable("doc-1".into()).to_string(), "resource unavailable for entity doc-1");
        let invalid = ConfigError::Invalid {
            field: "prefetch.margin_factor",
            reason: "must be finite and non-negative".into(),
        };
        assert_eq!(
            invalid.to_string(),
            "invalid value for `prefetch.margin_factor`: must be finite and non-negative"
        );
    }

    #[test]
    fn test_conversions() {
        let err: TrellisError = CoreError::from(PoolError::CreationFailed("no threads".into())).into();
        assert!(matches!(err, TrellisError::Core(_)));

        let parse = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let err: TrellisError = ConfigError::from(parse).into();
        assert!(matches!(err, TrellisError::Config(ConfigError::Parse(_))));

        let io = ConfigError::Io {
            path: PathBuf::from("/missing.toml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(io.source().is_some());
    }
}
