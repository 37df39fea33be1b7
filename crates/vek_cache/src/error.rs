//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Cache operations are fail-safe at the build boundary: errors end up as
/// log lines and cache misses rather than failed builds. This enum is used
/// for internal error propagation within the cache subsystem.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache manifest could not be parsed or has an unexpected shape.
    #[error("failed to parse cache manifest: {reason}")]
    ManifestParse {
        /// Description of the parse failure.
        reason: String,
    },

    /// The manifest could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// A glob pattern could not be compiled into a matcher.
    #[error("invalid pattern '{pattern}': {reason}")]
    Pattern {
        /// The raw glob string.
        pattern: String,
        /// Description of the compilation failure.
        reason: String,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::io(
            "/tmp/cache/manifest.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("manifest.json"));
    }

    #[test]
    fn manifest_parse_display() {
        let err = CacheError::ManifestParse {
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert!(err.to_string().contains("expected value"));
    }

    #[test]
    fn serialization_error_display() {
        let err = CacheError::Serialization {
            reason: "key must be a string".to_string(),
        };
        assert!(err.to_string().contains("key must be a string"));
    }

    #[test]
    fn pattern_error_display() {
        let err = CacheError::Pattern {
            pattern: "src/**".to_string(),
            reason: "compiled regex exceeds size limit".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("src/**"));
        assert!(msg.contains("size limit"));
    }
}
