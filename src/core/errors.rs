//! TMP-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, CleanerError>;

/// Top-level error type for the temp cleaner.
#[derive(Debug, Error)]
pub enum CleanerError {
    #[error("[TMP-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[TMP-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[TMP-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[TMP-2001] watched directory unreadable {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[TMP-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[TMP-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[TMP-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl CleanerError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "TMP-1001",
            Self::MissingConfig { .. } => "TMP-1002",
            Self::ConfigParse { .. } => "TMP-1003",
            Self::DirectoryUnreadable { .. } => "TMP-2001",
            Self::Serialization { .. } => "TMP-2101",
            Self::Io { .. } => "TMP-3002",
            Self::Runtime { .. } => "TMP-3900",
        }
    }

    /// Whether retrying on a later cycle might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DirectoryUnreadable { .. } | Self::Io { .. } | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for CleanerError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for CleanerError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for CleanerError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_variant() -> Vec<CleanerError> {
        vec![
            CleanerError::InvalidConfig {
                details: String::new(),
            },
            CleanerError::MissingConfig {
                path: PathBuf::new(),
            },
            CleanerError::ConfigParse {
                context: "",
                details: String::new(),
            },
            CleanerError::DirectoryUnreadable {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            CleanerError::Serialization {
                context: "",
                details: String::new(),
            },
            CleanerError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            CleanerError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let codes: Vec<&str> = every_variant().iter().map(CleanerError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_includes_code() {
        for err in every_variant() {
            let msg = err.to_string();
            assert!(
                msg.contains(err.code()),
                "display should contain error code: {msg}"
            );
        }
    }

    #[test]
    fn unreadable_directory_is_retryable_config_is_not() {
        assert!(
            CleanerError::DirectoryUnreadable {
                path: PathBuf::from("/nope"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }
            .is_retryable()
        );
        assert!(
            !CleanerError::InvalidConfig {
                details: "bad".to_string()
            }
            .is_retryable()
        );
        assert!(
            !CleanerError::MissingConfig {
                path: PathBuf::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = CleanerError::io(
            "/tmp/test.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "TMP-3002");
        assert!(err.to_string().contains("/tmp/test.txt"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: CleanerError = json_err.into();
        assert_eq!(err.code(), "TMP-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: CleanerError = toml_err.into();
        assert_eq!(err.code(), "TMP-1003");
    }
}
