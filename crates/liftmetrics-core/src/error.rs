//! Error and warning types shared by every pipeline stage.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while deduplicating or analyzing lift logs.
#[derive(Debug, Error)]
pub enum LiftError {
    /// A required path or setting was not supplied.
    #[error("Missing configuration: {setting}")]
    ConfigMissing { setting: String },

    /// Configuration was supplied but cannot be used.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A file could not be opened or read.
    #[error("Cannot read {path}: {source}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file has no content at all.
    #[error("Empty file: {path}")]
    EmptyFile { path: PathBuf },

    /// A row could not be parsed or coerced.
    #[error("Malformed row {line} in {path}: {message}")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        message: String,
    },

    /// A column needed by an analyzer is absent from the header.
    #[error("Missing required column '{column}' in {path}")]
    MissingRequiredColumn { path: PathBuf, column: String },

    /// Nothing was left to aggregate.
    #[error("No data for aggregation: {context}")]
    NoDataForAggregation { context: String },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON artifact could not be encoded or decoded.
    #[error("JSON error at {path}: {message}")]
    Json { path: PathBuf, message: String },

    /// Path expected to be a directory is not one.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

impl LiftError {
    /// Create an I/O error with path context.
    ///
    /// Missing paths and permission problems surface as [`LiftError::FileUnreadable`]
    /// so callers can skip the file and keep going.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::NotFound => {
                Self::FileUnreadable { path, source }
            }
            _ => Self::Io { path, source },
        }
    }

    /// Whether the run may continue with the next file after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::ConfigMissing { .. } | Self::InvalidConfig { .. } | Self::NotADirectory { .. }
        )
    }

    /// Warning kind used when this error is downgraded to a [`FileWarning`].
    pub fn warning_kind(&self) -> WarningKind {
        match self {
            Self::EmptyFile { .. } => WarningKind::Empty,
            Self::MalformedRow { .. } | Self::Json { .. } => WarningKind::Malformed,
            Self::MissingRequiredColumn { .. } => WarningKind::MissingColumn,
            Self::NoDataForAggregation { .. } => WarningKind::NoData,
            _ => WarningKind::Unreadable,
        }
    }
}

/// Kind of non-fatal warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// File or directory could not be read.
    Unreadable,
    /// File had no content.
    Empty,
    /// A row or artifact could not be parsed.
    Malformed,
    /// A required column was absent.
    MissingColumn,
    /// An aggregation had nothing to work with.
    NoData,
    /// File name carries no lift identifier.
    Ungrouped,
    /// A duplicate could not be removed.
    RemovalFailed,
}

/// Non-fatal problem recorded while processing a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl FileWarning {
    /// Create a new warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Downgrade a recoverable error into a warning for `path`.
    pub fn from_error(path: impl Into<PathBuf>, error: &LiftError) -> Self {
        Self {
            path: path.into(),
            message: error.to_string(),
            kind: error.warning_kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_classification() {
        let err = LiftError::io(
            "/data/site/file.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, LiftError::FileUnreadable { .. }));
        assert!(err.is_recoverable());

        let err = LiftError::io(
            "/data/site/file.csv",
            std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
        );
        assert!(matches!(err, LiftError::Io { .. }));
    }

    #[test]
    fn test_config_errors_are_fatal() {
        let err = LiftError::ConfigMissing {
            setting: "root".into(),
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("root"));
    }

    #[test]
    fn test_warning_from_error() {
        let err = LiftError::MissingRequiredColumn {
            path: "a.csv".into(),
            column: "_lds".into(),
        };
        let warning = FileWarning::from_error("a.csv", &err);
        assert_eq!(warning.kind, WarningKind::MissingColumn);
        assert!(warning.message.contains("_lds"));
    }
}
