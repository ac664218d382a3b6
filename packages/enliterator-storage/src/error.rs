//! Error types for enliterator-storage

use std::fmt;
use thiserror::Error;

/// Storage error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Database errors (SQLite, etc.)
    Database,
    /// Serialization/deserialization errors
    Serialization,
    /// Batch not found
    BatchNotFound,
    /// Item not found
    ItemNotFound,
    /// Rights record not found
    RightsNotFound,
    /// Pipeline run not found
    RunNotFound,
    /// Optimistic-concurrency conflict on a compare-and-set write
    ConflictingWrite,
    /// Transaction errors
    Transaction,
    /// Configuration errors
    Config,
    /// I/O errors
    IO,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::BatchNotFound => "batch_not_found",
            ErrorKind::ItemNotFound => "item_not_found",
            ErrorKind::RightsNotFound => "rights_not_found",
            ErrorKind::RunNotFound => "run_not_found",
            ErrorKind::ConflictingWrite => "conflicting_write",
            ErrorKind::Transaction => "transaction",
            ErrorKind::Config => "config",
            ErrorKind::IO => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn batch_not_found(batch_id: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::BatchNotFound,
            format!("batch not found: {}", batch_id.into()),
        )
    }

    pub fn item_not_found(item_id: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ItemNotFound,
            format!("item not found: {}", item_id.into()),
        )
    }

    pub fn run_not_found(run_id: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::RunNotFound,
            format!("pipeline run not found: {}", run_id.into()),
        )
    }

    pub fn conflicting_write(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConflictingWrite, message)
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::database(format!("sqlite error: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("json error: {}", err)).with_source(err)
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::batch_not_found("abc123");
        let msg = format!("{}", err);
        assert!(msg.contains("batch_not_found"));
        assert!(msg.contains("abc123"));
    }

    #[test]
    fn test_conflicting_write() {
        let err = StorageError::conflicting_write("current_stage mismatch");
        assert_eq!(err.kind, ErrorKind::ConflictingWrite);
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json")
            .err()
            .unwrap();
        let err: StorageError = json_err.into();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }
}
