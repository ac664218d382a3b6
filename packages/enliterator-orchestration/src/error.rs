//! Error types for enliterator-orchestration.
//!
//! `ErrorCategory` is the six-kind taxonomy from `SPEC_FULL.md` §7; it
//! drives retry/backoff decisions the way the relational store's
//! `ErrorKind` drives storage-layer error reporting.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// The six error kinds a pipeline run can fail with (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or out-of-contract input; never retriable.
    InvalidInput,
    /// A precondition the stage depends on does not hold (e.g. missing
    /// rights record); never retriable without operator intervention.
    PreconditionFailure,
    /// An external dependency (graph store, embedding service, rights
    /// service) failed in a way that is expected to clear on its own.
    ExternalTransient,
    /// An external dependency failed in a way that will not clear by
    /// retrying (auth failure, schema mismatch).
    ExternalPermanent,
    /// A graph or relational invariant was violated.
    IntegrityFailure,
    /// A CAS write lost a race against a concurrent transition; the
    /// caller should re-read current state and decide whether to retry.
    StateTransitionConflict,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::PreconditionFailure => "precondition_failure",
            ErrorCategory::ExternalTransient => "external_transient",
            ErrorCategory::ExternalPermanent => "external_permanent",
            ErrorCategory::IntegrityFailure => "integrity_failure",
            ErrorCategory::StateTransitionConflict => "state_transition_conflict",
        }
    }

    /// Only `ExternalTransient` failures schedule an automatic retry
    /// (§4.1 failure semantics, §6 `max_retries`/backoff bounds).
    pub fn is_retriable(&self) -> bool {
        matches!(self, ErrorCategory::ExternalTransient)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("storage error: {0}")]
    Storage(#[from] enliterator_storage::StorageError),

    #[error("graph error: {0}")]
    Graph(#[from] enliterator_graph::GraphError),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("pipeline run not found: {0}")]
    RunNotFound(String),

    #[error("stage job not registered: {0}")]
    StageNotFound(String),

    #[error("stage execution failed at {stage}: {message}")]
    StageExecutionFailed {
        stage: String,
        category: ErrorCategory,
        message: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OrchestratorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn stage_failed(
        stage: impl Into<String>,
        category: ErrorCategory,
        message: impl Into<String>,
    ) -> Self {
        Self::StageExecutionFailed {
            stage: stage.into(),
            category,
            message: message.into(),
        }
    }

    /// Best-effort classification of an opaque error into §7's taxonomy,
    /// used when a stage job returns a bare `anyhow::Error` from an
    /// external call instead of a pre-classified `StageExecutionFailed`.
    pub fn category(&self) -> ErrorCategory {
        match self {
            OrchestratorError::StageExecutionFailed { category, .. } => *category,
            OrchestratorError::Graph(e) => match e.kind {
                enliterator_graph::ErrorKind::InvalidInput => ErrorCategory::InvalidInput,
                enliterator_graph::ErrorKind::Integrity => ErrorCategory::IntegrityFailure,
                enliterator_graph::ErrorKind::UnknownVerb => ErrorCategory::InvalidInput,
                enliterator_graph::ErrorKind::Precondition => ErrorCategory::PreconditionFailure,
                enliterator_graph::ErrorKind::Backend => ErrorCategory::ExternalTransient,
                enliterator_graph::ErrorKind::Serialization => ErrorCategory::InvalidInput,
            },
            OrchestratorError::Storage(e) => match e.kind {
                enliterator_storage::ErrorKind::ConflictingWrite => {
                    ErrorCategory::StateTransitionConflict
                }
                enliterator_storage::ErrorKind::BatchNotFound
                | enliterator_storage::ErrorKind::ItemNotFound
                | enliterator_storage::ErrorKind::RightsNotFound
                | enliterator_storage::ErrorKind::RunNotFound => ErrorCategory::PreconditionFailure,
                enliterator_storage::ErrorKind::Serialization => ErrorCategory::InvalidInput,
                _ => ErrorCategory::ExternalTransient,
            },
            OrchestratorError::InvalidStateTransition { .. } => {
                ErrorCategory::StateTransitionConflict
            }
            OrchestratorError::Config(_) | OrchestratorError::StageNotFound(_) => {
                ErrorCategory::InvalidInput
            }
            OrchestratorError::Timeout(_) => ErrorCategory::ExternalTransient,
            OrchestratorError::RunNotFound(_) => ErrorCategory::PreconditionFailure,
            OrchestratorError::Other(_) => ErrorCategory::ExternalPermanent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_external_transient_is_retriable() {
        assert!(ErrorCategory::ExternalTransient.is_retriable());
        assert!(!ErrorCategory::InvalidInput.is_retriable());
        assert!(!ErrorCategory::IntegrityFailure.is_retriable());
    }

    #[test]
    fn conflicting_write_classifies_as_state_transition_conflict() {
        let storage_err = enliterator_storage::StorageError::conflicting_write("stale");
        let err: OrchestratorError = storage_err.into();
        assert_eq!(err.category(), ErrorCategory::StateTransitionConflict);
    }
}
