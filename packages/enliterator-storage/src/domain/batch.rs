//! Ingest batches: the unit of work submitted to the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an [`IngestBatch`], mirrored from its owning
/// [`PipelineRun`](crate::domain::pipeline_run::PipelineRun) stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Initialized,
    Triaging,
    Lexicon,
    Pooling,
    Graph,
    Embedding,
    Scoring,
    Delivered,
    Failed,
}

/// A logical collection of documents submitted together for enliteration.
///
/// An `IngestBatch` owns a dedicated graph database (named `ekn-<id>`) and
/// is the root identity that every [`IngestItem`](super::item::IngestItem),
/// pool entity, and relation ultimately traces back to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestBatch {
    pub id: String,
    /// Human-readable description of the originating source (directory,
    /// upload name, crawl job id, ...).
    pub source_descriptor: String,
    pub status: BatchStatus,
    /// Literacy score in [0, 100], populated once Literacy Scoring runs.
    pub literacy_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IngestBatch {
    pub fn new(id: impl Into<String>, source_descriptor: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            source_descriptor: source_descriptor.into(),
            status: BatchStatus::Initialized,
            literacy_score: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name of this batch's dedicated graph database: `ekn-<id>`.
    pub fn graph_database_name(&self) -> String {
        format!("ekn-{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_database_name_is_prefixed() {
        let batch = IngestBatch::new("42", "local-upload");
        assert_eq!(batch.graph_database_name(), "ekn-42");
    }

    #[test]
    fn new_batch_starts_initialized() {
        let batch = IngestBatch::new("1", "crawl-job-9");
        assert_eq!(batch.status, BatchStatus::Initialized);
        assert!(batch.literacy_score.is_none());
    }
}
