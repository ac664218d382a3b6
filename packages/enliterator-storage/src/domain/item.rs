//! Ingested items and their per-stage progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Status of a single item with respect to a single pipeline stage.
///
/// Item stage statuses only ever move forward within a stage
/// (`pending -> in_progress -> {completed, failed, quarantined}`); regression
/// happens only via an explicit `reset_to_stage` operator action on the
/// owning [`PipelineRun`](crate::domain::pipeline_run::PipelineRun).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Quarantined,
}

impl Default for StageStatus {
    fn default() -> Self {
        StageStatus::Pending
    }
}

/// Per-stage status bookkeeping carried on every [`IngestItem`].
///
/// Only the stages that operate at item granularity are tracked here;
/// Graph Assembly, Embeddings, Literacy Scoring and Deliverables operate on
/// the batch/run as a whole and are tracked on the
/// [`PipelineRun`](crate::domain::pipeline_run::PipelineRun) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ItemStageStatuses {
    pub triage: StageStatus,
    pub lexicon: StageStatus,
    pub pool: StageStatus,
}

/// One file or document within an [`IngestBatch`](super::batch::IngestBatch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestItem {
    pub id: String,
    pub batch_id: String,
    /// SHA-256 of `content`, used to deduplicate identical items within a
    /// batch.
    pub content_hash: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub content: String,
    /// First 5 KB of `content`, stored separately so previews don't require
    /// loading the full document.
    pub content_sample: String,
    pub stages: ItemStageStatuses,
    /// Set once Rights & Provenance quarantines the item (low-confidence or
    /// rejected rights inference).
    pub quarantined: bool,
    /// Foreign key into `ProvenanceAndRights`, populated by the Rights stage.
    pub rights_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

const CONTENT_SAMPLE_BYTES: usize = 5 * 1024;

impl IngestItem {
    /// Build a new item from raw content, computing its content hash and
    /// sample. `id` should be a stable identifier (e.g. a UUID) assigned by
    /// the caller.
    pub fn from_content(
        id: impl Into<String>,
        batch_id: impl Into<String>,
        mime_type: impl Into<String>,
        content: String,
    ) -> Self {
        let content_hash = Self::hash(&content);
        let size_bytes = content.len() as u64;
        let content_sample = content.chars().take(CONTENT_SAMPLE_BYTES).collect();
        Self {
            id: id.into(),
            batch_id: batch_id.into(),
            content_hash,
            size_bytes,
            mime_type: mime_type.into(),
            content,
            content_sample,
            stages: ItemStageStatuses::default(),
            quarantined: false,
            rights_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        let a = IngestItem::from_content("1", "b", "text/plain", "hello".to_string());
        let b = IngestItem::from_content("2", "b", "text/plain", "hello".to_string());
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn content_sample_truncates_long_content() {
        let long = "x".repeat(CONTENT_SAMPLE_BYTES * 2);
        let item = IngestItem::from_content("1", "b", "text/plain", long);
        assert_eq!(item.content_sample.len(), CONTENT_SAMPLE_BYTES);
    }

    #[test]
    fn new_item_stages_start_pending() {
        let item = IngestItem::from_content("1", "b", "text/plain", "x".to_string());
        assert_eq!(item.stages.triage, StageStatus::Pending);
        assert!(!item.quarantined);
        assert!(item.rights_id.is_none());
    }
}
