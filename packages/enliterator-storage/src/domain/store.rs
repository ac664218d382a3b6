//! The `EnliteratorStore` port: the single relational-store abstraction
//! every stage job and the pipeline runner mutate state through.

use async_trait::async_trait;

use crate::Result;

use super::batch::IngestBatch;
use super::item::IngestItem;
use super::lexicon::LexiconEntry;
use super::pipeline_run::{PipelineRun, Stage};
use super::pools::PoolEntity;
use super::relation::Relation;
use super::rights::ProvenanceAndRights;

/// Durable record of batches, items, rights, lexicon, pool entities,
/// relations and pipeline runs (`SPEC_FULL.md` C1).
///
/// Implementations MUST make [`EnliteratorStore::update_pipeline_run`]
/// a compare-and-set on `current_stage`, so that two concurrent retries of
/// the same run cannot both observe success (§5, "Shared resources").
#[async_trait]
pub trait EnliteratorStore: Send + Sync {
    // ─── Batches ───────────────────────────────────────────────────────
    async fn save_batch(&self, batch: &IngestBatch) -> Result<()>;
    async fn get_batch(&self, batch_id: &str) -> Result<IngestBatch>;

    // ─── Items ─────────────────────────────────────────────────────────
    async fn save_item(&self, item: &IngestItem) -> Result<()>;
    async fn get_item(&self, item_id: &str) -> Result<IngestItem>;
    /// All items for a batch whose stage status is among `statuses`, used
    /// by stage jobs to compute their idempotent work set.
    async fn items_by_stage_status(
        &self,
        batch_id: &str,
        stage: ItemStageKind,
        statuses: &[super::item::StageStatus],
    ) -> Result<Vec<IngestItem>>;
    /// Look up an item by content hash, to dedupe identical items within a
    /// batch during Intake.
    async fn find_item_by_hash(
        &self,
        batch_id: &str,
        content_hash: &str,
    ) -> Result<Option<IngestItem>>;

    // ─── Rights ────────────────────────────────────────────────────────
    async fn save_rights(&self, rights: &ProvenanceAndRights) -> Result<()>;
    async fn get_rights(&self, rights_id: &str) -> Result<ProvenanceAndRights>;

    // ─── Lexicon ───────────────────────────────────────────────────────
    async fn save_lexicon_entry(&self, entry: &LexiconEntry) -> Result<()>;
    async fn find_lexicon_entry_by_term(
        &self,
        batch_id: &str,
        canonical_term: &str,
    ) -> Result<Option<LexiconEntry>>;
    async fn lexicon_for_batch(&self, batch_id: &str) -> Result<Vec<LexiconEntry>>;

    // ─── Pool entities ─────────────────────────────────────────────────
    async fn save_pool_entity(&self, entity: &PoolEntity) -> Result<()>;
    async fn pool_entities_for_batch(&self, batch_id: &str) -> Result<Vec<PoolEntity>>;

    // ─── Relations ─────────────────────────────────────────────────────
    async fn save_relation(&self, relation: &Relation) -> Result<()>;
    async fn relations_for_batch(&self, batch_id: &str) -> Result<Vec<Relation>>;

    // ─── Pipeline runs ─────────────────────────────────────────────────
    async fn save_pipeline_run(&self, run: &PipelineRun) -> Result<()>;
    async fn get_pipeline_run(&self, run_id: &str) -> Result<PipelineRun>;
    /// Persist `run`, but only if the row currently on disk has
    /// `current_stage == expected_current_stage`. Returns
    /// `Err(StorageError { kind: ConflictingWrite, .. })` on mismatch.
    async fn update_pipeline_run(
        &self,
        run: &PipelineRun,
        expected_current_stage: Stage,
    ) -> Result<()>;
}

/// Which of an item's stage-status fields a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStageKind {
    Triage,
    Lexicon,
    Pool,
}
