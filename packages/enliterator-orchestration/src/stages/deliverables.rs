//! Stage 8 — Deliverables: not detailed beyond its name in the distilled
//! spec. Grounded on `BatchStatus::Delivered` and rights' `publishable`
//! flag, this marks the batch delivered and counts what is actually
//! publishable; it does not itself export or transmit anything, since the
//! delivery surface (API response, file export, notification) is outside
//! the orchestration core.

use async_trait::async_trait;
use enliterator_storage::{BatchStatus, Stage};

use crate::error::Result;
use crate::stage_job::{StageJob, StageJobContext, StageMetrics};

pub struct DeliverablesStage;

#[async_trait]
impl StageJob for DeliverablesStage {
    fn stage(&self) -> Stage {
        Stage::Deliverables
    }

    async fn execute(&self, ctx: &StageJobContext) -> Result<StageMetrics> {
        let entities = ctx.store.pool_entities_for_batch(&ctx.batch_id).await?;

        let mut publishable = 0u64;
        for entity in &entities {
            let rights = ctx.store.get_rights(&entity.rights_id).await?;
            if rights.publishable {
                publishable += 1;
            }
        }

        let mut batch = ctx.store.get_batch(&ctx.batch_id).await?;
        batch.status = BatchStatus::Delivered;
        batch.updated_at = chrono::Utc::now();
        ctx.store.save_batch(&batch).await?;

        let mut metrics = StageMetrics::new();
        metrics.insert("items_delivered".to_string(), publishable as f64);
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use enliterator_storage::{IngestBatch, PoolEntity, PoolFields, ProvenanceAndRights};

    use super::*;
    use crate::test_support::*;

    #[tokio::test]
    async fn marks_batch_delivered_and_counts_publishable_entities() {
        let ctx = test_context("1", default_external_services());
        ctx.store.save_batch(&IngestBatch::new("1", "upload")).await.unwrap();
        ctx.store
            .save_rights(&ProvenanceAndRights::test_override("r1"))
            .await
            .unwrap();
        ctx.store
            .save_pool_entity(&PoolEntity {
                id: "e1".to_string(),
                batch_id: "1".to_string(),
                repr_text: "an idea".to_string(),
                rights_id: "r1".to_string(),
                source_item_id: "item-1".to_string(),
                valid_time_start: Some(Utc::now()),
                valid_time_end: None,
                observed_at: None,
                fields: PoolFields::Idea { label: "sustainability".to_string() },
            })
            .await
            .unwrap();

        let metrics = DeliverablesStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["items_delivered"], 1.0);
        let batch = ctx.store.get_batch("1").await.unwrap();
        assert_eq!(batch.status, BatchStatus::Delivered);
    }
}
