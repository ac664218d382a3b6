//! Stage 9 — Fine-tune Dataset Build: not detailed beyond its name in the
//! distilled spec, and the dataset builder itself is explicitly out of
//! scope (§1: "The fine-tune dataset builder and model evaluator... do not
//! belong to the orchestration core"). This stage job's only
//! responsibility is the count the builder would need as its working set —
//! pool entities whose rights mark them `trainable` — recorded as a metric,
//! with no file export.

use async_trait::async_trait;
use enliterator_storage::Stage;

use crate::error::Result;
use crate::stage_job::{StageJob, StageJobContext, StageMetrics};

pub struct FineTuneDatasetStage;

#[async_trait]
impl StageJob for FineTuneDatasetStage {
    fn stage(&self) -> Stage {
        Stage::FineTuneDatasetBuild
    }

    async fn execute(&self, ctx: &StageJobContext) -> Result<StageMetrics> {
        let entities = ctx.store.pool_entities_for_batch(&ctx.batch_id).await?;

        let mut trainable = 0u64;
        for entity in &entities {
            let rights = ctx.store.get_rights(&entity.rights_id).await?;
            if rights.trainable {
                trainable += 1;
            }
        }

        let mut metrics = StageMetrics::new();
        metrics.insert("training_examples_built".to_string(), trainable as f64);
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
    async fn counts_only_trainable_entities() {
        let ctx = test_context("1", default_external_services());
        ctx.store.save_batch(&IngestBatch::new("1", "upload")).await.unwrap();
        ctx.store
            .save_rights(&ProvenanceAndRights::test_override("r1"))
            .await
            .unwrap();
        ctx.store
            .save_rights(&ProvenanceAndRights::quarantined("r2", 0.1, "upload", "m"))
            .await
            .unwrap();
        for (id, rights_id) in [("e1", "r1"), ("e2", "r2")] {
            ctx.store
                .save_pool_entity(&PoolEntity {
                    id: id.to_string(),
                    batch_id: "1".to_string(),
                    repr_text: "an idea".to_string(),
                    rights_id: rights_id.to_string(),
                    source_item_id: "item-1".to_string(),
                    valid_time_start: Some(Utc::now()),
                    valid_time_end: None,
                    observed_at: None,
                    fields: PoolFields::Idea { label: "sustainability".to_string() },
                })
                .await
                .unwrap();
        }

        let metrics = FineTuneDatasetStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["training_examples_built"], 1.0);
    }
}
