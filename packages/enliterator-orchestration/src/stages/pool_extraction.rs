//! Stage 4 — Pool Extraction (§4.3): typed entities and relations out of
//! items whose lexicon pass has completed.

use async_trait::async_trait;
use enliterator_storage::{ItemStageKind, Stage, StageStatus};

use crate::error::{ErrorCategory, OrchestratorError, Result};
use crate::stage_job::{StageJob, StageJobContext, StageMetrics};

pub struct PoolExtractionStage;

#[async_trait]
impl StageJob for PoolExtractionStage {
    fn stage(&self) -> Stage {
        Stage::PoolExtraction
    }

    async fn execute(&self, ctx: &StageJobContext) -> Result<StageMetrics> {
        let items: Vec<_> = ctx
            .store
            .items_by_stage_status(
                &ctx.batch_id,
                ItemStageKind::Pool,
                &[StageStatus::Pending, StageStatus::Failed],
            )
            .await?
            .into_iter()
            .filter(|item| !item.quarantined && item.stages.lexicon == StageStatus::Completed)
            .collect();

        let lexicon = ctx.store.lexicon_for_batch(&ctx.batch_id).await?;

        let mut entities_created = 0u64;
        let mut relations_created = 0u64;

        for mut item in items {
            let Some(rights_id) = item.rights_id.clone() else {
                return Err(OrchestratorError::stage_failed(
                    "pool_extraction",
                    ErrorCategory::PreconditionFailure,
                    format!("item {} has no rights_id but is eligible for pool extraction", item.id),
                ));
            };

            let result = ctx
                .external
                .pool_extraction
                .extract(&item.content, &lexicon)
                .await
                .map_err(|e| {
                    OrchestratorError::stage_failed(
                        "pool_extraction",
                        ErrorCategory::ExternalTransient,
                        e.to_string(),
                    )
                })?;

            for mut entity in result.entities {
                entity.rights_id = rights_id.clone();
                entity.source_item_id = item.id.clone();
                ctx.store.save_pool_entity(&entity).await?;
                entities_created += 1;
            }
            for mut relation in result.relations {
                relation.rights_id = rights_id.clone();
                ctx.store.save_relation(&relation).await?;
                relations_created += 1;
            }

            item.stages.pool = StageStatus::Completed;
            ctx.store.save_item(&item).await?;
        }

        let mut metrics = StageMetrics::new();
        metrics.insert("entities_created".to_string(), entities_created as f64);
        metrics.insert("relations_created".to_string(), relations_created as f64);
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use enliterator_storage::{
        EntityRef, IngestBatch, IngestItem, PoolEntity, PoolFields, ProvenanceAndRights, Relation,
    };

    use super::*;
    use crate::test_support::*;

    fn idea_entity(id: &str) -> PoolEntity {
        PoolEntity {
            id: id.to_string(),
            batch_id: "1".to_string(),
            repr_text: "an idea".to_string(),
            rights_id: String::new(),
            source_item_id: String::new(),
            valid_time_start: Some(Utc::now()),
            valid_time_end: None,
            observed_at: None,
            fields: PoolFields::Idea { label: "sustainability".to_string() },
        }
    }

    async fn ctx_with_eligible_item(entities: Vec<PoolEntity>, relations: Vec<Relation>) -> StageJobContext {
        let ctx = test_context(
            "1",
            crate::external::ExternalServices {
                pool_extraction: Box::new(FakePoolExtractionService { entities, relations }),
                ..default_external_services()
            },
        );
        ctx.store.save_batch(&IngestBatch::new("1", "upload")).await.unwrap();
        ctx.store
            .save_rights(&ProvenanceAndRights::test_override("r1"))
            .await
            .unwrap();
        let mut item = IngestItem::from_content("item-1", "1", "text/plain", "hello".to_string());
        item.rights_id = Some("r1".to_string());
        item.stages.triage = StageStatus::Completed;
        item.stages.lexicon = StageStatus::Completed;
        item.stages.pool = StageStatus::Pending;
        ctx.store.save_item(&item).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn persists_entities_stamped_with_item_rights_and_source() {
        let ctx = ctx_with_eligible_item(vec![idea_entity("e1")], vec![]).await;
        let metrics = PoolExtractionStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["entities_created"], 1.0);

        let entities = ctx.store.pool_entities_for_batch("1").await.unwrap();
        assert_eq!(entities[0].rights_id, "r1");
        assert_eq!(entities[0].source_item_id, "item-1");

        let item = ctx.store.get_item("item-1").await.unwrap();
        assert_eq!(item.stages.pool, StageStatus::Completed);
    }

    #[tokio::test]
    async fn relations_are_stamped_with_item_rights() {
        let relation = Relation::new(
            "rel-1",
            "1",
            EntityRef::new("Idea", "e1"),
            EntityRef::new("Manifest", "m1"),
            "embodies",
            "",
        );
        let ctx = ctx_with_eligible_item(vec![], vec![relation]).await;
        PoolExtractionStage.execute(&ctx).await.unwrap();
        let relations = ctx.store.relations_for_batch("1").await.unwrap();
        assert_eq!(relations[0].rights_id, "r1");
    }
}
