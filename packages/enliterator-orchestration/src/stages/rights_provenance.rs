//! Stage 2 — Rights & Provenance (§4.3): infer or override rights for every
//! triaged item, quarantining low-confidence inferences rather than
//! discarding them.

use async_trait::async_trait;
use enliterator_storage::{ItemStageKind, ProvenanceAndRights, Stage, StageStatus};

use crate::error::{ErrorCategory, OrchestratorError, Result};
use crate::stage_job::{StageJob, StageJobContext, StageMetrics};

pub struct RightsProvenanceStage;

#[async_trait]
impl StageJob for RightsProvenanceStage {
    fn stage(&self) -> Stage {
        Stage::RightsProvenance
    }

    async fn execute(&self, ctx: &StageJobContext) -> Result<StageMetrics> {
        let items = ctx
            .store
            .items_by_stage_status(
                &ctx.batch_id,
                ItemStageKind::Triage,
                &[StageStatus::Pending, StageStatus::Failed],
            )
            .await?;

        let batch = ctx.store.get_batch(&ctx.batch_id).await?;
        let use_override = ctx.config.test_rights_override && batch.source_descriptor == "synthetic";

        let mut completed = 0u64;
        let mut quarantined = 0u64;

        for mut item in items {
            let rights_id = uuid::Uuid::new_v4().to_string();

            let rights = if use_override {
                ProvenanceAndRights::test_override(rights_id.clone())
            } else {
                let inference = ctx.external.rights.infer(&item).await.map_err(|e| {
                    OrchestratorError::stage_failed(
                        "rights_provenance",
                        ErrorCategory::ExternalTransient,
                        e.to_string(),
                    )
                })?;
                if inference.confidence >= enliterator_storage::RIGHTS_CONFIDENCE_THRESHOLD {
                    ProvenanceAndRights::accepted(
                        rights_id.clone(),
                        inference.license,
                        inference.consent,
                        inference.publishable,
                        inference.trainable,
                        inference.confidence,
                        inference.source_type,
                        inference.method,
                    )
                } else {
                    ProvenanceAndRights::quarantined(
                        rights_id.clone(),
                        inference.confidence,
                        inference.source_type,
                        inference.method,
                    )
                }
            };

            let accepted = rights.meets_confidence_threshold();
            ctx.store.save_rights(&rights).await?;

            item.rights_id = Some(rights_id);
            if accepted {
                item.stages.triage = StageStatus::Completed;
                item.stages.lexicon = StageStatus::Pending;
                completed += 1;
            } else {
                item.quarantined = true;
                item.stages.triage = StageStatus::Quarantined;
                quarantined += 1;
            }
            ctx.store.save_item(&item).await?;
        }

        let mut metrics = StageMetrics::new();
        metrics.insert("items_completed".to_string(), completed as f64);
        metrics.insert("items_quarantined".to_string(), quarantined as f64);
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use enliterator_storage::{IngestBatch, IngestItem};

    use super::*;
    use crate::test_support::*;

    async fn ctx_with_one_pending_item(confidence: f64) -> StageJobContext {
        let ctx = test_context(
            "1",
            crate::external::ExternalServices {
                rights: Box::new(FakeRightsService { confidence }),
                ..default_external_services()
            },
        );
        ctx.store.save_batch(&IngestBatch::new("1", "upload")).await.unwrap();
        let item = IngestItem::from_content("item-1", "1", "text/plain", "hello".to_string());
        ctx.store.save_item(&item).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn high_confidence_inference_completes_triage() {
        let ctx = ctx_with_one_pending_item(0.95).await;
        let metrics = RightsProvenanceStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["items_completed"], 1.0);
        assert_eq!(metrics["items_quarantined"], 0.0);

        let item = ctx.store.get_item("item-1").await.unwrap();
        assert_eq!(item.stages.triage, StageStatus::Completed);
        assert_eq!(item.stages.lexicon, StageStatus::Pending);
        assert!(!item.quarantined);
    }

    #[tokio::test]
    async fn low_confidence_inference_quarantines_item_but_still_saves_rights() {
        let ctx = ctx_with_one_pending_item(0.2).await;
        let metrics = RightsProvenanceStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["items_completed"], 0.0);
        assert_eq!(metrics["items_quarantined"], 1.0);

        let item = ctx.store.get_item("item-1").await.unwrap();
        assert!(item.quarantined);
        assert_eq!(item.stages.triage, StageStatus::Quarantined);
        let rights = ctx.store.get_rights(&item.rights_id.unwrap()).await.unwrap();
        assert!(!rights.publishable);
    }

    #[tokio::test]
    async fn test_rights_override_applies_only_to_synthetic_batches() {
        let mut ctx = ctx_with_one_pending_item(0.0).await;
        let mut batch = ctx.store.get_batch("1").await.unwrap();
        batch.source_descriptor = "synthetic".to_string();
        ctx.store.save_batch(&batch).await.unwrap();
        ctx.config = std::sync::Arc::new(crate::config::OrchestrationConfig {
            test_rights_override: true,
            ..crate::config::OrchestrationConfig::default()
        });

        let metrics = RightsProvenanceStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["items_completed"], 1.0);
    }
}
