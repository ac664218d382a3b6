//! Stage 1 — Intake (§4.3): one `IngestItem` per discovered document,
//! deduplicated by content hash within the batch.

use async_trait::async_trait;
use enliterator_storage::{IngestItem, Stage};

use crate::error::{ErrorCategory, OrchestratorError, Result};
use crate::stage_job::{StageJob, StageJobContext, StageMetrics};

pub struct IntakeStage;

#[async_trait]
impl StageJob for IntakeStage {
    fn stage(&self) -> Stage {
        Stage::Intake
    }

    async fn execute(&self, ctx: &StageJobContext) -> Result<StageMetrics> {
        let documents = ctx.external.intake.discover(&ctx.batch_id).await.map_err(|e| {
            OrchestratorError::stage_failed(
                "intake",
                ErrorCategory::ExternalTransient,
                e.to_string(),
            )
        })?;

        let mut created = 0u64;
        let mut deduped = 0u64;

        for doc in documents {
            let hash = IngestItem::hash(&doc.content);
            if ctx.store.find_item_by_hash(&ctx.batch_id, &hash).await?.is_some() {
                deduped += 1;
                continue;
            }
            let item = IngestItem::from_content(
                uuid::Uuid::new_v4().to_string(),
                ctx.batch_id.clone(),
                doc.mime_type,
                doc.content,
            );
            ctx.store.save_item(&item).await?;
            created += 1;
        }

        let mut metrics = StageMetrics::new();
        metrics.insert("items_created".to_string(), created as f64);
        metrics.insert("items_deduped".to_string(), deduped as f64);
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::RawDocument;
    use crate::test_support::*;

    fn ctx(documents: Vec<RawDocument>) -> StageJobContext {
        test_context(
            "1",
            crate::external::ExternalServices {
                intake: Box::new(FakeIntakeSource { documents }),
                ..default_external_services()
            },
        )
    }

    #[tokio::test]
    async fn creates_one_item_per_distinct_document() {
        let ctx = ctx(vec![
            RawDocument { mime_type: "text/plain".to_string(), content: "alpha".to_string() },
            RawDocument { mime_type: "text/plain".to_string(), content: "beta".to_string() },
        ]);
        let metrics = IntakeStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["items_created"], 2.0);
        assert_eq!(metrics["items_deduped"], 0.0);
    }

    #[tokio::test]
    async fn dedupes_identical_content_within_a_batch() {
        let ctx = ctx(vec![
            RawDocument { mime_type: "text/plain".to_string(), content: "same".to_string() },
            RawDocument { mime_type: "text/plain".to_string(), content: "same".to_string() },
        ]);
        let metrics = IntakeStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["items_created"], 1.0);
        assert_eq!(metrics["items_deduped"], 1.0);
    }
}
