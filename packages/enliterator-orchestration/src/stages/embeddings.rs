//! Stage 6 — Embeddings (§4.5): encode every trainable pool entity's
//! representative text and persist the vector on its graph node.

use async_trait::async_trait;
use enliterator_graph::{DatabaseProvisioner, Statement};
use enliterator_storage::Stage;

use crate::error::Result;
use crate::external::DATABASE_POLL_DEADLINE;
use crate::stage_job::{StageJob, StageJobContext, StageMetrics};

pub struct EmbeddingsStage;

#[async_trait]
impl StageJob for EmbeddingsStage {
    fn stage(&self) -> Stage {
        Stage::Embeddings
    }

    async fn execute(&self, ctx: &StageJobContext) -> Result<StageMetrics> {
        // Re-provisioning is idempotent (`create_database` is an
        // `IF NOT EXISTS`); this is how the stage recovers the same
        // database name Graph Assembly resolved, including the
        // multi-database-unsupported fallback to `"default"`.
        let outcome = DatabaseProvisioner::new()
            .provision(ctx.graph.as_ref(), &ctx.batch_id, DATABASE_POLL_DEADLINE)
            .await?;
        let database = outcome.database_name;
        let entities = ctx.store.pool_entities_for_batch(&ctx.batch_id).await?;

        let mut created = 0u64;
        let mut fallback_used = 0u64;
        let mut indexed_labels = std::collections::BTreeSet::new();

        for entity in entities {
            let rights = ctx.store.get_rights(&entity.rights_id).await?;
            if !rights.trainable {
                continue;
            }

            let vector = match ctx.external.embedding.encode(&entity.repr_text).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(entity_id = %entity.id, error = %e, "embedding encode failed, skipping");
                    fallback_used += 1;
                    continue;
                }
            };

            let vector_value =
                serde_json::Value::Array(vector.iter().map(|f| serde_json::json!(f)).collect());

            let label = entity.kind().label();
            if indexed_labels.insert(label) {
                ctx.graph
                    .run_transaction(
                        &database,
                        vec![Statement::new(format!(
                            "CREATE VECTOR INDEX {label}_embedding_idx IF NOT EXISTS \
                             FOR (n:{label}) ON (n.embedding) \
                             OPTIONS {{indexConfig: {{`vector.dimensions`: {}, `vector.similarity_function`: 'cosine'}}}}",
                            ctx.external.embedding.dims()
                        ))],
                    )
                    .await?;
            }

            ctx.graph
                .run_transaction(
                    &database,
                    vec![Statement::new(format!(
                        "MATCH (n:{label} {{id: $id}}) SET n.embedding = $vector, n.embedding_model = $model"
                    ))
                    .with_param("id", entity.id.clone())
                    .with_param("vector", vector_value)
                    .with_param("model", ctx.external.embedding.model().to_string())],
                )
                .await?;
            created += 1;
        }

        let mut metrics = StageMetrics::new();
        metrics.insert("embeddings_created".to_string(), created as f64);
        metrics.insert("embeddings_fallback_used".to_string(), fallback_used as f64);
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use enliterator_storage::{IngestBatch, PoolEntity, PoolFields, ProvenanceAndRights};

    use super::*;
    use crate::test_support::*;

    async fn ctx_with_entity(trainable: bool) -> StageJobContext {
        let ctx = test_context("1", default_external_services());
        ctx.store.save_batch(&IngestBatch::new("1", "upload")).await.unwrap();

        let rights = if trainable {
            ProvenanceAndRights::test_override("r1")
        } else {
            ProvenanceAndRights::quarantined("r1", 0.1, "upload", "rights-model-v1")
        };
        ctx.store.save_rights(&rights).await.unwrap();

        let entity = PoolEntity {
            id: "e1".to_string(),
            batch_id: "1".to_string(),
            repr_text: "an idea".to_string(),
            rights_id: "r1".to_string(),
            source_item_id: "item-1".to_string(),
            valid_time_start: Some(Utc::now()),
            valid_time_end: None,
            observed_at: None,
            fields: PoolFields::Idea { label: "sustainability".to_string() },
        };
        ctx.store.save_pool_entity(&entity).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn embeds_trainable_entities() {
        let ctx = ctx_with_entity(true).await;
        let metrics = EmbeddingsStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["embeddings_created"], 1.0);
        assert_eq!(metrics["embeddings_fallback_used"], 0.0);
    }

    #[tokio::test]
    async fn skips_non_trainable_entities() {
        let ctx = ctx_with_entity(false).await;
        let metrics = EmbeddingsStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["embeddings_created"], 0.0);
    }
}
