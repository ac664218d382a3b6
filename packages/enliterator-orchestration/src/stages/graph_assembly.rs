//! Stage 5 — Graph Assembly (§4.4): the seven ordered phases, wired
//! end-to-end against a batch's dedicated graph database. Each phase is
//! already its own transaction boundary inside `enliterator_graph`; this
//! stage job only sequences them and folds their reports into metrics.

use std::collections::BTreeMap;

use async_trait::async_trait;
use enliterator_graph::{
    DatabaseProvisioner, Deduplicator, EdgeLoader, IntegrityVerifier, NodeLoader, OrphanRemover,
    SchemaManager,
};
use enliterator_storage::{PoolKind, ProvenanceAndRights, Stage};

use crate::error::{ErrorCategory, OrchestratorError, Result};
use crate::external::DATABASE_POLL_DEADLINE;
use crate::stage_job::{StageJob, StageJobContext, StageMetrics};

pub struct GraphAssemblyStage;

/// Labels Deduplication runs against, per the dedup-key rules in §4.4.5.
const DEDUP_LABELS: &[&str] = &["Idea", "Manifest", "Experience", "Lexicon", "Spatial"];

#[async_trait]
impl StageJob for GraphAssemblyStage {
    fn stage(&self) -> Stage {
        Stage::GraphAssembly
    }

    async fn execute(&self, ctx: &StageJobContext) -> Result<StageMetrics> {
        let mut metrics = StageMetrics::new();

        // Phase 1 — Database Provisioning.
        let outcome = DatabaseProvisioner::new()
            .provision(ctx.graph.as_ref(), &ctx.batch_id, DATABASE_POLL_DEADLINE)
            .await?;
        metrics.insert(
            "multi_database_supported".to_string(),
            if outcome.multi_database_supported { 1.0 } else { 0.0 },
        );
        let database = outcome.database_name;

        // Phase 2 — Schema Provisioning (Transaction A), preceded by the
        // lexicon description backfill it depends on.
        let schema = SchemaManager::new();
        schema
            .backfill_lexicon_descriptions(ctx.store.as_ref(), &ctx.batch_id)
            .await?;
        schema.provision(ctx.graph.as_ref(), &database).await?;

        // Phase 3 — Node Loading (Transaction B).
        let entities = ctx.store.pool_entities_for_batch(&ctx.batch_id).await?;
        let mut rights_map: BTreeMap<String, ProvenanceAndRights> = BTreeMap::new();
        for entity in &entities {
            if !rights_map.contains_key(&entity.rights_id) {
                let rights = ctx.store.get_rights(&entity.rights_id).await?;
                rights_map.insert(entity.rights_id.clone(), rights);
            }
        }
        let node_metrics = NodeLoader::new()
            .load(ctx.graph.as_ref(), &database, &entities, &rights_map)
            .await?;

        // Phase 4 — Edge Loading, a fresh transaction never mixed with schema.
        let relations = ctx.store.relations_for_batch(&ctx.batch_id).await?;
        let edge_metrics = EdgeLoader::new()
            .load(ctx.graph.as_ref(), &database, &relations)
            .await?;

        // Phase 5 — Deduplication, its own transaction per label.
        let dedup = Deduplicator::new();
        let mut merges = 0u64;
        for label in DEDUP_LABELS {
            merges += dedup
                .deduplicate_label(ctx.graph.as_ref(), &database, label)
                .await? as u64;
        }

        // Phase 6 — Orphan Removal, iterative batches of 100.
        let orphan_report = OrphanRemover::new()
            .remove_orphans(
                ctx.graph.as_ref(),
                &database,
                std::time::Duration::from_millis(ctx.config.orphan_preserve_window_ms),
            )
            .await?;

        // Phase 7 — Integrity Verification, the closing check.
        let integrity = IntegrityVerifier::new().verify(ctx.graph.as_ref(), &database).await?;
        if !integrity.valid {
            return Err(OrchestratorError::stage_failed(
                "graph_assembly",
                ErrorCategory::IntegrityFailure,
                integrity.errors.join("; "),
            ));
        }

        metrics.insert("nodes_merged".to_string(), node_metrics.nodes_merged as f64);
        metrics.insert("edges_merged".to_string(), edge_metrics.edges_merged as f64);
        metrics.insert(
            "unknown_verbs_skipped".to_string(),
            edge_metrics.unknown_verbs_skipped as f64,
        );
        metrics.insert("nodes_deduplicated".to_string(), merges as f64);
        metrics.insert(
            "orphans_removed".to_string(),
            orphan_report.total_removed() as f64,
        );
        metrics.insert(
            "integrity_warnings".to_string(),
            integrity.warnings.len() as f64,
        );
        for pool in PoolKind::all() {
            if let Some(count) = integrity.summary.get(pool.label()) {
                metrics.insert(format!("nodes_{}", pool.label().to_lowercase()), *count as f64);
            }
        }

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use enliterator_storage::IngestBatch;

    use super::*;
    use crate::test_support::*;

    #[tokio::test]
    async fn runs_all_phases_against_an_empty_batch_without_integrity_errors() {
        let ctx = test_context("1", default_external_services());
        ctx.store.save_batch(&IngestBatch::new("1", "upload")).await.unwrap();

        let metrics = GraphAssemblyStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["nodes_merged"], 0.0);
        assert_eq!(metrics["edges_merged"], 0.0);
        assert_eq!(metrics["integrity_warnings"], 0.0);
    }
}
