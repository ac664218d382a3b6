//! Stage 7 — Literacy Scoring: not detailed beyond its name in the
//! distilled spec. Grounded on the only concrete anchors available —
//! `IngestBatch.literacy_score`, and M6's "`literacy_score >= 70`"
//! threshold — this computes a single weighted score from the same
//! coverage metrics §4.6 already defines, so scoring and maturity
//! assessment never disagree about what "good coverage" means.

use async_trait::async_trait;
use enliterator_graph::DatabaseProvisioner;
use enliterator_storage::Stage;

use crate::error::Result;
use crate::external::DATABASE_POLL_DEADLINE;
use crate::maturity::CoverageAnalyzer;
use crate::stage_job::{StageJob, StageJobContext, StageMetrics};

pub struct LiteracyScoringStage;

/// Weights chosen so that structural completeness (idea coverage, path
/// completeness) dominates the score, with orphan share and imbalance as
/// penalties. Not spec-given; documented in DESIGN.md.
const W_IDEA_COVERAGE: f64 = 0.30;
const W_PATH_COMPLETENESS: f64 = 0.25;
const W_TEMPORAL_COVERAGE: f64 = 0.15;
const W_SPATIAL_COVERAGE: f64 = 0.10;
const W_ORPHAN_PENALTY: f64 = 0.10;
const W_BALANCE_PENALTY: f64 = 0.10;

#[async_trait]
impl StageJob for LiteracyScoringStage {
    fn stage(&self) -> Stage {
        Stage::LiteracyScoring
    }

    async fn execute(&self, ctx: &StageJobContext) -> Result<StageMetrics> {
        let outcome = DatabaseProvisioner::new()
            .provision(ctx.graph.as_ref(), &ctx.batch_id, DATABASE_POLL_DEADLINE)
            .await?;
        let coverage = CoverageAnalyzer::compute(&ctx.graph, &outcome.database_name).await?;

        let balance_penalty = (coverage.pool_distribution_cv * 100.0).min(100.0);
        let raw = W_IDEA_COVERAGE * coverage.idea_coverage_pct
            + W_PATH_COMPLETENESS * coverage.path_completeness_pct
            + W_TEMPORAL_COVERAGE * coverage.temporal_coverage_pct
            + W_SPATIAL_COVERAGE * coverage.spatial_coverage_pct
            - W_ORPHAN_PENALTY * coverage.orphan_share_pct
            - W_BALANCE_PENALTY * balance_penalty;
        let literacy_score = raw.clamp(0.0, 100.0);

        let mut batch = ctx.store.get_batch(&ctx.batch_id).await?;
        batch.literacy_score = Some(literacy_score);
        batch.updated_at = chrono::Utc::now();
        ctx.store.save_batch(&batch).await?;

        let mut metrics = StageMetrics::new();
        metrics.insert("literacy_score".to_string(), literacy_score);
        metrics.insert("idea_coverage_pct".to_string(), coverage.idea_coverage_pct);
        metrics.insert("average_node_degree".to_string(), coverage.average_node_degree);
        metrics.insert("orphan_share_pct".to_string(), coverage.orphan_share_pct);
        metrics.insert("path_completeness_pct".to_string(), coverage.path_completeness_pct);
        metrics.insert("temporal_coverage_pct".to_string(), coverage.temporal_coverage_pct);
        metrics.insert("spatial_coverage_pct".to_string(), coverage.spatial_coverage_pct);
        metrics.insert("pool_distribution_cv".to_string(), coverage.pool_distribution_cv);
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use enliterator_storage::IngestBatch;

    use super::*;
    use crate::test_support::*;

    #[tokio::test]
    async fn scores_an_empty_graph_at_the_floor_and_saves_it_on_the_batch() {
        let ctx = test_context("1", default_external_services());
        ctx.store.save_batch(&IngestBatch::new("1", "upload")).await.unwrap();

        let metrics = LiteracyScoringStage.execute(&ctx).await.unwrap();
        let batch = ctx.store.get_batch("1").await.unwrap();
        assert_eq!(batch.literacy_score, Some(metrics["literacy_score"]));
        assert!(metrics["literacy_score"] >= 0.0 && metrics["literacy_score"] <= 100.0);
    }
}
