//! Maturity & Coverage Analytics (§4.6, C10): batch maturity level,
//! coverage metrics, and weighted gap analysis used as acceptance gates.

use std::sync::Arc;

use enliterator_graph::{GraphStore, Statement};
use enliterator_storage::{EnliteratorStore, IngestBatch, ItemStageKind, StageStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaturityLevel {
    M0RawIntake,
    M1RightsAssigned,
    M2LexiconExtracted,
    M3EntitiesIdentified,
    M4GraphAssembled,
    M5EmbeddingsComplete,
    M6FullyLiterate,
}

/// Literacy score floor for `M6` (§4.6).
pub const LITERACY_SCORE_FOR_M6: f64 = 70.0;

/// Walk the monotone maturity ladder for `batch` against its relational
/// and graph state. Each level's condition is checked only once the
/// previous one holds, per the spec's "monotone" note.
pub async fn assess_batch(
    store: &Arc<dyn EnliteratorStore>,
    graph: &Arc<dyn GraphStore>,
    database: &str,
    batch: &IngestBatch,
) -> Result<MaturityLevel> {
    let mut level = MaturityLevel::M0RawIntake;

    let items = store
        .items_by_stage_status(
            &batch.id,
            ItemStageKind::Triage,
            &[
                StageStatus::Pending,
                StageStatus::InProgress,
                StageStatus::Completed,
                StageStatus::Failed,
                StageStatus::Quarantined,
            ],
        )
        .await?;
    let has_triaged = items
        .iter()
        .any(|i| i.stages.triage == StageStatus::Completed);
    let has_rights = items.iter().any(|i| i.rights_id.is_some());
    if !(has_rights && has_triaged) {
        return Ok(level);
    }
    level = MaturityLevel::M1RightsAssigned;

    if store.lexicon_for_batch(&batch.id).await?.is_empty() {
        return Ok(level);
    }
    level = MaturityLevel::M2LexiconExtracted;

    if store.pool_entities_for_batch(&batch.id).await?.is_empty() {
        return Ok(level);
    }
    level = MaturityLevel::M3EntitiesIdentified;

    let node_count = count(graph, database, "MATCH (n) RETURN count(n) AS count").await?;
    if node_count == 0 {
        return Ok(level);
    }
    level = MaturityLevel::M4GraphAssembled;

    let embedded_count = count(
        graph,
        database,
        "MATCH (n) WHERE n.embedding IS NOT NULL RETURN count(n) AS count",
    )
    .await?;
    if embedded_count == 0 {
        return Ok(level);
    }
    level = MaturityLevel::M5EmbeddingsComplete;

    if batch.literacy_score.unwrap_or(0.0) >= LITERACY_SCORE_FOR_M6 {
        level = MaturityLevel::M6FullyLiterate;
    }
    Ok(level)
}

async fn count(graph: &Arc<dyn GraphStore>, database: &str, cypher: &str) -> Result<u64> {
    let rows = graph.query(database, Statement::new(cypher)).await?;
    Ok(rows
        .first()
        .and_then(|r| r.get("count"))
        .and_then(Value::as_u64)
        .unwrap_or(0))
}

/// Coverage metrics (§4.6), all expressed as percentages in `[0, 100]`
/// except `average_node_degree`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    pub idea_coverage_pct: f64,
    pub average_node_degree: f64,
    pub orphan_share_pct: f64,
    pub path_completeness_pct: f64,
    pub temporal_coverage_pct: f64,
    pub spatial_coverage_pct: f64,
    /// Coefficient of variation of per-pool node counts; lower is more
    /// balanced.
    pub pool_distribution_cv: f64,
}

pub struct CoverageAnalyzer;

impl CoverageAnalyzer {
    pub async fn compute(graph: &Arc<dyn GraphStore>, database: &str) -> Result<CoverageMetrics> {
        let idea_count = count(graph, database, "MATCH (n:Idea) RETURN count(n) AS count").await?;
        let covered = count(
            graph,
            database,
            "MATCH (:Idea)-[]->(m) WHERE m:Manifest OR m:Experience RETURN count(DISTINCT m) AS count",
        )
        .await?;
        let total_content = count(
            graph,
            database,
            "MATCH (m) WHERE m:Manifest OR m:Experience RETURN count(m) AS count",
        )
        .await?;
        let idea_coverage_pct = pct(covered, total_content);

        let total_nodes = count(graph, database, "MATCH (n) RETURN count(n) AS count").await?;
        let total_edges = count(graph, database, "MATCH ()-[r]->() RETURN count(r) AS count").await?;
        let average_node_degree = if total_nodes == 0 {
            0.0
        } else {
            (2 * total_edges) as f64 / total_nodes as f64
        };

        let orphan_count = count(
            graph,
            database,
            "MATCH (n) WHERE NOT (n)--() RETURN count(n) AS count",
        )
        .await?;
        let orphan_share_pct = pct(orphan_count, total_nodes);

        let connected = count(
            graph,
            database,
            "MATCH p = (:Idea)-[*1..3]->(:Manifest) RETURN count(DISTINCT p) AS count",
        )
        .await?;
        let path_completeness_pct = pct(connected.min(idea_count), idea_count);

        let timed = count(
            graph,
            database,
            "MATCH (n) WHERE n.valid_time_start IS NOT NULL OR n.observed_at IS NOT NULL RETURN count(n) AS count",
        )
        .await?;
        let temporal_coverage_pct = pct(timed, total_nodes);

        let spatial_linked = count(
            graph,
            database,
            "MATCH (n)-[:LOCATED_AT]->(:Spatial) RETURN count(DISTINCT n) AS count",
        )
        .await?;
        let spatial_coverage_pct = pct(spatial_linked, total_nodes);

        let pool_distribution_cv = Self::pool_distribution_cv(graph, database).await?;

        Ok(CoverageMetrics {
            idea_coverage_pct,
            average_node_degree,
            orphan_share_pct,
            path_completeness_pct,
            temporal_coverage_pct,
            spatial_coverage_pct,
            pool_distribution_cv,
        })
    }

    async fn pool_distribution_cv(graph: &Arc<dyn GraphStore>, database: &str) -> Result<f64> {
        use enliterator_storage::PoolKind;
        let mut counts = Vec::new();
        for pool in PoolKind::all() {
            let n = count(
                graph,
                database,
                &format!("MATCH (n:{}) RETURN count(n) AS count", pool.label()),
            )
            .await?;
            counts.push(n as f64);
        }
        Ok(coefficient_of_variation(&counts))
    }
}

fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / mean
}

/// Gap kinds, each weighted per §4.6's fixed prioritization weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    Orphaned,
    MissingCanonicals,
    AmbiguousRights,
    SparseRelationships,
    TemporalGaps,
    MissingEmbeddings,
}

impl GapKind {
    pub fn weight(&self) -> f64 {
        match self {
            GapKind::Orphaned => 0.30,
            GapKind::MissingCanonicals => 0.25,
            GapKind::AmbiguousRights => 0.20,
            GapKind::SparseRelationships => 0.15,
            GapKind::TemporalGaps => 0.10,
            GapKind::MissingEmbeddings => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

/// Severity as a function of `count / total`: empirically-chosen bands
/// (no spec-given thresholds), kept monotone and documented in DESIGN.md.
fn severity_for(count: u64, total: u64) -> Severity {
    if count == 0 || total == 0 {
        return Severity::Minimal;
    }
    let fraction = count as f64 / total as f64;
    if fraction < 0.05 {
        Severity::Low
    } else if fraction < 0.15 {
        Severity::Medium
    } else if fraction < 0.30 {
        Severity::High
    } else {
        Severity::Critical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub kind: GapKind,
    pub count: u64,
    pub severity: Severity,
    pub weight: f64,
}

pub struct GapAnalyzer;

impl GapAnalyzer {
    pub async fn analyze(graph: &Arc<dyn GraphStore>, database: &str) -> Result<Vec<Gap>> {
        let total_nodes = count(graph, database, "MATCH (n) RETURN count(n) AS count").await?;

        let orphaned = count(
            graph,
            database,
            "MATCH (n) WHERE NOT (n)--() RETURN count(n) AS count",
        )
        .await?;
        let missing_canonicals = count(
            graph,
            database,
            "MATCH (n:Lexicon) WHERE n.canonical_term IS NULL OR n.canonical_term = '' RETURN count(n) AS count",
        )
        .await?;
        let ambiguous_rights = count(
            graph,
            database,
            "MATCH (n:ProvenanceAndRights) WHERE n.confidence < 0.7 OR n.license = 'unknown' RETURN count(n) AS count",
        )
        .await?;
        let sparse = count(
            graph,
            database,
            "MATCH (n) WHERE size([(n)--() | 1]) = 1 RETURN count(n) AS count",
        )
        .await?;
        let temporal_gaps = count(
            graph,
            database,
            "MATCH (n) WHERE n.valid_time_start IS NULL AND n.observed_at IS NULL RETURN count(n) AS count",
        )
        .await?;
        let missing_embeddings = count(
            graph,
            database,
            "MATCH (n) WHERE n.embedding IS NULL RETURN count(n) AS count",
        )
        .await?;

        let gaps = vec![
            (GapKind::Orphaned, orphaned),
            (GapKind::MissingCanonicals, missing_canonicals),
            (GapKind::AmbiguousRights, ambiguous_rights),
            (GapKind::SparseRelationships, sparse),
            (GapKind::TemporalGaps, temporal_gaps),
            (GapKind::MissingEmbeddings, missing_embeddings),
        ]
        .into_iter()
        .map(|(kind, n)| Gap {
            kind,
            count: n,
            severity: severity_for(n, total_nodes),
            weight: kind.weight(),
        })
        .collect();
        Ok(prioritize(gaps))
    }
}

/// Sort gaps by weight descending, then severity descending: the fixed
/// §4.6 priority weights break ties within a severity band, but a more
/// severe lower-weight gap still outranks a minimal higher-weight one.
pub fn prioritize(mut gaps: Vec<Gap>) -> Vec<Gap> {
    gaps.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.weight.partial_cmp(&a.weight).unwrap())
    });
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficient_of_variation_is_zero_for_uniform_counts() {
        assert_eq!(coefficient_of_variation(&[4.0, 4.0, 4.0]), 0.0);
    }

    #[test]
    fn severity_bands_are_monotone_in_fraction() {
        assert_eq!(severity_for(0, 100), Severity::Minimal);
        assert_eq!(severity_for(2, 100), Severity::Low);
        assert_eq!(severity_for(10, 100), Severity::Medium);
        assert_eq!(severity_for(20, 100), Severity::High);
        assert_eq!(severity_for(50, 100), Severity::Critical);
    }

    #[test]
    fn prioritize_puts_most_severe_first() {
        let gaps = vec![
            Gap { kind: GapKind::TemporalGaps, count: 50, severity: Severity::Critical, weight: 0.10 },
            Gap { kind: GapKind::Orphaned, count: 1, severity: Severity::Low, weight: 0.30 },
        ];
        let sorted = prioritize(gaps);
        assert_eq!(sorted[0].kind, GapKind::TemporalGaps);
    }

    #[test]
    fn maturity_levels_are_ordered() {
        assert!(MaturityLevel::M0RawIntake < MaturityLevel::M1RightsAssigned);
        assert!(MaturityLevel::M5EmbeddingsComplete < MaturityLevel::M6FullyLiterate);
    }
}
