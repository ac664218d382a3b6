//! Orphan Removal (§4.4.6): delete disconnected nodes from the
//! connectivity-required pools, preserving recently-written ones.

use std::time::Duration;

use enliterator_storage::PoolKind;
use serde_json::Value;

use crate::error::Result;
use crate::store::{GraphStore, Statement};

/// Default orphan preservation window (§6 configuration surface,
/// `orphan_preserve_window_ms`).
pub const DEFAULT_PRESERVE_WINDOW: Duration = Duration::from_millis(3_600_000);

const BATCH_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanRemovalReport {
    pub removed_by_label: Vec<(String, u64)>,
}

impl OrphanRemovalReport {
    pub fn total_removed(&self) -> u64 {
        self.removed_by_label.iter().map(|(_, n)| n).sum()
    }
}

pub struct OrphanRemover;

impl OrphanRemover {
    pub fn new() -> Self {
        Self
    }

    /// Run iteratively in batches of 100 (§4.4.6) against every
    /// connectivity-required label until no candidates remain.
    pub async fn remove_orphans(
        &self,
        graph: &dyn GraphStore,
        database: &str,
        preserve_window: Duration,
    ) -> Result<OrphanRemovalReport> {
        let mut report = OrphanRemovalReport::default();
        let cutoff_ms = preserve_window.as_millis() as i64;

        for pool in PoolKind::all().iter().filter(|p| p.requires_connectivity()) {
            let label = pool.label();
            let mut total_for_label = 0u64;
            loop {
                let rows = graph
                    .query(
                        database,
                        Statement::new(format!(
                            "MATCH (n:{label}) \
                             WHERE NOT (n)--() OR all(r IN [(n)--() | type(r)] WHERE r = 'HAS_RIGHTS') \
                             AND duration.between(datetime(n.created_at), datetime()).milliseconds > $cutoff \
                             RETURN n.id AS id LIMIT {BATCH_SIZE}"
                        ))
                        .with_param("cutoff", cutoff_ms),
                    )
                    .await?;

                if rows.is_empty() {
                    break;
                }

                let ids: Vec<Value> = rows
                    .iter()
                    .filter_map(|r| r.get("id").cloned())
                    .collect();
                let removed = ids.len() as u64;

                graph
                    .run_transaction(
                        database,
                        vec![Statement::new(format!(
                            "MATCH (n:{label}) WHERE n.id IN $ids DETACH DELETE n"
                        ))
                        .with_param("ids", Value::Array(ids))],
                    )
                    .await?;

                total_for_label += removed;
                if removed < BATCH_SIZE as u64 {
                    break;
                }
            }
            if total_for_label > 0 {
                report.removed_by_label.push((label.to_string(), total_for_label));
            }
        }

        Ok(report)
    }
}

impl Default for OrphanRemover {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_totals_sum_across_labels() {
        let report = OrphanRemovalReport {
            removed_by_label: vec![("Idea".to_string(), 3), ("Manifest".to_string(), 2)],
        };
        assert_eq!(report.total_removed(), 5);
    }
}
