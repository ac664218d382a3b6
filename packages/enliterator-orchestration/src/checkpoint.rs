//! Crash-resume support.
//!
//! The teacher cached per-stage binary blobs (`Checkpoint`/`CheckpointManager`)
//! because its stages produced ephemeral IR that was expensive to
//! regenerate. Here every stage writes its output directly to the
//! relational store (items, pool entities, relations, rights) as it goes,
//! so the store itself is the checkpoint: resuming a crashed run only
//! needs the persisted `PipelineRun.current_stage` plus the per-item
//! `stage_statuses` already tracked on `IngestItem` (§4.1 failure
//! semantics). This module is the thin lookup that replaces the teacher's
//! cache.

use std::sync::Arc;

use enliterator_storage::{EnliteratorStore, PipelineRun};

use crate::error::Result;

/// Load the pipeline run for a batch if one exists, or create and persist
/// a fresh one. Used by the runner at startup so re-invoking it against an
/// already-running batch resumes rather than restarts.
pub async fn load_or_create_run(
    store: &Arc<dyn EnliteratorStore>,
    run_id: &str,
    batch_id: &str,
) -> Result<PipelineRun> {
    match store.get_pipeline_run(run_id).await {
        Ok(run) => Ok(run),
        Err(e) if e.kind == enliterator_storage::ErrorKind::RunNotFound => {
            let run = PipelineRun::new(run_id, batch_id);
            store.save_pipeline_run(&run).await?;
            Ok(run)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enliterator_storage::SqliteStore;

    #[tokio::test]
    async fn creates_run_when_absent_then_resumes_same_run() {
        let store: Arc<dyn EnliteratorStore> = Arc::new(SqliteStore::new_in_memory().unwrap());
        let first = load_or_create_run(&store, "run-1", "batch-1").await.unwrap();
        let second = load_or_create_run(&store, "run-1", "batch-1").await.unwrap();
        assert_eq!(first.id, second.id);
    }
}
