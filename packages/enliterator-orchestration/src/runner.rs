//! `PipelineRunner`: sequential stage scheduling over the nine fixed
//! stages (§4.1, §5), adapted from the teacher's `Orchestrator::run_dag`.
//! Where the teacher scheduled a `PipelineDAG` of parallel phases, this
//! pipeline is strictly sequential, so the runner just walks
//! `STAGE_ORDER`; where it kept the teacher's per-job advisory lock
//! (`DashMap<JobId, Mutex<()>>`), the lock here is keyed by run id and
//! held only around a single stage attempt, released across suspension
//! points the way §5 requires.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use enliterator_graph::GraphStore;
use enliterator_storage::{EnliteratorStore, Stage};
use tokio::sync::Mutex;

use crate::checkpoint::load_or_create_run;
use crate::config::OrchestrationConfig;
use crate::error::{OrchestratorError, Result};
use crate::external::ExternalServices;
use crate::pipeline_run::{PipelineRunStateMachine, TransitionOutcome};
use crate::stage_job::{StageJob, StageJobContext};
use crate::stages::{
    DeliverablesStage, EmbeddingsStage, FineTuneDatasetStage, GraphAssemblyStage, IntakeStage,
    LexiconBootstrapStage, LiteracyScoringStage, PoolExtractionStage, RightsProvenanceStage,
};

/// What one `run_to_completion_or_pause` call actually did, so a caller
/// (CLI, scheduler, test) can decide whether to re-invoke immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Paused,
    AwaitingRetry,
    Failed,
}

pub struct PipelineRunner {
    store: Arc<dyn EnliteratorStore>,
    graph: Arc<dyn GraphStore>,
    external: Arc<ExternalServices>,
    config: Arc<OrchestrationConfig>,
    stages: BTreeMap<Stage, Arc<dyn StageJob>>,
    /// Advisory lock per run id, guarding one run from being driven by two
    /// callers concurrently (§5 "Per-run locks (advisory)").
    run_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PipelineRunner {
    pub fn new(
        store: Arc<dyn EnliteratorStore>,
        graph: Arc<dyn GraphStore>,
        external: Arc<ExternalServices>,
        config: Arc<OrchestrationConfig>,
    ) -> Self {
        let mut runner = Self {
            store,
            graph,
            external,
            config,
            stages: BTreeMap::new(),
            run_locks: DashMap::new(),
        };
        runner.register(Arc::new(IntakeStage));
        runner.register(Arc::new(RightsProvenanceStage));
        runner.register(Arc::new(LexiconBootstrapStage));
        runner.register(Arc::new(PoolExtractionStage));
        runner.register(Arc::new(GraphAssemblyStage));
        runner.register(Arc::new(EmbeddingsStage));
        runner.register(Arc::new(LiteracyScoringStage));
        runner.register(Arc::new(DeliverablesStage));
        runner.register(Arc::new(FineTuneDatasetStage));
        runner
    }

    pub fn register(&mut self, job: Arc<dyn StageJob>) {
        self.stages.insert(job.stage(), job);
    }

    fn lock_for(&self, run_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.run_locks
                .entry(run_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Drive `run_id` (creating it against `batch_id` if it does not yet
    /// exist) forward one stage at a time until the run completes, pauses,
    /// fails permanently, or a transient failure schedules a future retry
    /// (§4.1 "Ordering & concurrency guarantees": stages execute strictly
    /// in `STAGE_ORDER`, never concurrently, for a single run).
    pub async fn run_to_completion_or_pause(&self, run_id: &str, batch_id: &str) -> Result<RunOutcome> {
        let lock = self.lock_for(run_id);
        let _guard = lock.lock().await;

        let mut run = load_or_create_run(&self.store, run_id, batch_id).await?;
        let mut sm = PipelineRunStateMachine::new(run.clone());
        sm.start()?;
        self.persist(&sm, run.current_stage).await?;
        run = sm.into_run();

        loop {
            if run.state == enliterator_storage::RunState::Paused {
                return Ok(RunOutcome::Paused);
            }
            if run.state.is_terminal() {
                return Ok(if run.state == enliterator_storage::RunState::Completed {
                    RunOutcome::Completed
                } else {
                    RunOutcome::Failed
                });
            }

            let stage = run.current_stage;
            let job = self
                .stages
                .get(&stage)
                .ok_or_else(|| OrchestratorError::StageNotFound(stage.as_str().to_string()))?
                .clone();

            let ctx = StageJobContext {
                batch_id: batch_id.to_string(),
                store: Arc::clone(&self.store),
                graph: Arc::clone(&self.graph),
                external: Arc::clone(&self.external),
                config: Arc::clone(&self.config),
            };

            let expected_stage = run.current_stage;
            let mut sm = PipelineRunStateMachine::new(run);

            match job.execute(&ctx).await {
                Ok(metrics) => {
                    sm.advance(metrics)?;
                }
                Err(e) => {
                    let category = e.category();
                    sm.fail(
                        category,
                        e.to_string(),
                        self.config.max_retries,
                        self.config.retry_backoff_initial_secs(),
                        self.config.retry_backoff_cap_secs(),
                    )?;
                    let next = sm.into_run();
                    self.persist(&PipelineRunStateMachine::new(next.clone()), expected_stage)
                        .await?;
                    return Ok(if next.state == enliterator_storage::RunState::Running {
                        RunOutcome::AwaitingRetry
                    } else {
                        RunOutcome::Failed
                    });
                }
            }

            run = sm.into_run();
            self.persist(&PipelineRunStateMachine::new(run.clone()), expected_stage)
                .await?;
        }
    }

    pub async fn pause(&self, run_id: &str) -> Result<TransitionOutcome> {
        self.transition(run_id, |sm| sm.pause()).await
    }

    pub async fn resume(&self, run_id: &str) -> Result<TransitionOutcome> {
        self.transition(run_id, |sm| sm.resume()).await
    }

    pub async fn skip_current_stage(&self, run_id: &str) -> Result<TransitionOutcome> {
        self.transition(run_id, |sm| sm.skip_stage()).await
    }

    pub async fn reset_to_stage(&self, run_id: &str, stage: Stage) -> Result<TransitionOutcome> {
        self.transition(run_id, |sm| sm.reset_to_stage(stage)).await
    }

    async fn transition(
        &self,
        run_id: &str,
        f: impl FnOnce(&mut PipelineRunStateMachine) -> Result<TransitionOutcome>,
    ) -> Result<TransitionOutcome> {
        let lock = self.lock_for(run_id);
        let _guard = lock.lock().await;

        let run = self.store.get_pipeline_run(run_id).await?;
        let expected_stage = run.current_stage;
        let mut sm = PipelineRunStateMachine::new(run);
        let outcome = f(&mut sm)?;
        if outcome == TransitionOutcome::Applied {
            self.persist(&sm, expected_stage).await?;
        }
        Ok(outcome)
    }

    async fn persist(&self, sm: &PipelineRunStateMachine, expected_current_stage: Stage) -> Result<()> {
        self.store
            .update_pipeline_run(sm.run(), expected_current_stage)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use enliterator_storage::{IngestBatch, RunState, SqliteStore};

    use super::*;
    use crate::test_support::{default_external_services, FakeGraphStore};

    fn runner() -> PipelineRunner {
        let store: Arc<dyn EnliteratorStore> = Arc::new(SqliteStore::new_in_memory().unwrap());
        let graph: Arc<dyn GraphStore> = Arc::new(FakeGraphStore::default());
        PipelineRunner::new(
            store,
            graph,
            Arc::new(default_external_services()),
            Arc::new(OrchestrationConfig::default()),
        )
    }

    #[tokio::test]
    async fn an_empty_batch_runs_through_every_stage_to_completion() {
        let runner = runner();
        runner
            .store
            .save_batch(&IngestBatch::new("1", "upload"))
            .await
            .unwrap();

        let outcome = runner.run_to_completion_or_pause("run-1", "1").await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed);

        let run = runner.store.get_pipeline_run("run-1").await.unwrap();
        assert_eq!(run.state, RunState::Completed);
        assert_eq!(run.current_stage, Stage::FineTuneDatasetBuild);
    }

    #[tokio::test]
    async fn pause_stops_the_next_run_call_without_advancing() {
        let runner = runner();
        runner
            .store
            .save_batch(&IngestBatch::new("1", "upload"))
            .await
            .unwrap();
        runner.run_to_completion_or_pause("run-1", "1").await.unwrap();

        // Rewind so there's a stage left to run, then pause before re-entering.
        runner.reset_to_stage("run-1", Stage::Intake).await.unwrap();
        runner.pause("run-1").await.unwrap();

        let outcome = runner.run_to_completion_or_pause("run-1", "1").await.unwrap();
        assert_eq!(outcome, RunOutcome::Paused);
    }
}
