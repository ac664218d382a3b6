//! `StageJob`: the per-stage unit of work, adapted from the teacher's
//! `StageHandler` trait (`pipeline.rs`). Where the teacher's handler took a
//! file-list `StageInput` and returned serialized cache bytes, a stage job
//! here reads/writes the relational store and graph store directly and
//! returns a metrics map that the runner folds into `PipelineRun.stage_metrics`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use enliterator_graph::GraphStore;
use enliterator_storage::{EnliteratorStore, Stage};

use crate::config::OrchestrationConfig;
use crate::external::ExternalServices;
use crate::error::Result;

/// Shared handles every stage job executes against.
#[derive(Clone)]
pub struct StageJobContext {
    pub batch_id: String,
    pub store: Arc<dyn EnliteratorStore>,
    pub graph: Arc<dyn GraphStore>,
    pub external: Arc<ExternalServices>,
    pub config: Arc<OrchestrationConfig>,
}

/// Metrics produced by one stage run, folded verbatim into
/// `PipelineRun.stage_metrics[stage]` (§4.1).
pub type StageMetrics = BTreeMap<String, f64>;

#[async_trait]
pub trait StageJob: Send + Sync {
    fn stage(&self) -> Stage;

    /// Run this stage to completion against `ctx`, returning the metrics
    /// to record. Errors must already be classified via
    /// `OrchestratorError::stage_failed`/the `From` impls on
    /// `OrchestratorError` so the runner can decide retry eligibility
    /// from `error.category()`.
    async fn execute(&self, ctx: &StageJobContext) -> Result<StageMetrics>;
}
