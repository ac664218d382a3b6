//! `PipelineRun` data model.
//!
//! The transition logic that drives a run through its stages lives in
//! `enliterator-orchestration::pipeline_run::PipelineRunStateMachine`; this
//! module only defines the persisted shape, so that the storage crate does
//! not need to depend on the orchestration crate's error types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The nine ordered pipeline stages plus the implicit Frame stage (0),
/// fixed per `SPEC_FULL.md` §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Frame,
    Intake,
    RightsProvenance,
    LexiconBootstrap,
    PoolExtraction,
    GraphAssembly,
    Embeddings,
    LiteracyScoring,
    Deliverables,
    FineTuneDatasetBuild,
}

pub const STAGE_ORDER: [Stage; 10] = [
    Stage::Frame,
    Stage::Intake,
    Stage::RightsProvenance,
    Stage::LexiconBootstrap,
    Stage::PoolExtraction,
    Stage::GraphAssembly,
    Stage::Embeddings,
    Stage::LiteracyScoring,
    Stage::Deliverables,
    Stage::FineTuneDatasetBuild,
];

impl Stage {
    pub fn index(&self) -> u8 {
        STAGE_ORDER.iter().position(|s| s == self).unwrap() as u8
    }

    pub fn from_index(index: u8) -> Option<Stage> {
        STAGE_ORDER.get(index as usize).copied()
    }

    /// The stage that follows this one, or `None` if this is the last
    /// stage (`FineTuneDatasetBuild`).
    pub fn next(&self) -> Option<Stage> {
        Stage::from_index(self.index() + 1)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Frame => "frame",
            Stage::Intake => "intake",
            Stage::RightsProvenance => "rights_provenance",
            Stage::LexiconBootstrap => "lexicon_bootstrap",
            Stage::PoolExtraction => "pool_extraction",
            Stage::GraphAssembly => "graph_assembly",
            Stage::Embeddings => "embeddings",
            Stage::LiteracyScoring => "literacy_scoring",
            Stage::Deliverables => "deliverables",
            Stage::FineTuneDatasetBuild => "fine_tune_dataset_build",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a single stage for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Overall run state, per `SPEC_FULL.md` §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Initialized,
    Running,
    Paused,
    Failed,
    Completed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed)
    }
}

/// A pipeline run over a single [`IngestBatch`](super::batch::IngestBatch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub batch_id: String,
    pub current_stage: Stage,
    pub state: RunState,
    pub retry_count: u32,
    pub stage_statuses: BTreeMap<Stage, StageOutcome>,
    pub stage_metrics: BTreeMap<Stage, BTreeMap<String, f64>>,
    pub error_message: Option<String>,
    /// Earliest time a retry of `current_stage` may be attempted, set by
    /// `fail()` when the error is retriable.
    pub next_retry_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new(id: impl Into<String>, batch_id: impl Into<String>) -> Self {
        let mut stage_statuses = BTreeMap::new();
        for stage in STAGE_ORDER {
            stage_statuses.insert(stage, StageOutcome::Pending);
        }
        Self {
            id: id.into(),
            batch_id: batch_id.into(),
            current_stage: Stage::Frame,
            state: RunState::Initialized,
            retry_count: 0,
            stage_statuses,
            stage_metrics: BTreeMap::new(),
            error_message: None,
            next_retry_at: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn metric(&self, stage: Stage, key: &str) -> Option<f64> {
        self.stage_metrics.get(&stage)?.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_frame_first_finetune_last() {
        assert_eq!(STAGE_ORDER.first(), Some(&Stage::Frame));
        assert_eq!(STAGE_ORDER.last(), Some(&Stage::FineTuneDatasetBuild));
    }

    #[test]
    fn next_is_none_past_last_stage() {
        assert_eq!(Stage::FineTuneDatasetBuild.next(), None);
        assert_eq!(Stage::Frame.next(), Some(Stage::Intake));
    }

    #[test]
    fn new_run_starts_at_frame_initialized() {
        let run = PipelineRun::new("run-1", "batch-1");
        assert_eq!(run.current_stage, Stage::Frame);
        assert_eq!(run.state, RunState::Initialized);
        assert_eq!(run.stage_statuses.len(), 10);
    }
}
