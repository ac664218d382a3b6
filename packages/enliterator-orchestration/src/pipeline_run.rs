//! `PipelineRunStateMachine`: the transition logic for a `PipelineRun`,
//! adapted from the teacher's `JobStateMachine` (job state transitions
//! checked before applying, invalid transitions rejected explicitly).
//!
//! Unlike the teacher, a transition that is requested but already holds
//! (e.g. `pause()` on an already-paused run) is not an error: it resolves
//! `SPEC_FULL.md` §9's retry-idempotency open question by returning
//! [`TransitionOutcome::NoOp`] instead.

use std::collections::BTreeMap;

use chrono::Utc;
use enliterator_storage::{PipelineRun, RunState, Stage, StageOutcome, STAGE_ORDER};

use crate::error::{ErrorCategory, OrchestratorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    NoOp,
}

pub struct PipelineRunStateMachine {
    run: PipelineRun,
}

impl PipelineRunStateMachine {
    pub fn new(run: PipelineRun) -> Self {
        Self { run }
    }

    pub fn run(&self) -> &PipelineRun {
        &self.run
    }

    pub fn into_run(self) -> PipelineRun {
        self.run
    }

    /// `Initialized -> Running`, entering the first real stage (`Intake`).
    pub fn start(&mut self) -> Result<TransitionOutcome> {
        match self.run.state {
            RunState::Running | RunState::Paused => Ok(TransitionOutcome::NoOp),
            RunState::Initialized => {
                self.run.state = RunState::Running;
                self.run.current_stage = Stage::Intake;
                self.run.stage_statuses.insert(Stage::Intake, StageOutcome::Running);
                Ok(TransitionOutcome::Applied)
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: format!("{:?}", self.run.state),
                to: "running".to_string(),
            }),
        }
    }

    /// Mark the current stage `Completed` with the given metrics and move
    /// to the next stage in `STAGE_ORDER`, or finish the run if this was
    /// the last stage (§4.1).
    pub fn advance(&mut self, metrics: BTreeMap<String, f64>) -> Result<TransitionOutcome> {
        if self.run.state != RunState::Running {
            return Err(OrchestratorError::InvalidStateTransition {
                from: format!("{:?}", self.run.state),
                to: "advance".to_string(),
            });
        }

        let stage = self.run.current_stage;
        if self.run.stage_statuses.get(&stage) == Some(&StageOutcome::Completed) {
            return Ok(TransitionOutcome::NoOp);
        }

        self.run.stage_statuses.insert(stage, StageOutcome::Completed);
        self.run.stage_metrics.insert(stage, metrics);
        self.run.retry_count = 0;
        self.run.next_retry_at = None;

        match stage.next() {
            Some(next) => {
                self.run.current_stage = next;
                self.run.stage_statuses.insert(next, StageOutcome::Running);
            }
            None => {
                self.run.state = RunState::Completed;
                self.run.finished_at = Some(Utc::now());
            }
        }
        Ok(TransitionOutcome::Applied)
    }

    /// Mark the current stage `Failed`. `ExternalTransient` failures under
    /// `max_retries` schedule a retry at an exponential backoff bounded by
    /// `backoff_cap_secs`; every other category (or a retry budget that's
    /// exhausted) fails the run permanently (§7, §6 `max_retries`/backoff
    /// bounds).
    pub fn fail(
        &mut self,
        category: ErrorCategory,
        message: impl Into<String>,
        max_retries: u32,
        backoff_base_secs: u64,
        backoff_cap_secs: u64,
    ) -> Result<TransitionOutcome> {
        if self.run.state != RunState::Running {
            return Err(OrchestratorError::InvalidStateTransition {
                from: format!("{:?}", self.run.state),
                to: "failed".to_string(),
            });
        }

        let stage = self.run.current_stage;
        self.run.stage_statuses.insert(stage, StageOutcome::Failed);
        self.run.error_message = Some(message.into());

        if category.is_retriable() && self.run.retry_count < max_retries {
            let backoff_secs =
                (backoff_base_secs.saturating_mul(1 << self.run.retry_count)).min(backoff_cap_secs);
            self.run.retry_count += 1;
            self.run.next_retry_at = Some(Utc::now() + chrono::Duration::seconds(backoff_secs as i64));
            // Run stays Running so the runner can re-attempt current_stage;
            // only stage_statuses records the transient failure.
        } else {
            self.run.state = RunState::Failed;
            self.run.next_retry_at = None;
            self.run.finished_at = Some(Utc::now());
        }
        Ok(TransitionOutcome::Applied)
    }

    pub fn pause(&mut self) -> Result<TransitionOutcome> {
        match self.run.state {
            RunState::Paused => Ok(TransitionOutcome::NoOp),
            RunState::Running => {
                self.run.state = RunState::Paused;
                Ok(TransitionOutcome::Applied)
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: format!("{:?}", self.run.state),
                to: "paused".to_string(),
            }),
        }
    }

    pub fn resume(&mut self) -> Result<TransitionOutcome> {
        match self.run.state {
            RunState::Running => Ok(TransitionOutcome::NoOp),
            RunState::Paused => {
                self.run.state = RunState::Running;
                Ok(TransitionOutcome::Applied)
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: format!("{:?}", self.run.state),
                to: "running".to_string(),
            }),
        }
    }

    /// Mark the current stage `Skipped` (operator override for an
    /// optional/already-satisfied stage) and advance.
    pub fn skip_stage(&mut self) -> Result<TransitionOutcome> {
        if self.run.state != RunState::Running {
            return Err(OrchestratorError::InvalidStateTransition {
                from: format!("{:?}", self.run.state),
                to: "skip_stage".to_string(),
            });
        }
        let stage = self.run.current_stage;
        if self.run.stage_statuses.get(&stage) == Some(&StageOutcome::Skipped) {
            return Ok(TransitionOutcome::NoOp);
        }
        self.run.stage_statuses.insert(stage, StageOutcome::Skipped);
        if let Some(next) = stage.next() {
            self.run.current_stage = next;
            self.run.stage_statuses.insert(next, StageOutcome::Running);
        } else {
            self.run.state = RunState::Completed;
            self.run.finished_at = Some(Utc::now());
        }
        Ok(TransitionOutcome::Applied)
    }

    /// Operator action: rewind `current_stage` and every stage from
    /// `stage` onward to `Pending`, re-entering `Running` state. Used to
    /// recover from an `IntegrityFailure` after a manual fix.
    pub fn reset_to_stage(&mut self, stage: Stage) -> Result<TransitionOutcome> {
        if self.run.current_stage == stage && self.run.state == RunState::Running {
            return Ok(TransitionOutcome::NoOp);
        }
        for s in STAGE_ORDER.iter().filter(|s| s.index() >= stage.index()) {
            self.run.stage_statuses.insert(*s, StageOutcome::Pending);
            self.run.stage_metrics.remove(s);
        }
        self.run.current_stage = stage;
        self.run.stage_statuses.insert(stage, StageOutcome::Running);
        self.run.state = RunState::Running;
        self.run.retry_count = 0;
        self.run.next_retry_at = None;
        self.run.error_message = None;
        self.run.finished_at = None;
        Ok(TransitionOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_run() -> PipelineRun {
        PipelineRun::new("run-1", "batch-1")
    }

    #[test]
    fn start_moves_to_intake_running() {
        let mut sm = PipelineRunStateMachine::new(new_run());
        assert_eq!(sm.start().unwrap(), TransitionOutcome::Applied);
        assert_eq!(sm.run().current_stage, Stage::Intake);
        assert_eq!(sm.run().state, RunState::Running);
    }

    #[test]
    fn start_twice_is_noop() {
        let mut sm = PipelineRunStateMachine::new(new_run());
        sm.start().unwrap();
        assert_eq!(sm.start().unwrap(), TransitionOutcome::NoOp);
    }

    #[test]
    fn advance_through_all_stages_completes_run() {
        let mut sm = PipelineRunStateMachine::new(new_run());
        sm.start().unwrap();
        for _ in 0..(STAGE_ORDER.len() - 1) {
            sm.advance(BTreeMap::new()).unwrap();
        }
        assert_eq!(sm.run().state, RunState::Completed);
        assert!(sm.run().finished_at.is_some());
    }

    #[test]
    fn transient_failure_under_budget_schedules_retry_and_stays_running() {
        let mut sm = PipelineRunStateMachine::new(new_run());
        sm.start().unwrap();
        sm.fail(ErrorCategory::ExternalTransient, "timeout", 3, 2, 60)
            .unwrap();
        assert_eq!(sm.run().state, RunState::Running);
        assert_eq!(sm.run().retry_count, 1);
        assert!(sm.run().next_retry_at.is_some());
    }

    #[test]
    fn invalid_input_failure_fails_run_immediately() {
        let mut sm = PipelineRunStateMachine::new(new_run());
        sm.start().unwrap();
        sm.fail(ErrorCategory::InvalidInput, "bad data", 3, 2, 60).unwrap();
        assert_eq!(sm.run().state, RunState::Failed);
        assert!(sm.run().next_retry_at.is_none());
    }

    #[test]
    fn exhausted_retry_budget_fails_run() {
        let mut sm = PipelineRunStateMachine::new(new_run());
        sm.start().unwrap();
        for _ in 0..3 {
            sm.fail(ErrorCategory::ExternalTransient, "timeout", 3, 2, 60)
                .unwrap();
            sm.run.state = RunState::Running;
        }
        sm.fail(ErrorCategory::ExternalTransient, "timeout", 3, 2, 60).unwrap();
        assert_eq!(sm.run().state, RunState::Failed);
    }

    #[test]
    fn pause_resume_roundtrips() {
        let mut sm = PipelineRunStateMachine::new(new_run());
        sm.start().unwrap();
        sm.pause().unwrap();
        assert_eq!(sm.run().state, RunState::Paused);
        sm.resume().unwrap();
        assert_eq!(sm.run().state, RunState::Running);
    }

    #[test]
    fn reset_to_stage_clears_downstream_statuses() {
        let mut sm = PipelineRunStateMachine::new(new_run());
        sm.start().unwrap();
        sm.advance(BTreeMap::new()).unwrap();
        sm.advance(BTreeMap::new()).unwrap();
        sm.reset_to_stage(Stage::Intake).unwrap();
        assert_eq!(sm.run().current_stage, Stage::Intake);
        assert_eq!(
            sm.run().stage_statuses[&Stage::RightsProvenance],
            StageOutcome::Pending
        );
    }
}
