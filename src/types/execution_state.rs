//! Mutable state of one debugging run.

use chrono::{DateTime, Utc};

use crate::condition::StageVariables;
use crate::error::EngineError;
use crate::history::HistoryStore;
use crate::stage_registry::StageRegistry;

use super::{Snapshot, StageId, StateSummary, StepContext, StepPayload, StepResult};

/// Execution state of one run, created by `start` and replaced by `start`/`reset`.
#[derive(Debug, Clone)]
pub struct ExecutionState {
  pub current_stage: StageId,
  pub cycle_count: u64,
  pub finished: bool,
  pub start_time: DateTime<Utc>,
  /// Input handed to the first step (and again after rewinding to the start).
  pub initial_input: StepPayload,
  pub initial_context: StepContext,
  /// Stage context as left by the last step.
  pub context: StepContext,
  pub history: HistoryStore,
  /// Set when a breakpoint halted at `current_stage`; the next step runs through it.
  pub resume_from_pause: bool,
}

impl ExecutionState {
  pub fn new(
    registry: &StageRegistry,
    initial_input: StepPayload,
    initial_context: StepContext,
    history: HistoryStore,
  ) -> Self {
    let initial = registry.initial().clone();
    let cycle_count = u64::from(registry.is_cycle_boundary(initial.as_str()));
    Self {
      current_stage: initial,
      cycle_count,
      finished: false,
      start_time: Utc::now(),
      initial_input,
      context: initial_context.clone(),
      initial_context,
      history,
      resume_from_pause: false,
    }
  }

  pub fn step_count(&self) -> usize {
    self.history.len()
  }

  /// Input for the step about to run: the previous output, or the initial input.
  pub fn next_input(&self) -> StepPayload {
    self
      .history
      .last()
      .map(|s| s.output.clone())
      .unwrap_or_else(|| self.initial_input.clone())
  }

  /// Variables visible to breakpoint conditions for the step about to run.
  pub fn variables(&self) -> StageVariables<'_> {
    StageVariables {
      stage: &self.current_stage,
      cycle_count: self.cycle_count,
      step_count: self.history.len(),
      context: &self.context,
    }
  }

  /// Appends a step and, when due, a snapshot of the resulting progress.
  pub(crate) fn record(&mut self, result: StepResult) {
    if self.history.append(result) {
      let snapshot = Snapshot {
        timestamp: Utc::now(),
        stage: self.current_stage.clone(),
        cycle_count: self.cycle_count,
        step_count: self.history.len(),
        finished: self.finished,
      };
      self.history.record_snapshot(snapshot);
    }
  }

  /// Removes the last `n` steps and recomputes position, cycle count and context.
  ///
  /// Clears `finished`. Fails without mutation if `n == 0` or `n` exceeds history.
  pub fn rewind(
    &mut self,
    n: usize,
    registry: &StageRegistry,
  ) -> Result<Vec<StepResult>, EngineError> {
    let removed = self.history.rewind(n)?;
    match self.history.last() {
      Some(last) => {
        self.current_stage = last
          .next_stage
          .clone()
          .unwrap_or_else(|| last.stage.clone());
        self.context = last.context_after.clone();
      }
      None => {
        self.current_stage = registry.initial().clone();
        self.context = self.initial_context.clone();
      }
    }
    self.cycle_count = count_cycles(registry, self.history.entries());
    self.finished = false;
    self.resume_from_pause = false;
    Ok(removed)
  }

  pub fn summary(&self) -> StateSummary {
    let last = self.history.last();
    StateSummary {
      current_stage: self.current_stage.clone(),
      cycle_count: self.cycle_count,
      finished: self.finished,
      start_time: self.start_time,
      step_count: self.history.len(),
      snapshot_count: self.history.snapshot_count(),
      paused: self.resume_from_pause,
      last_step_id: last.map(|s| s.step_id.clone()),
      last_error: last.and_then(|s| s.error.clone()),
      context_keys: self.context.keys().cloned().collect(),
    }
  }
}

/// Cycle count implied by a history: one per entry into the boundary stage,
/// counting the initial stage when it is the boundary.
fn count_cycles(registry: &StageRegistry, entries: &[StepResult]) -> u64 {
  let Some(boundary) = registry.cycle_boundary() else {
    return 0;
  };
  let initial = u64::from(registry.initial() == boundary);
  let entered = entries
    .iter()
    .filter(|s| s.next_stage.as_ref() == Some(boundary))
    .count() as u64;
  initial + entered
}
