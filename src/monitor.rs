//! Shared engine core and the read-only monitor handle.
//!
//! All engine data lives behind one [ReentrantMutex]. Writers hold it only for
//! the pre-step and post-step phases, so a monitor thread can inspect state
//! while a handler is running.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;

use crate::breakpoints::BreakpointManager;
use crate::error::EngineError;
use crate::performance::{PerformanceAnalyzer, PerformanceReport};
use crate::stage_registry::StageRegistry;
use crate::types::{Breakpoint, ExecutionState, Snapshot, StateSummary, StepResult};

/// Everything the engine mutates: the current run and the breakpoints.
#[derive(Debug, Default)]
pub(crate) struct DebugCore {
  pub(crate) state: Option<ExecutionState>,
  pub(crate) breakpoints: BreakpointManager,
  /// Bumped by every `start` and `reset`; a step only commits into the run it was prepared in.
  pub(crate) generation: u64,
}

pub(crate) type SharedCore = Arc<ReentrantMutex<RefCell<DebugCore>>>;

/// Runs `f` with shared access to the core.
pub(crate) fn read_core<R>(core: &SharedCore, f: impl FnOnce(&DebugCore) -> R) -> R {
  let guard = core.lock();
  let c = guard.borrow();
  f(&c)
}

/// Runs `f` with exclusive access to the core. `f` must not re-enter the core.
pub(crate) fn write_core<R>(core: &SharedCore, f: impl FnOnce(&mut DebugCore) -> R) -> R {
  let guard = core.lock();
  let mut c = guard.borrow_mut();
  f(&mut c)
}

/// Cloneable read-only view of a [crate::StepEngine], safe to use from another thread.
#[derive(Clone)]
pub struct EngineMonitor {
  pub(crate) core: SharedCore,
  pub(crate) registry: Arc<StageRegistry>,
}

impl EngineMonitor {
  /// Summary of the current run.
  pub fn inspect_state(&self) -> Result<StateSummary, EngineError> {
    read_core(&self.core, |c| {
      c.state
        .as_ref()
        .map(ExecutionState::summary)
        .ok_or(EngineError::NotStarted)
    })
  }

  /// Most recent `limit` steps (or all); empty before `start`.
  pub fn get_trace(&self, limit: Option<usize>) -> Vec<StepResult> {
    read_core(&self.core, |c| {
      c.state
        .as_ref()
        .map(|s| s.history.get_trace(limit).to_vec())
        .unwrap_or_default()
    })
  }

  pub fn snapshots(&self) -> Vec<Snapshot> {
    read_core(&self.core, |c| {
      c.state
        .as_ref()
        .map(|s| s.history.snapshots().cloned().collect())
        .unwrap_or_default()
    })
  }

  pub fn list_breakpoints(&self) -> Vec<Breakpoint> {
    read_core(&self.core, |c| c.breakpoints.list().to_vec())
  }

  /// Timing report over the full trace; all zeros before `start`.
  pub fn performance_report(&self) -> PerformanceReport {
    let analyzer = PerformanceAnalyzer::new(self.registry.cycle_boundary().cloned());
    read_core(&self.core, |c| match &c.state {
      Some(s) => analyzer.analyze(s.history.entries()),
      None => PerformanceReport::default(),
    })
  }

  /// Runs `f` against the live state under the engine lock.
  ///
  /// Re-entrant: `f` may call other monitor methods.
  pub fn with_state<R>(&self, f: impl FnOnce(Option<&ExecutionState>) -> R) -> R {
    read_core(&self.core, |c| f(c.state.as_ref()))
  }
}

impl std::fmt::Debug for EngineMonitor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EngineMonitor").finish_non_exhaustive()
  }
}
