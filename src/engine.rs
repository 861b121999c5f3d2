//! Single-step execution engine with breakpoints, rewind and run wrappers.

use std::cell::RefCell;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::ReentrantMutex;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::condition::Condition;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::handler::{HandlerRegistry, StageContext, StageOutput};
use crate::history::HistoryStore;
use crate::monitor::{DebugCore, EngineMonitor, SharedCore, read_core, write_core};
use crate::performance::PerformanceReport;
use crate::session_io::{self, SessionRecord};
use crate::stage_registry::StageRegistry;
use crate::types::{
  Breakpoint, DebugInfo, ExecutionState, StageId, StateSummary, StepContext, StepPayload,
  StepResult, debug_keys,
};

/// Result of one `run_one_step` call.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
  /// The stage ran and was recorded.
  Executed(StepResult),
  /// A breakpoint fired before the stage ran; nothing was recorded.
  Paused(Breakpoint),
}

/// Why a multi-step run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
  /// The session finished normally.
  Completed,
  /// A breakpoint fired at `stage`.
  Paused { breakpoint_id: String, stage: StageId },
  /// A handler error ended the session.
  Failed { stage: StageId, error: String },
  /// The requested step count or the per-run budget was used up.
  StepBudget,
}

impl fmt::Display for StopReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StopReason::Completed => write!(f, "completed"),
      StopReason::Paused {
        breakpoint_id,
        stage,
      } => write!(f, "paused at {stage} ({breakpoint_id})"),
      StopReason::Failed { stage, error } => write!(f, "failed at {stage}: {error}"),
      StopReason::StepBudget => write!(f, "step budget exhausted"),
    }
  }
}

/// Steps executed by a multi-step run and the reason it stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
  pub steps: Vec<StepResult>,
  pub stop: StopReason,
}

impl RunSummary {
  /// Names of the executed stages, in order.
  pub fn stages(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.stage.as_str()).collect()
  }
}

/// Input and context captured under the lock before a handler runs.
struct PreparedStep {
  generation: u64,
  stage: StageId,
  input: StepPayload,
  context: StageContext,
}

/// Drives a [StageRegistry] workflow one step at a time.
///
/// The engine owns the run state and breakpoints behind a single re-entrant
/// lock; use [StepEngine::monitor] to read them from another thread. Only one
/// thread may step an engine at a time.
pub struct StepEngine {
  registry: Arc<StageRegistry>,
  handlers: HandlerRegistry,
  config: EngineConfig,
  core: SharedCore,
}

impl StepEngine {
  /// Builds an engine. Every handler must name a declared stage, and every
  /// non-terminal stage needs a handler.
  pub fn new(
    registry: StageRegistry,
    handlers: HandlerRegistry,
    config: EngineConfig,
  ) -> Result<Self, EngineError> {
    if let Some(unknown) = handlers.stages().find(|s| !registry.contains(s.as_str())) {
      return Err(EngineError::UnknownStage(unknown.to_string()));
    }
    if let Some(missing) = registry
      .stages()
      .find(|s| !registry.is_terminal(s.as_str()) && !handlers.contains(s.as_str()))
    {
      return Err(EngineError::MissingHandler(missing.clone()));
    }
    Ok(Self {
      registry: Arc::new(registry),
      handlers,
      config,
      core: Arc::new(ReentrantMutex::new(RefCell::new(DebugCore::default()))),
    })
  }

  pub fn registry(&self) -> &StageRegistry {
    &self.registry
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Read-only handle for a concurrent observer.
  pub fn monitor(&self) -> EngineMonitor {
    EngineMonitor {
      core: Arc::clone(&self.core),
      registry: Arc::clone(&self.registry),
    }
  }

  /// Starts a new run with `input`, replacing any previous run. Breakpoints are kept.
  pub fn start(&self, input: impl Into<StepPayload>) -> StateSummary {
    self.start_with_context(input, StepContext::new())
  }

  /// Like [Self::start], seeding the stage context.
  #[instrument(level = "trace", skip(self, input, context))]
  pub fn start_with_context(
    &self,
    input: impl Into<StepPayload>,
    context: StepContext,
  ) -> StateSummary {
    let mut state = ExecutionState::new(
      &self.registry,
      input.into(),
      context,
      HistoryStore::from_config(&self.config),
    );
    state.finished = self.is_finish_stage(&state.current_stage);
    let summary = state.summary();
    write_core(&self.core, |c| {
      c.state = Some(state);
      c.generation += 1;
    });
    info!(stage = %summary.current_stage, "debug session started");
    summary
  }

  /// Discards the current run. Breakpoints are kept.
  pub fn reset(&self) {
    write_core(&self.core, |c| {
      c.state = None;
      c.generation += 1;
    });
    info!("debug session reset");
  }

  /// True when entering `stage` ends the run without executing it.
  fn is_finish_stage(&self, stage: &StageId) -> bool {
    self.registry.is_completed(stage.as_str()) || !self.handlers.contains(stage.as_str())
  }

  /// Executes the current stage, or pauses on a matching breakpoint.
  ///
  /// Fails with [EngineError::SessionFinished] once the run is finished, leaving state untouched.
  #[instrument(level = "trace", skip(self))]
  pub fn run_one_step(&self) -> Result<StepOutcome, EngineError> {
    let prepared = write_core(&self.core, |c| self.prepare_step(c))?;
    let PreparedStep {
      generation,
      stage,
      input,
      mut context,
    } = match prepared {
      Ok(p) => p,
      Err(bp) => return Ok(StepOutcome::Paused(bp)),
    };

    let handler = self
      .handlers
      .get(stage.as_str())
      .ok_or_else(|| EngineError::MissingHandler(stage.clone()))?;
    let timestamp = Utc::now();
    let started = Instant::now();
    let outcome = handler.handle(&input, &mut context);
    let duration = started.elapsed().as_secs_f64();

    let StageOutput {
      output,
      next_stage: requested_next,
      executor_tag,
      mut debug_info,
      mut error,
    } = outcome.unwrap_or_else(|e| {
      let mut out = StageOutput::new(StepPayload::Error(e.message.clone())).with_error(e.message);
      out.executor_tag = e.executor_tag.unwrap_or_default();
      out
    });

    let override_next = match requested_next {
      Some(next) => match self.registry.resolve(next.as_str()) {
        Some(id) => Some(id),
        None => {
          error.get_or_insert_with(|| format!("handler requested unknown stage: {next}"));
          None
        }
      },
      None => None,
    };
    let next_stage = match (override_next, &error) {
      (Some(next), _) => Some(next),
      (None, Some(_)) => self.registry.finalize().cloned(),
      (None, None) => self.registry.successor(stage.as_str()),
    };
    if let Some(e) = &error {
      warn!(stage = %stage, error = %e, next = ?next_stage, "stage handler failed");
    }

    write_core(&self.core, |c| -> Result<StepOutcome, EngineError> {
      if c.generation != generation {
        warn!(stage = %stage, "run replaced during handler; discarding step");
        return Err(EngineError::RunReplaced);
      }
      let state = c.state.as_mut().ok_or(EngineError::NotStarted)?;
      state.context = context.into_values();
      fill_engine_debug_keys(&mut debug_info, &input, &output, state.cycle_count);

      let result = StepResult {
        stage: stage.clone(),
        step_id: uuid::Uuid::new_v4().to_string(),
        timestamp,
        input,
        output,
        duration,
        executor_tag: if executor_tag.is_empty() {
          stage.to_string()
        } else {
          executor_tag
        },
        next_stage: next_stage.clone(),
        debug_info,
        error,
        context_after: state.context.clone(),
      };

      if let Some(next) = &next_stage {
        state.current_stage = next.clone();
        if self.registry.is_cycle_boundary(next.as_str()) {
          state.cycle_count += 1;
        }
      }
      state.finished = result.is_error()
        || next_stage
          .as_ref()
          .is_none_or(|next| self.is_finish_stage(next));
      state.record(result.clone());

      info!(
        stage = %stage,
        next = ?next_stage,
        duration,
        cycle = state.cycle_count,
        finished = state.finished,
        "step executed"
      );
      Ok(StepOutcome::Executed(result))
    })
  }

  /// Pre-step phase: rejects finished runs, checks breakpoints and snapshots the
  /// handler's input and context. `Ok(Err(bp))` means the step paused.
  fn prepare_step(
    &self,
    c: &mut DebugCore,
  ) -> Result<Result<PreparedStep, Breakpoint>, EngineError> {
    let DebugCore {
      state,
      breakpoints,
      generation,
    } = c;
    let state = state.as_mut().ok_or(EngineError::NotStarted)?;
    if state.finished {
      return Err(EngineError::SessionFinished);
    }
    if state.resume_from_pause {
      state.resume_from_pause = false;
    } else if let Some(bp) = breakpoints.check(&state.current_stage, &state.variables()) {
      state.resume_from_pause = true;
      info!(id = %bp.id, stage = %bp.stage, hit_count = bp.hit_count, "breakpoint hit");
      return Ok(Err(bp));
    }
    Ok(Ok(PreparedStep {
      generation: *generation,
      stage: state.current_stage.clone(),
      input: state.next_input(),
      context: StageContext::new(
        state.context.clone(),
        self.config.max_context_entries,
        state.current_stage.clone(),
        state.cycle_count,
        state.history.len(),
      ),
    }))
  }

  /// Runs up to `n` steps.
  pub fn run_steps(&self, n: usize) -> Result<RunSummary, EngineError> {
    self.run_bounded(n)
  }

  /// Runs until a breakpoint fires, the run ends, or the per-run step budget is spent.
  pub fn run_until_breakpoint(&self) -> Result<RunSummary, EngineError> {
    self.run_bounded(self.config.max_steps_per_run)
  }

  /// Runs until the session finishes. Still stops on breakpoints, errors and the step budget.
  pub fn run_to_completion(&self) -> Result<RunSummary, EngineError> {
    self.run_bounded(self.config.max_steps_per_run)
  }

  #[instrument(level = "trace", skip(self))]
  fn run_bounded(&self, limit: usize) -> Result<RunSummary, EngineError> {
    let mut steps = Vec::new();
    for _ in 0..limit {
      let result = match self.run_one_step() {
        Ok(StepOutcome::Executed(r)) => r,
        Ok(StepOutcome::Paused(bp)) => {
          return Ok(RunSummary {
            steps,
            stop: StopReason::Paused {
              breakpoint_id: bp.id,
              stage: bp.stage,
            },
          });
        }
        Err(e) => return Err(e),
      };
      let failure = result
        .error
        .clone()
        .map(|error| (result.stage.clone(), error));
      steps.push(result);
      if let Some((stage, error)) = failure {
        return Ok(RunSummary {
          steps,
          stop: StopReason::Failed { stage, error },
        });
      }
      if self.is_finished() {
        info!(steps = steps.len(), "run completed");
        return Ok(RunSummary {
          steps,
          stop: StopReason::Completed,
        });
      }
    }
    Ok(RunSummary {
      steps,
      stop: StopReason::StepBudget,
    })
  }

  fn is_finished(&self) -> bool {
    read_core(&self.core, |c| c.state.as_ref().is_some_and(|s| s.finished))
  }

  /// Rewinds the last `n` steps. Fails without mutation if `n == 0` or `n` exceeds history.
  #[instrument(level = "trace", skip(self))]
  pub fn step_back(&self, n: usize) -> Result<StateSummary, EngineError> {
    write_core(&self.core, |c| -> Result<StateSummary, EngineError> {
      let state = c.state.as_mut().ok_or(EngineError::NotStarted)?;
      state.rewind(n, &self.registry)?;
      debug!(n, stage = %state.current_stage, "stepped back");
      Ok(state.summary())
    })
  }

  pub fn inspect_state(&self) -> Result<StateSummary, EngineError> {
    self.monitor().inspect_state()
  }

  pub fn get_trace(&self, limit: Option<usize>) -> Vec<StepResult> {
    self.monitor().get_trace(limit)
  }

  /// Adds an enabled breakpoint on `stage` and returns its generated id.
  ///
  /// A condition that does not parse is accepted (and logged); it never matches.
  pub fn add_breakpoint(
    &self,
    stage: &str,
    condition: Option<&str>,
    description: Option<&str>,
  ) -> Result<String, EngineError> {
    let stage = self
      .registry
      .resolve(stage)
      .ok_or_else(|| EngineError::UnknownStage(stage.to_string()))?;
    if let Some(Err(e)) = condition.map(Condition::parse) {
      warn!(stage = %stage, condition = ?condition, error = %e, "breakpoint condition does not parse");
    }
    Ok(write_core(&self.core, |c| {
      c.breakpoints.create(
        stage,
        condition.map(str::to_string),
        description.map(str::to_string),
      )
    }))
  }

  /// Registers a fully specified breakpoint; its id must be unique and its stage declared.
  pub fn insert_breakpoint(&self, bp: Breakpoint) -> Result<String, EngineError> {
    if !self.registry.contains(bp.stage.as_str()) {
      return Err(EngineError::UnknownStage(bp.stage.to_string()));
    }
    Ok(write_core(&self.core, |c| c.breakpoints.add(bp))?)
  }

  pub fn remove_breakpoint(&self, id: &str) -> bool {
    write_core(&self.core, |c| c.breakpoints.remove(id))
  }

  pub fn enable_breakpoint(&self, id: &str) -> bool {
    write_core(&self.core, |c| c.breakpoints.enable(id))
  }

  pub fn disable_breakpoint(&self, id: &str) -> bool {
    write_core(&self.core, |c| c.breakpoints.disable(id))
  }

  pub fn clear_breakpoints(&self) {
    write_core(&self.core, |c| c.breakpoints.clear());
  }

  pub fn list_breakpoints(&self) -> Vec<Breakpoint> {
    self.monitor().list_breakpoints()
  }

  pub fn get_performance_report(&self) -> PerformanceReport {
    self.monitor().performance_report()
  }

  /// Captures the current run as a [SessionRecord].
  pub fn session_record(&self) -> Result<SessionRecord, EngineError> {
    let monitor = self.monitor();
    // Held across the nested monitor reads so the record is one consistent view.
    let _guard = self.core.lock();
    let metrics = monitor.performance_report();
    monitor.with_state(|state| -> Result<SessionRecord, EngineError> {
      let state = state.ok_or(EngineError::NotStarted)?;
      Ok(SessionRecord::capture(
        state,
        &monitor.list_breakpoints(),
        metrics,
      ))
    })
  }

  /// Writes the current run as a versioned JSON session record.
  #[instrument(level = "trace", skip(self, sink))]
  pub fn export_session<W: Write>(&self, sink: W) -> Result<(), EngineError> {
    let record = self.session_record()?;
    session_io::export_session(&record, sink)?;
    info!(steps = record.step_history.len(), "session exported");
    Ok(())
  }

  /// Parses a session record for inspection. Never rebuilds a live run.
  pub fn import_session<R: Read>(source: R) -> Result<SessionRecord, EngineError> {
    Ok(session_io::import_session(source)?)
  }
}

impl fmt::Debug for StepEngine {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StepEngine")
      .field("registry", &self.registry)
      .field("handlers", &self.handlers)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

/// Fills the engine-owned well-known debug keys unless the handler set them.
fn fill_engine_debug_keys(
  debug_info: &mut DebugInfo,
  input: &StepPayload,
  output: &StepPayload,
  cycle: u64,
) {
  debug_info
    .entry(debug_keys::INPUT_SIZE.to_string())
    .or_insert_with(|| Value::from(input.size()));
  debug_info
    .entry(debug_keys::OUTPUT_SIZE.to_string())
    .or_insert_with(|| Value::from(output.size()));
  debug_info
    .entry(debug_keys::CYCLE.to_string())
    .or_insert_with(|| Value::from(cycle));
}
