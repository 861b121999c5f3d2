//! Predefined 12-stage reference workflow and deterministic demonstration handlers.
//!
//! Stage chain: init → complexity_check → pre_supervision → cycle_start →
//! state_analysis → decision → value_evaluation → action_execution → cycle_end
//! → post_supervision → finalize → completed. `cycle_end` loops back to
//! `cycle_start` until the configured number of cycles has run.

use serde_json::json;
use tracing::instrument;

use crate::error::{RegistryError, StageError};
use crate::handler::{HandlerRegistry, StageContext, StageHandler, StageOutput};
use crate::stage_registry::StageRegistry;
use crate::types::{StepPayload, debug_keys};

pub const INIT: &str = "init";
pub const COMPLEXITY_CHECK: &str = "complexity_check";
pub const PRE_SUPERVISION: &str = "pre_supervision";
pub const CYCLE_START: &str = "cycle_start";
pub const STATE_ANALYSIS: &str = "state_analysis";
pub const DECISION: &str = "decision";
pub const VALUE_EVALUATION: &str = "value_evaluation";
pub const ACTION_EXECUTION: &str = "action_execution";
pub const CYCLE_END: &str = "cycle_end";
pub const POST_SUPERVISION: &str = "post_supervision";
pub const FINALIZE: &str = "finalize";
pub const COMPLETED: &str = "completed";

/// All reference stages in chain order.
pub const STAGES: [&str; 12] = [
  INIT,
  COMPLEXITY_CHECK,
  PRE_SUPERVISION,
  CYCLE_START,
  STATE_ANALYSIS,
  DECISION,
  VALUE_EVALUATION,
  ACTION_EXECUTION,
  CYCLE_END,
  POST_SUPERVISION,
  FINALIZE,
  COMPLETED,
];

/// Default number of reasoning cycles.
pub const DEFAULT_MAX_CYCLES: u64 = 3;

/// Registry of the reference chain with its cycle, finalize and completed roles.
pub fn reference_registry() -> Result<StageRegistry, RegistryError> {
  let mut builder = StageRegistry::builder();
  for pair in STAGES.windows(2) {
    builder = builder.stage(pair[0], pair[1]);
  }
  builder
    .terminal(COMPLETED)
    .initial(INIT)
    .cycle_boundary(CYCLE_START)
    .finalize(FINALIZE)
    .completed(COMPLETED)
    .build()
}

type StageFn =
  fn(&ReferenceStage, &StepPayload, &mut StageContext) -> Result<StageOutput, StageError>;

/// One demonstration handler; fails on purpose when `fail` is set.
struct ReferenceStage {
  name: &'static str,
  fail: bool,
  max_cycles: u64,
  run: StageFn,
}

impl StageHandler for ReferenceStage {
  fn handle(
    &self,
    input: &StepPayload,
    ctx: &mut StageContext,
  ) -> Result<StageOutput, StageError> {
    if self.fail {
      return Err(
        StageError::new(format!("injected failure at {}", self.name))
          .with_executor_tag("fault_injector"),
      );
    }
    ctx.insert("last_stage", self.name)?;
    (self.run)(self, input, ctx)
  }
}

/// Handlers for every non-terminal reference stage.
///
/// Runs `max_cycles` cycles (at least one). The stage named by `fail_at`, if
/// any, returns a handler error instead of running.
#[instrument(level = "trace")]
pub fn reference_handlers(max_cycles: u64, fail_at: Option<&str>) -> HandlerRegistry {
  let table: [(&'static str, StageFn); 11] = [
    (INIT, init),
    (COMPLEXITY_CHECK, complexity_check),
    (PRE_SUPERVISION, supervise),
    (CYCLE_START, cycle_start),
    (STATE_ANALYSIS, state_analysis),
    (DECISION, decision),
    (VALUE_EVALUATION, value_evaluation),
    (ACTION_EXECUTION, action_execution),
    (CYCLE_END, cycle_end),
    (POST_SUPERVISION, supervise),
    (FINALIZE, finalize),
  ];
  let mut handlers = HandlerRegistry::new();
  for (name, run) in table {
    handlers.register_handler(
      name,
      ReferenceStage {
        name,
        fail: fail_at == Some(name),
        max_cycles: max_cycles.max(1),
        run,
      },
    );
  }
  handlers
}

fn task_text(input: &StepPayload) -> String {
  match input {
    StepPayload::Text(s) => s.clone(),
    StepPayload::Record(m) => m
      .get("task")
      .and_then(|v| v.as_str())
      .unwrap_or_default()
      .to_string(),
    StepPayload::Empty | StepPayload::Error(_) => String::new(),
  }
}

fn init(
  _: &ReferenceStage,
  input: &StepPayload,
  ctx: &mut StageContext,
) -> Result<StageOutput, StageError> {
  let task = task_text(input);
  ctx.insert("task", task.as_str())?;
  Ok(
    StageOutput::new(StepPayload::record([("task", json!(task)), ("initialized", json!(true))]))
      .with_executor_tag("engine"),
  )
}

fn complexity_check(
  _: &ReferenceStage,
  input: &StepPayload,
  ctx: &mut StageContext,
) -> Result<StageOutput, StageError> {
  let words = task_text(input).split_whitespace().count();
  let complexity = if words > 8 { "complex" } else { "simple" };
  ctx.insert("complexity", complexity)?;
  Ok(
    StageOutput::new(StepPayload::record([
      ("task", json!(task_text(input))),
      ("complexity", json!(complexity)),
      ("words", json!(words)),
    ]))
    .with_executor_tag("analyzer")
    .with_debug(debug_keys::CONFIDENCE, 0.8),
  )
}

fn supervise(
  stage: &ReferenceStage,
  input: &StepPayload,
  _ctx: &mut StageContext,
) -> Result<StageOutput, StageError> {
  Ok(
    StageOutput::new(input.clone())
      .with_executor_tag("supervisor")
      .with_debug(debug_keys::DECISION, "approved")
      .with_debug(debug_keys::REASON, format!("{} checks passed", stage.name)),
  )
}

fn cycle_start(
  _: &ReferenceStage,
  _input: &StepPayload,
  ctx: &mut StageContext,
) -> Result<StageOutput, StageError> {
  let cycle = ctx.cycle_count();
  ctx.insert("cycle", cycle)?;
  Ok(
    StageOutput::new(StepPayload::record([("cycle", json!(cycle))])).with_executor_tag("engine"),
  )
}

fn state_analysis(
  _: &ReferenceStage,
  _input: &StepPayload,
  ctx: &mut StageContext,
) -> Result<StageOutput, StageError> {
  let observation = format!(
    "cycle {} on a {} task",
    ctx.cycle_count(),
    ctx.get_str("complexity").unwrap_or("simple")
  );
  Ok(
    StageOutput::new(StepPayload::record([("observation", json!(observation))]))
      .with_executor_tag("analyzer"),
  )
}

fn decision(
  _: &ReferenceStage,
  _input: &StepPayload,
  ctx: &mut StageContext,
) -> Result<StageOutput, StageError> {
  let choice = if ctx.cycle_count() % 2 == 1 { "explore" } else { "refine" };
  ctx.insert("decision", choice)?;
  Ok(
    StageOutput::new(StepPayload::record([("decision", json!(choice))]))
      .with_executor_tag("decision_maker")
      .with_debug(debug_keys::DECISION, choice)
      .with_debug(debug_keys::CONFIDENCE, 0.7),
  )
}

fn value_evaluation(
  _: &ReferenceStage,
  _input: &StepPayload,
  ctx: &mut StageContext,
) -> Result<StageOutput, StageError> {
  let score = match ctx.get_str("decision") {
    Some("explore") => 0.6,
    _ => 0.9,
  };
  ctx.insert("value", score)?;
  Ok(
    StageOutput::new(StepPayload::record([("value", json!(score))]))
      .with_executor_tag("evaluator"),
  )
}

fn action_execution(
  _: &ReferenceStage,
  _input: &StepPayload,
  ctx: &mut StageContext,
) -> Result<StageOutput, StageError> {
  let action = format!(
    "{} (cycle {})",
    ctx.get_str("decision").unwrap_or("noop"),
    ctx.cycle_count()
  );
  Ok(StageOutput::new(StepPayload::Text(action)).with_executor_tag("executor"))
}

fn cycle_end(
  stage: &ReferenceStage,
  input: &StepPayload,
  ctx: &mut StageContext,
) -> Result<StageOutput, StageError> {
  let out = StageOutput::new(input.clone()).with_executor_tag("engine");
  if ctx.cycle_count() < stage.max_cycles {
    Ok(
      out
        .with_next_stage(CYCLE_START)
        .with_debug(debug_keys::REASON, "more cycles requested"),
    )
  } else {
    Ok(out.with_debug(debug_keys::REASON, "cycle budget reached"))
  }
}

fn finalize(
  _: &ReferenceStage,
  input: &StepPayload,
  ctx: &mut StageContext,
) -> Result<StageOutput, StageError> {
  let status = if input.is_error() { "failed" } else { "succeeded" };
  Ok(
    StageOutput::new(StepPayload::record([
      ("status", json!(status)),
      ("cycles", json!(ctx.cycle_count())),
      ("task", json!(ctx.get_str("task").unwrap_or_default())),
    ]))
    .with_executor_tag("engine"),
  )
}
