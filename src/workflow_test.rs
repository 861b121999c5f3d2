//! Tests for the reference workflow.

use serde_json::json;

use crate::config::EngineConfig;
use crate::engine::{StepEngine, StopReason};
use crate::types::StepPayload;
use crate::workflow::{
  COMPLETED, CYCLE_START, DECISION, FINALIZE, INIT, STAGES, reference_handlers, reference_registry,
};

fn engine(max_cycles: u64, fail_at: Option<&str>) -> StepEngine {
  StepEngine::new(
    reference_registry().unwrap(),
    reference_handlers(max_cycles, fail_at),
    EngineConfig::default(),
  )
  .unwrap()
}

#[test]
fn registry_declares_chain_and_roles() {
  let registry = reference_registry().unwrap();
  let stages: Vec<&str> = registry.stages().map(|s| s.as_str()).collect();
  assert_eq!(stages, STAGES.to_vec());
  assert_eq!(registry.initial(), INIT);
  assert_eq!(registry.cycle_boundary().unwrap(), CYCLE_START);
  assert_eq!(registry.finalize().unwrap(), FINALIZE);
  assert_eq!(registry.completed().unwrap(), COMPLETED);
  assert!(registry.is_terminal(COMPLETED));
  assert_eq!(registry.successor(FINALIZE).unwrap(), COMPLETED);
}

#[test]
fn handlers_cover_every_stage_but_completed() {
  let handlers = reference_handlers(1, None);
  assert_eq!(handlers.len(), STAGES.len() - 1);
  assert!(!handlers.contains(COMPLETED));
}

#[test]
fn single_cycle_run_visits_each_stage_once() {
  let engine = engine(1, None);
  engine.start("summarize the report");
  let run = engine.run_to_completion().unwrap();
  assert_eq!(run.stop, StopReason::Completed);
  assert_eq!(run.stages(), STAGES[..11].to_vec());

  let state = engine.inspect_state().unwrap();
  assert_eq!(state.current_stage, COMPLETED);
  assert_eq!(state.cycle_count, 1);
  assert!(state.finished);

  let last = run.steps.last().unwrap();
  assert_eq!(last.output.as_record().unwrap()["status"], json!("succeeded"));
  assert_eq!(last.output.as_record().unwrap()["task"], json!("summarize the report"));
}

#[test]
fn cycle_end_loops_until_max_cycles() {
  let engine = engine(3, None);
  engine.start("task");
  let run = engine.run_to_completion().unwrap();
  let cycle_starts = run.stages().iter().filter(|s| **s == CYCLE_START).count();
  assert_eq!(cycle_starts, 3);
  assert_eq!(run.steps.len(), 3 + 3 * 6 + 2);
  assert_eq!(engine.inspect_state().unwrap().cycle_count, 3);
  let report = engine.get_performance_report();
  assert_eq!(report.cycles.len(), 4);
}

#[test]
fn decision_alternates_and_lands_in_context() {
  let engine = engine(2, None);
  engine.start("task");
  let run = engine.run_to_completion().unwrap();
  let decisions: Vec<&str> = run
    .steps
    .iter()
    .filter(|s| s.stage == DECISION)
    .map(|s| s.context_after["decision"].as_str().unwrap())
    .collect();
  assert_eq!(decisions, vec!["explore", "refine"]);
  assert_eq!(
    run.steps.iter().find(|s| s.stage == DECISION).unwrap().executor_tag,
    "decision_maker"
  );
}

#[test]
fn breakpoint_on_decision_in_second_cycle() {
  let engine = engine(3, None);
  engine
    .add_breakpoint(DECISION, Some("cycle_count == 2 and decision == \"refine\""), None)
    .unwrap();
  engine
    .add_breakpoint(DECISION, Some("cycle_count == 2"), None)
    .unwrap();
  engine.start("task");
  let run = engine.run_until_breakpoint().unwrap();
  match run.stop {
    StopReason::Paused { breakpoint_id, stage } => {
      assert_eq!(breakpoint_id, "bp_2");
      assert_eq!(stage, DECISION);
    }
    other => panic!("expected pause, got {other:?}"),
  }
  let state = engine.inspect_state().unwrap();
  assert_eq!(state.cycle_count, 2);
}

#[test]
fn injected_failure_routes_to_finalize() {
  let engine = engine(2, Some("value_evaluation"));
  engine.start("task");
  let run = engine.run_to_completion().unwrap();
  let failed = run.steps.last().unwrap();
  assert_eq!(failed.stage, "value_evaluation");
  assert_eq!(failed.executor_tag, "fault_injector");
  assert_eq!(failed.next_stage.as_ref().unwrap(), FINALIZE);
  assert!(matches!(run.stop, StopReason::Failed { .. }));
  assert!(matches!(failed.output, StepPayload::Error(_)));
}
