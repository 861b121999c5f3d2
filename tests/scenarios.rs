//! End-to-end stepping scenarios through the public API.

use streamweave_stepper::{
  EngineConfig, EngineError, HandlerRegistry, StageContext, StageError, StageOutput, StageRegistry,
  StepEngine, StepOutcome, StepPayload, StopReason,
};

fn echo(input: &StepPayload, ctx: &mut StageContext) -> Result<StageOutput, StageError> {
  let text = format!("{}|{}", input.as_text().unwrap_or_default(), ctx.stage());
  Ok(StageOutput::new(text))
}

/// A → B → C with C terminal.
fn linear() -> StepEngine {
  let registry = StageRegistry::builder()
    .stage("A", "B")
    .stage("B", "C")
    .terminal("C")
    .build()
    .unwrap();
  let handlers = HandlerRegistry::new()
    .with("A", echo)
    .with("B", echo)
    .with("C", echo);
  StepEngine::new(registry, handlers, EngineConfig::default()).unwrap()
}

/// start → tick → tock → tick ... until the fifth cycle, then done.
fn cyclic() -> StepEngine {
  let registry = StageRegistry::builder()
    .stage("start", "tick")
    .stage("tick", "tock")
    .stage("tock", "done")
    .terminal("done")
    .cycle_boundary("tick")
    .completed("done")
    .build()
    .unwrap();
  let handlers = HandlerRegistry::new()
    .with("start", echo)
    .with("tick", echo)
    .with("tock", |input: &StepPayload, ctx: &mut StageContext| {
      let out = echo(input, ctx)?;
      Ok(if ctx.cycle_count() < 5 {
        out.with_next_stage("tick")
      } else {
        out
      })
    });
  StepEngine::new(registry, handlers, EngineConfig::default()).unwrap()
}

#[test]
fn scenario_linear_run_to_completion() {
  let engine = linear();
  engine.start("go");
  let run = engine.run_to_completion().unwrap();
  assert_eq!(run.stages(), vec!["A", "B", "C"]);
  assert_eq!(run.stop, StopReason::Completed);
  assert_eq!(run.steps[2].output, StepPayload::text("go|A|B|C"));
  assert!(engine.inspect_state().unwrap().finished);
}

#[test]
fn scenario_breakpoint_then_remove() {
  let engine = linear();
  let id = engine.add_breakpoint("B", None, None).unwrap();
  engine.start("go");

  let first = engine.run_until_breakpoint().unwrap();
  assert_eq!(first.stages(), vec!["A"]);
  let state = engine.inspect_state().unwrap();
  assert_eq!(state.current_stage, "B");
  assert!(!state.finished);

  assert!(engine.remove_breakpoint(&id));
  let rest = engine.run_to_completion().unwrap();
  assert_eq!(rest.stages(), vec!["B", "C"]);
}

#[test]
fn scenario_conditional_breakpoint_on_third_cycle() {
  let engine = cyclic();
  engine.add_breakpoint("tock", Some("cycle_count > 2"), None).unwrap();
  engine.start("go");
  let run = engine.run_until_breakpoint().unwrap();
  let tocks = run.stages().iter().filter(|s| **s == "tock").count();
  assert_eq!(tocks, 2);
  let bps = engine.list_breakpoints();
  assert_eq!(bps[0].hit_count, 1);
  let state = engine.inspect_state().unwrap();
  assert_eq!(state.current_stage, "tock");
  assert_eq!(state.cycle_count, 3);
}

#[test]
fn finished_session_rejects_further_steps() {
  let engine = linear();
  engine.start("go");
  engine.run_to_completion().unwrap();
  let trace_before = engine.get_trace(None);
  let state_before = engine.inspect_state().unwrap();
  assert!(matches!(engine.run_one_step(), Err(EngineError::SessionFinished)));
  assert_eq!(engine.get_trace(None), trace_before);
  let state_after = engine.inspect_state().unwrap();
  assert_eq!(state_after.current_stage, state_before.current_stage);
  assert_eq!(state_after.cycle_count, state_before.cycle_count);
}

#[test]
fn paused_reach_invokes_no_handler_and_appends_nothing() {
  let engine = linear();
  engine.add_breakpoint("A", None, None).unwrap();
  engine.start("go");
  match engine.run_one_step().unwrap() {
    StepOutcome::Paused(bp) => assert_eq!(bp.hit_count, 1),
    StepOutcome::Executed(r) => panic!("ran {}", r.stage),
  }
  assert!(engine.get_trace(None).is_empty());
  match engine.run_one_step().unwrap() {
    StepOutcome::Executed(r) => assert_eq!(r.stage, "A"),
    StepOutcome::Paused(_) => panic!("paused twice on one reach"),
  }
}

#[test]
fn breakpoint_fires_again_on_next_reach() {
  let engine = cyclic();
  engine.add_breakpoint("tick", None, None).unwrap();
  engine.start("go");
  let mut pauses = 0;
  loop {
    let run = engine.run_to_completion().unwrap();
    match run.stop {
      StopReason::Paused { .. } => pauses += 1,
      StopReason::Completed => break,
      other => panic!("unexpected stop {other:?}"),
    }
  }
  assert_eq!(pauses, 5);
  assert_eq!(engine.list_breakpoints()[0].hit_count, 5);
}

#[test]
fn disable_and_reenable_breakpoint() {
  let engine = cyclic();
  let id = engine.add_breakpoint("tock", None, None).unwrap();
  engine.start("go");
  assert!(matches!(
    engine.run_until_breakpoint().unwrap().stop,
    StopReason::Paused { .. }
  ));
  engine.disable_breakpoint(&id);
  let run = engine.run_to_completion().unwrap();
  assert_eq!(run.stop, StopReason::Completed);

  engine.enable_breakpoint(&id);
  engine.start("again");
  assert!(matches!(
    engine.run_to_completion().unwrap().stop,
    StopReason::Paused { .. }
  ));
}

#[test]
fn rewind_is_deterministic() {
  let engine = cyclic();
  engine.start("go");
  let full = engine.run_to_completion().unwrap();
  for n in [1, 4, full.steps.len()] {
    engine.step_back(n).unwrap();
    let replay = engine.run_to_completion().unwrap();
    let tail = &full.steps[full.steps.len() - n..];
    assert_eq!(replay.steps.len(), n);
    for (a, b) in tail.iter().zip(&replay.steps) {
      assert_eq!(a.stage, b.stage);
      assert_eq!(a.output, b.output);
    }
  }
  assert_eq!(engine.get_trace(None).len(), full.steps.len());
}

#[test]
fn export_import_round_trip() {
  let engine = cyclic();
  engine.add_breakpoint("tock", Some("cycle_count == 4"), Some("late")).unwrap();
  engine.add_breakpoint("start", None, None).unwrap();
  engine.start("go");
  while let StopReason::Paused { .. } = engine.run_to_completion().unwrap().stop {}

  let mut buf = Vec::new();
  engine.export_session(&mut buf).unwrap();
  let record = StepEngine::import_session(buf.as_slice()).unwrap();

  let trace = engine.get_trace(None);
  assert_eq!(record.step_history.len(), trace.len());
  for (rec, step) in record.step_history.iter().zip(&trace) {
    assert_eq!(rec.step_type, step.stage.as_str());
    assert_eq!(rec.step_id, step.step_id);
  }
  let bps = engine.list_breakpoints();
  assert_eq!(record.breakpoints.len(), bps.len());
  for (rec, bp) in record.breakpoints.iter().zip(&bps) {
    assert_eq!(rec.step_type, bp.stage.as_str());
    assert_eq!(rec.condition, bp.condition);
  }
  assert!(engine.inspect_state().unwrap().finished);
}
