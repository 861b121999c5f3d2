//! Property tests over random step / rewind / breakpoint sequences.

use proptest::prelude::*;
use streamweave_stepper::{
  EngineConfig, EngineError, HandlerRegistry, StageContext, StageError, StageOutput, StageRegistry,
  StepEngine, StepOutcome, StepPayload,
};

fn counter(input: &StepPayload, ctx: &mut StageContext) -> Result<StageOutput, StageError> {
  let n = input
    .as_record()
    .and_then(|r| r.get("n"))
    .and_then(|v| v.as_u64())
    .unwrap_or(0);
  ctx.insert("last", ctx.stage().as_str().to_string())?;
  Ok(StageOutput::new(StepPayload::record([("n", n + 1)])))
}

/// s0 → s1 → s2 → s1 ... for `cycles` cycles, then end.
fn engine(cycles: u64, snapshot_interval: usize) -> StepEngine {
  let registry = StageRegistry::builder()
    .stage("s0", "s1")
    .stage("s1", "s2")
    .stage("s2", "end")
    .terminal("end")
    .cycle_boundary("s1")
    .completed("end")
    .build()
    .unwrap();
  let handlers = HandlerRegistry::new()
    .with("s0", counter)
    .with("s1", counter)
    .with("s2", move |input: &StepPayload, ctx: &mut StageContext| {
      let out = counter(input, ctx)?;
      Ok(if ctx.cycle_count() < cycles {
        out.with_next_stage("s1")
      } else {
        out
      })
    });
  let config = EngineConfig {
    snapshot_interval,
    max_snapshots: 3,
    ..EngineConfig::default()
  };
  StepEngine::new(registry, handlers, config).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
  Step,
  Back(usize),
  ToggleBreakpoint,
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    6 => Just(Op::Step),
    2 => (1usize..4).prop_map(Op::Back),
    1 => Just(Op::ToggleBreakpoint),
  ]
}

proptest! {
  #[test]
  fn history_tracks_executed_steps(
    ops in prop::collection::vec(op(), 1..60),
    cycles in 1u64..5,
    interval in 1usize..4,
  ) {
    let engine = engine(cycles, interval);
    let bp = engine.add_breakpoint("s2", None, None).unwrap();
    let mut enabled = true;
    let mut expected_len = 0usize;
    engine.start("go");

    for op in ops {
      match op {
        Op::Step => match engine.run_one_step() {
          Ok(StepOutcome::Executed(_)) => expected_len += 1,
          Ok(StepOutcome::Paused(p)) => prop_assert_eq!(p.stage.as_str(), "s2"),
          Err(EngineError::SessionFinished) => {
            prop_assert!(engine.inspect_state().unwrap().finished);
          }
          Err(e) => prop_assert!(false, "unexpected error {e}"),
        },
        Op::Back(n) => match engine.step_back(n) {
          Ok(_) => expected_len -= n,
          Err(EngineError::InvalidRewind { requested, available }) => {
            prop_assert_eq!(requested, n);
            prop_assert_eq!(available, expected_len);
          }
          Err(e) => prop_assert!(false, "unexpected error {e}"),
        },
        Op::ToggleBreakpoint => {
          if enabled {
            engine.disable_breakpoint(&bp);
          } else {
            engine.enable_breakpoint(&bp);
          }
          enabled = !enabled;
        }
      }

      let trace = engine.get_trace(None);
      let state = engine.inspect_state().unwrap();
      prop_assert_eq!(trace.len(), expected_len);
      prop_assert_eq!(state.step_count, expected_len);
      let expected_stage = trace
        .last()
        .and_then(|s| s.next_stage.clone())
        .map_or_else(|| "s0".to_string(), |s| s.to_string());
      prop_assert_eq!(state.current_stage.as_str(), expected_stage.as_str());
      let snapshots = engine.monitor().snapshots();
      prop_assert!(snapshots.len() <= 3);
      prop_assert!(snapshots.iter().all(|s| s.step_count <= expected_len));
    }
  }

  #[test]
  fn rewind_and_replay_reproduce_the_run(cycles in 1u64..5, back in 1usize..12) {
    let engine = engine(cycles, 5);
    engine.start("go");
    let full = engine.run_to_completion().unwrap();
    let n = back.min(full.steps.len());
    engine.step_back(n).unwrap();
    let replay = engine.run_to_completion().unwrap();

    let tail = &full.steps[full.steps.len() - n..];
    prop_assert_eq!(replay.steps.len(), n);
    for (a, b) in tail.iter().zip(&replay.steps) {
      prop_assert_eq!(&a.stage, &b.stage);
      prop_assert_eq!(&a.input, &b.input);
      prop_assert_eq!(&a.output, &b.output);
      prop_assert_eq!(&a.next_stage, &b.next_stage);
      prop_assert_eq!(&a.context_after, &b.context_after);
    }
    prop_assert_eq!(engine.inspect_state().unwrap().cycle_count, cycles);
  }
}
