//! Tests for `BreakpointManager`.

use serde_json::json;

use crate::breakpoints::BreakpointManager;
use crate::condition::StageVariables;
use crate::error::BreakpointError;
use crate::types::{Breakpoint, StageId, StepContext};

fn vars<'a>(stage: &'a StageId, cycle: u64, ctx: &'a StepContext) -> StageVariables<'a> {
  StageVariables {
    stage,
    cycle_count: cycle,
    step_count: 0,
    context: ctx,
  }
}

#[test]
fn create_generates_unique_ids() {
  let mut m = BreakpointManager::new();
  let a = m.create(StageId::new("a"), None, None);
  let b = m.create(StageId::new("a"), None, Some("second".into()));
  assert_eq!(a, "bp_1");
  assert_eq!(b, "bp_2");
  assert_eq!(m.get("bp_2").unwrap().description, "second");
}

#[test]
fn create_skips_ids_taken_by_add() {
  let mut m = BreakpointManager::new();
  m.add(Breakpoint::new("bp_1", "a")).unwrap();
  assert_eq!(m.create(StageId::new("a"), None, None), "bp_2");
}

#[test]
fn add_rejects_duplicate_id() {
  let mut m = BreakpointManager::new();
  m.add(Breakpoint::new("x", "a")).unwrap();
  assert_eq!(
    m.add(Breakpoint::new("x", "b")).unwrap_err(),
    BreakpointError::DuplicateId("x".to_string())
  );
  assert_eq!(m.len(), 1);
}

#[test]
fn remove_and_toggle_report_presence() {
  let mut m = BreakpointManager::new();
  let id = m.create(StageId::new("a"), None, None);
  assert!(m.disable(&id));
  assert!(!m.get(&id).unwrap().enabled);
  assert!(m.enable(&id));
  assert!(m.get(&id).unwrap().enabled);
  assert!(m.remove(&id));
  assert!(!m.remove(&id));
  assert!(!m.enable(&id));
  assert!(m.is_empty());
}

#[test]
fn unconditional_match_increments_hit_count() {
  let mut m = BreakpointManager::new();
  let id = m.create(StageId::new("b"), None, None);
  let ctx = StepContext::new();
  let stage_a = StageId::new("a");
  let stage_b = StageId::new("b");
  assert!(m.check(&stage_a, &vars(&stage_a, 0, &ctx)).is_none());
  let hit = m.check(&stage_b, &vars(&stage_b, 0, &ctx)).unwrap();
  assert_eq!(hit.id, id);
  assert_eq!(hit.hit_count, 1);
  assert_eq!(m.get(&id).unwrap().hit_count, 1);
}

#[test]
fn only_first_match_is_reported_in_insertion_order() {
  let mut m = BreakpointManager::new();
  let first = m.create(StageId::new("s"), Some("cycle_count >= 1".into()), None);
  let second = m.create(StageId::new("s"), None, None);
  let ctx = StepContext::new();
  let s = StageId::new("s");

  let hit = m.check(&s, &vars(&s, 0, &ctx)).unwrap();
  assert_eq!(hit.id, second);

  let hit = m.check(&s, &vars(&s, 1, &ctx)).unwrap();
  assert_eq!(hit.id, first);
  assert_eq!(m.get(&first).unwrap().hit_count, 1);
  assert_eq!(m.get(&second).unwrap().hit_count, 1);
}

#[test]
fn disabled_breakpoint_never_matches() {
  let mut m = BreakpointManager::new();
  let id = m.create(StageId::new("s"), Some("true".into()), None);
  m.disable(&id);
  let ctx = StepContext::new();
  let s = StageId::new("s");
  assert!(m.check(&s, &vars(&s, 9, &ctx)).is_none());
  assert_eq!(m.get(&id).unwrap().hit_count, 0);
}

#[test]
fn broken_condition_fails_open() {
  let mut m = BreakpointManager::new();
  let broken = m.create(StageId::new("s"), Some("cycle_count >".into()), None);
  let unknown = m.create(StageId::new("s"), Some("nope == 1".into()), None);
  let ctx = StepContext::new();
  let s = StageId::new("s");
  assert!(m.check(&s, &vars(&s, 1, &ctx)).is_none());
  assert_eq!(m.get(&broken).unwrap().hit_count, 0);
  assert_eq!(m.get(&unknown).unwrap().hit_count, 0);
}

#[test]
fn condition_reads_context_keys() {
  let mut m = BreakpointManager::new();
  m.create(StageId::new("s"), Some("decision == 'retry'".into()), None);
  let mut ctx = StepContext::new();
  ctx.insert("decision".into(), json!("continue"));
  let s = StageId::new("s");
  assert!(m.check(&s, &vars(&s, 0, &ctx)).is_none());
  ctx.insert("decision".into(), json!("retry"));
  assert!(m.check(&s, &vars(&s, 0, &ctx)).is_some());
}

#[test]
fn overly_nested_condition_fails_open() {
  let mut m = BreakpointManager::new();
  let deep = format!("{}true", "not ".repeat(200_000));
  let id = m.create(StageId::new("s"), Some(deep), None);
  let ctx = StepContext::new();
  let s = StageId::new("s");
  assert!(m.check(&s, &vars(&s, 1, &ctx)).is_none());
  assert_eq!(m.get(&id).unwrap().hit_count, 0);
}
