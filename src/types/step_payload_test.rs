//! Tests for `StepPayload`.

use serde_json::json;

use super::StepPayload;

#[test]
fn default_is_empty() {
  assert_eq!(StepPayload::default(), StepPayload::Empty);
  assert_eq!(StepPayload::default().size(), 0);
}

#[test]
fn record_keeps_field_order() {
  let p = StepPayload::record([("zeta", json!(1)), ("alpha", json!("x"))]);
  let keys: Vec<_> = p.as_record().unwrap().keys().cloned().collect();
  assert_eq!(keys, vec!["zeta", "alpha"]);
  assert_eq!(p.size(), 2);
}

#[test]
fn serializes_with_kind_tag() {
  let v = serde_json::to_value(StepPayload::text("hi")).unwrap();
  assert_eq!(v, json!({"kind": "text", "value": "hi"}));
  let v = serde_json::to_value(StepPayload::Error("boom".into())).unwrap();
  assert_eq!(v["kind"], "error");
}

#[test]
fn accessors_match_variant() {
  let t = StepPayload::from("abc");
  assert_eq!(t.as_text(), Some("abc"));
  assert!(t.as_record().is_none());
  assert!(!t.is_error());
  assert!(StepPayload::Error("x".into()).is_error());
  assert_eq!(StepPayload::Error("x".into()).kind(), "error");
}
