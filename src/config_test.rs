//! Tests for `EngineConfig`.

use std::collections::HashMap;

use crate::config::{ENV_MAX_SNAPSHOTS, ENV_MAX_STEPS, ENV_SNAPSHOT_INTERVAL, EngineConfig};
use crate::error::ConfigError;

#[test]
fn defaults() {
  let c = EngineConfig::default();
  assert_eq!(c.snapshot_interval, 5);
  assert_eq!(c.max_snapshots, 20);
  assert_eq!(c.max_context_entries, 256);
  assert_eq!(c.max_steps_per_run, 1000);
  assert!(c.validate().is_ok());
}

#[test]
fn overrides_apply_and_bad_values_are_ignored() {
  let env: HashMap<&str, &str> = [
    (ENV_SNAPSHOT_INTERVAL, "3"),
    (ENV_MAX_SNAPSHOTS, "not-a-number"),
    (ENV_MAX_STEPS, "0"),
  ]
  .into_iter()
  .collect();
  let c = EngineConfig::default().with_overrides_from(|k| env.get(k).map(|v| v.to_string()));
  assert_eq!(c.snapshot_interval, 3);
  assert_eq!(c.max_snapshots, 20);
  assert_eq!(c.max_steps_per_run, 1000);
}

#[test]
fn load_partial_file_fills_defaults() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("engine.json");
  std::fs::write(&path, r#"{"max_snapshots": 4}"#).unwrap();
  let c = EngineConfig::load(&path).unwrap();
  assert_eq!(c.max_snapshots, 4);
  assert_eq!(c.snapshot_interval, 5);
}

#[test]
fn load_rejects_zero_limit() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("engine.json");
  std::fs::write(&path, r#"{"snapshot_interval": 0}"#).unwrap();
  let err = EngineConfig::load(&path).unwrap_err();
  assert!(matches!(err, ConfigError::Zero("snapshot_interval")));
}

#[test]
fn load_missing_file_returns_error() {
  let dir = tempfile::tempdir().unwrap();
  let r = EngineConfig::load(&dir.path().join("nope.json"));
  assert!(matches!(r, Err(ConfigError::Io(_))));
}
