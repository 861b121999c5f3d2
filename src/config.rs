//! Engine configuration: defaults, JSON file loading, environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::error::ConfigError;

/// Env var overriding [EngineConfig::snapshot_interval].
pub const ENV_SNAPSHOT_INTERVAL: &str = "STEPWEAVE_SNAPSHOT_INTERVAL";
/// Env var overriding [EngineConfig::max_snapshots].
pub const ENV_MAX_SNAPSHOTS: &str = "STEPWEAVE_MAX_SNAPSHOTS";
/// Env var overriding [EngineConfig::max_context_entries].
pub const ENV_MAX_CONTEXT_ENTRIES: &str = "STEPWEAVE_MAX_CONTEXT_ENTRIES";
/// Env var overriding [EngineConfig::max_steps_per_run].
pub const ENV_MAX_STEPS: &str = "STEPWEAVE_MAX_STEPS";

/// Tunables for a [crate::StepEngine].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// A snapshot is recorded every `snapshot_interval` appended steps.
  pub snapshot_interval: usize,
  /// Capacity of the snapshot ring; the oldest snapshot is dropped beyond it.
  pub max_snapshots: usize,
  /// Maximum number of keys in the stage context.
  pub max_context_entries: usize,
  /// Upper bound on steps taken by `run_until_breakpoint`/`run_to_completion`.
  pub max_steps_per_run: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      snapshot_interval: 5,
      max_snapshots: 20,
      max_context_entries: 256,
      max_steps_per_run: 1000,
    }
  }
}

impl EngineConfig {
  /// Loads a JSON config file; missing fields take their defaults.
  #[instrument(level = "trace", skip(path))]
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let bytes = std::fs::read(path)?;
    let config: EngineConfig = serde_json::from_slice(&bytes)?;
    config.validate()?;
    Ok(config)
  }

  /// Applies `STEPWEAVE_*` environment overrides. Unparsable values are logged and ignored.
  pub fn with_env_overrides(self) -> Self {
    self.with_overrides_from(|key| std::env::var(key).ok())
  }

  pub(crate) fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
    let fields: [(&str, &mut usize); 4] = [
      (ENV_SNAPSHOT_INTERVAL, &mut self.snapshot_interval),
      (ENV_MAX_SNAPSHOTS, &mut self.max_snapshots),
      (ENV_MAX_CONTEXT_ENTRIES, &mut self.max_context_entries),
      (ENV_MAX_STEPS, &mut self.max_steps_per_run),
    ];
    for (key, field) in fields {
      let Some(raw) = lookup(key) else { continue };
      match raw.trim().parse::<usize>() {
        Ok(v) if v > 0 => *field = v,
        _ => warn!(key, value = %raw, "ignoring invalid config override"),
      }
    }
    self
  }

  /// Rejects zero-valued limits.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.snapshot_interval == 0 {
      return Err(ConfigError::Zero("snapshot_interval"));
    }
    if self.max_snapshots == 0 {
      return Err(ConfigError::Zero("max_snapshots"));
    }
    if self.max_context_entries == 0 {
      return Err(ConfigError::Zero("max_context_entries"));
    }
    if self.max_steps_per_run == 0 {
      return Err(ConfigError::Zero("max_steps_per_run"));
    }
    Ok(())
  }
}
