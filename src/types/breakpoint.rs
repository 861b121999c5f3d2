//! Breakpoint definition.

use serde::{Deserialize, Serialize};

use super::StageId;

/// A (stage, optional condition) pair that pauses stepping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
  pub id: String,
  pub stage: StageId,
  /// Boolean expression over `cycle_count`, `stage`, `step_count` and context keys.
  pub condition: Option<String>,
  pub enabled: bool,
  pub hit_count: u64,
  pub description: String,
}

impl Breakpoint {
  /// Enabled, unconditional breakpoint with no hits.
  pub fn new(id: impl Into<String>, stage: impl Into<StageId>) -> Self {
    Self {
      id: id.into(),
      stage: stage.into(),
      condition: None,
      enabled: true,
      hit_count: 0,
      description: String::new(),
    }
  }

  pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
    self.condition = Some(condition.into());
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }
}
