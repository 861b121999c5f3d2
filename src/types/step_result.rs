//! Immutable record of one executed stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DebugInfo, StageId, StepContext, StepPayload};

/// One recorded step in the execution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
  /// Stage that was executed.
  pub stage: StageId,
  /// Unique id of this step (UUID v4).
  pub step_id: String,
  /// When the handler was invoked.
  pub timestamp: DateTime<Utc>,
  pub input: StepPayload,
  pub output: StepPayload,
  /// Handler wall-clock time in seconds.
  pub duration: f64,
  /// Logical actor that produced the output (e.g. "analyzer", "supervisor").
  pub executor_tag: String,
  /// Stage selected to run next; `None` after a terminal stage.
  pub next_stage: Option<StageId>,
  pub debug_info: DebugInfo,
  /// Handler error, captured verbatim.
  pub error: Option<String>,
  /// Stage context after the handler ran; restored on rewind.
  pub context_after: StepContext,
}

impl StepResult {
  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }
}
