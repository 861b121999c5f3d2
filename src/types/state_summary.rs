//! Read-only view of an execution state for inspection.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::StageId;

/// Projection of [super::ExecutionState] returned by `inspect_state`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSummary {
  pub current_stage: StageId,
  pub cycle_count: u64,
  pub finished: bool,
  pub start_time: DateTime<Utc>,
  pub step_count: usize,
  pub snapshot_count: usize,
  /// True while the engine sits on a breakpoint it has already reported.
  pub paused: bool,
  pub last_step_id: Option<String>,
  pub last_error: Option<String>,
  pub context_keys: Vec<String>,
}
