//! Periodic partial capture of execution progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StageId;

/// Cheap progress capture taken every few steps; not a full state copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  pub timestamp: DateTime<Utc>,
  pub stage: StageId,
  pub cycle_count: u64,
  pub step_count: usize,
  pub finished: bool,
}
