//! Engine data model: stages, payloads, step records, breakpoints, snapshots.

use indexmap::IndexMap;

mod breakpoint;
mod debug_info;
mod execution_state;
mod snapshot;
mod stage_id;
mod state_summary;
mod step_payload;
#[cfg(test)]
mod step_payload_test;
mod step_result;

pub use breakpoint::Breakpoint;
pub use debug_info::{DebugInfo, keys as debug_keys};
pub use execution_state::ExecutionState;
pub use snapshot::Snapshot;
pub use stage_id::StageId;
pub use state_summary::StateSummary;
pub use step_payload::StepPayload;
pub use step_result::StepResult;

/// Key-value context shared by handlers and breakpoint conditions, in insertion order.
pub type StepContext = IndexMap<String, serde_json::Value>;
