//! Versioned JSON session records: export, import, save and load.
//!
//! A record is a read-only transcript of a run. Importing one never rebuilds
//! live engine state.

use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::error::SerializationError;
use crate::performance::PerformanceReport;
use crate::types::{Breakpoint, DebugInfo, ExecutionState, StepResult};

/// Format version written by [export_session] and required by [import_session].
pub const SESSION_FORMAT_VERSION: u32 = 1;

/// Default filename for a session record under a run directory.
pub const SESSION_FILENAME: &str = "debug_session.json";

/// Position of the run at export time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugStateRecord {
  pub current_step: String,
  pub cycle_count: u64,
  pub is_finished: bool,
  pub start_time: DateTime<Utc>,
}

/// One executed step as exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
  pub step_type: String,
  pub step_id: String,
  pub timestamp: DateTime<Utc>,
  /// Seconds.
  pub execution_time: f64,
  pub executor_tag: String,
  pub next_step: Option<String>,
  pub debug_info: DebugInfo,
  pub error: Option<String>,
}

impl From<&StepResult> for StepRecord {
  fn from(step: &StepResult) -> Self {
    Self {
      step_type: step.stage.to_string(),
      step_id: step.step_id.clone(),
      timestamp: step.timestamp,
      execution_time: step.duration,
      executor_tag: step.executor_tag.clone(),
      next_step: step.next_stage.as_ref().map(ToString::to_string),
      debug_info: step.debug_info.clone(),
      error: step.error.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointRecord {
  pub id: String,
  pub step_type: String,
  pub condition: Option<String>,
  pub hit_count: u64,
  pub enabled: bool,
  pub description: String,
}

impl From<&Breakpoint> for BreakpointRecord {
  fn from(bp: &Breakpoint) -> Self {
    Self {
      id: bp.id.clone(),
      step_type: bp.stage.to_string(),
      condition: bp.condition.clone(),
      hit_count: bp.hit_count,
      enabled: bp.enabled,
      description: bp.description.clone(),
    }
  }
}

/// Exported debugging session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
  pub version: u32,
  pub timestamp: DateTime<Utc>,
  pub debug_state: DebugStateRecord,
  pub step_history: Vec<StepRecord>,
  pub performance_metrics: PerformanceReport,
  pub breakpoints: Vec<BreakpointRecord>,
}

impl SessionRecord {
  /// Captures `state` and `breakpoints` as of now.
  pub fn capture(
    state: &ExecutionState,
    breakpoints: &[Breakpoint],
    performance_metrics: PerformanceReport,
  ) -> Self {
    Self {
      version: SESSION_FORMAT_VERSION,
      timestamp: Utc::now(),
      debug_state: DebugStateRecord {
        current_step: state.current_stage.to_string(),
        cycle_count: state.cycle_count,
        is_finished: state.finished,
        start_time: state.start_time,
      },
      step_history: state.history.entries().iter().map(StepRecord::from).collect(),
      performance_metrics,
      breakpoints: breakpoints.iter().map(BreakpointRecord::from).collect(),
    }
  }
}

/// Writes `record` as pretty-printed JSON.
#[instrument(level = "trace", skip(record, sink))]
pub fn export_session<W: Write>(record: &SessionRecord, mut sink: W) -> Result<(), SerializationError> {
  serde_json::to_writer_pretty(&mut sink, record)?;
  sink.flush()?;
  Ok(())
}

/// Reads a record, rejecting any format version other than [SESSION_FORMAT_VERSION].
#[instrument(level = "trace", skip(source))]
pub fn import_session<R: Read>(source: R) -> Result<SessionRecord, SerializationError> {
  let raw: Value = serde_json::from_reader(source)?;
  let found = raw.get("version").and_then(Value::as_u64).unwrap_or(0);
  if found != u64::from(SESSION_FORMAT_VERSION) {
    return Err(SerializationError::UnsupportedVersion {
      found: u32::try_from(found).unwrap_or(u32::MAX),
      expected: SESSION_FORMAT_VERSION,
    });
  }
  Ok(serde_json::from_value(raw)?)
}

/// Saves `record` to `path`, creating the parent directory if needed.
#[instrument(level = "trace", skip(path, record))]
pub fn save_session(path: &Path, record: &SessionRecord) -> Result<(), SerializationError> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  let file = std::fs::File::create(path)?;
  export_session(record, std::io::BufWriter::new(file))
}

/// Loads a record from `path`.
#[instrument(level = "trace", skip(path))]
pub fn load_session(path: &Path) -> Result<SessionRecord, SerializationError> {
  let file = std::fs::File::open(path)?;
  import_session(std::io::BufReader::new(file))
}
