//! Error types for the step engine and its collaborators.

use thiserror::Error;

use crate::types::StageId;

/// Errors reported synchronously by [crate::StepEngine] operations.
///
/// A rejected operation leaves the engine state unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
  /// A step was requested after the session reached a terminal state.
  #[error("debug session finished")]
  SessionFinished,
  /// A step or inspection was requested before `start`.
  #[error("debug session not started")]
  NotStarted,
  /// The run was restarted or reset while a stage handler was executing; its step was discarded.
  #[error("run replaced while a stage handler was executing")]
  RunReplaced,
  /// `step_back(n)` with `n == 0` or `n` larger than the recorded history.
  #[error("invalid rewind: requested {requested} step(s), {available} available")]
  InvalidRewind { requested: usize, available: usize },
  /// A stage name outside the registry's closed set.
  #[error("unknown stage: {0}")]
  UnknownStage(String),
  /// A non-terminal stage has no registered handler.
  #[error("missing handler for non-terminal stage: {0}")]
  MissingHandler(StageId),
  #[error(transparent)]
  Registry(#[from] RegistryError),
  #[error(transparent)]
  Breakpoint(#[from] BreakpointError),
  #[error(transparent)]
  Serialization(#[from] SerializationError),
}

/// Construction-time errors for [crate::StageRegistry].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
  #[error("stage registry declares no stages")]
  Empty,
  #[error("stage declared twice: {0}")]
  DuplicateStage(String),
  #[error("stage {stage} has undeclared successor {successor}")]
  UnknownSuccessor { stage: String, successor: String },
  #[error("{role} stage is not declared: {stage}")]
  UnknownRole { role: &'static str, stage: String },
  #[error("completed stage {0} must be terminal")]
  CompletedHasSuccessor(String),
}

/// Errors from the breakpoint registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakpointError {
  #[error("breakpoint id already registered: {0}")]
  DuplicateId(String),
}

/// Parse or evaluation failure of a breakpoint condition.
///
/// Never stops the run loop: the breakpoint is treated as not matched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
  #[error("unexpected character {ch:?} at offset {offset}")]
  UnexpectedChar { ch: char, offset: usize },
  #[error("unterminated string starting at offset {offset}")]
  UnterminatedString { offset: usize },
  #[error("unexpected token {found} at offset {offset}")]
  UnexpectedToken { found: String, offset: usize },
  #[error("unexpected end of expression")]
  UnexpectedEnd,
  #[error("unknown variable: {0}")]
  UnknownVariable(String),
  #[error("cannot apply {op} to {left} and {right}")]
  TypeMismatch {
    op: &'static str,
    left: &'static str,
    right: &'static str,
  },
  #[error("variable {name} holds an unsupported value ({kind})")]
  UnsupportedValue { name: String, kind: &'static str },
  #[error("condition nests deeper than {max} levels")]
  TooDeep { max: usize },
}

/// Failure writing or reading a session record.
#[derive(Debug, Error)]
pub enum SerializationError {
  #[error("session I/O failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("session encoding failed: {0}")]
  Json(#[from] serde_json::Error),
  #[error("unsupported session format version {found} (expected {expected})")]
  UnsupportedVersion { found: u32, expected: u32 },
}

/// The bounded stage context refused a new key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
  #[error("stage context is full ({capacity} entries)")]
  ContextFull { capacity: usize },
}

/// Failure reported by a stage handler.
///
/// Captured verbatim into the step record; it ends the run but never
/// surfaces as an [EngineError].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StageError {
  pub message: String,
  pub executor_tag: Option<String>,
}

impl StageError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      executor_tag: None,
    }
  }

  pub fn with_executor_tag(mut self, tag: impl Into<String>) -> Self {
    self.executor_tag = Some(tag.into());
    self
  }
}

impl From<ContextError> for StageError {
  fn from(e: ContextError) -> Self {
    StageError::new(e.to_string())
  }
}

/// Invalid engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("reading config failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("parsing config failed: {0}")]
  Json(#[from] serde_json::Error),
  #[error("config field {0} must be greater than zero")]
  Zero(&'static str),
}
