//! Stage handlers and the per-step context they read and write.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ContextError, StageError};
use crate::types::{DebugInfo, StageId, StepContext, StepPayload};

/// Bounded key/value store handed to a handler for one step.
///
/// Starts as a copy of the run's context; the engine keeps whatever the handler
/// leaves in it, even when the handler fails.
#[derive(Debug, Clone)]
pub struct StageContext {
  values: StepContext,
  capacity: usize,
  stage: StageId,
  cycle_count: u64,
  step_count: usize,
}

impl StageContext {
  pub fn new(
    values: StepContext,
    capacity: usize,
    stage: StageId,
    cycle_count: u64,
    step_count: usize,
  ) -> Self {
    Self {
      values,
      capacity,
      stage,
      cycle_count,
      step_count,
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.values.get(key).and_then(Value::as_str)
  }

  /// Sets `key`, returning the previous value. New keys fail once `capacity` is reached.
  pub fn insert(
    &mut self,
    key: impl Into<String>,
    value: impl Into<Value>,
  ) -> Result<Option<Value>, ContextError> {
    let key = key.into();
    if !self.values.contains_key(&key) && self.values.len() >= self.capacity {
      return Err(ContextError::ContextFull {
        capacity: self.capacity,
      });
    }
    Ok(self.values.insert(key, value.into()))
  }

  pub fn remove(&mut self, key: &str) -> Option<Value> {
    self.values.shift_remove(key)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.values.iter()
  }

  /// Stage being executed.
  pub fn stage(&self) -> &StageId {
    &self.stage
  }

  pub fn cycle_count(&self) -> u64 {
    self.cycle_count
  }

  /// Steps recorded before this one.
  pub fn step_count(&self) -> usize {
    self.step_count
  }

  pub(crate) fn into_values(self) -> StepContext {
    self.values
  }
}

/// What a handler returns for one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutput {
  pub output: StepPayload,
  /// Overrides the registry successor when set.
  pub next_stage: Option<StageId>,
  /// Who produced the output; the stage name when empty.
  pub executor_tag: String,
  pub debug_info: DebugInfo,
  /// Soft failure: the step is recorded as failed and the run routes to finalize.
  pub error: Option<String>,
}

impl StageOutput {
  pub fn new(output: impl Into<StepPayload>) -> Self {
    Self {
      output: output.into(),
      ..Self::default()
    }
  }

  pub fn with_next_stage(mut self, stage: impl Into<StageId>) -> Self {
    self.next_stage = Some(stage.into());
    self
  }

  pub fn with_executor_tag(mut self, tag: impl Into<String>) -> Self {
    self.executor_tag = tag.into();
    self
  }

  pub fn with_debug(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.debug_info.insert(key.into(), value.into());
    self
  }

  pub fn with_error(mut self, error: impl Into<String>) -> Self {
    self.error = Some(error.into());
    self
  }
}

/// Executes one stage.
pub trait StageHandler: Send + Sync {
  fn handle(&self, input: &StepPayload, ctx: &mut StageContext) -> Result<StageOutput, StageError>;
}

impl<F> StageHandler for F
where
  F: Fn(&StepPayload, &mut StageContext) -> Result<StageOutput, StageError> + Send + Sync,
{
  fn handle(&self, input: &StepPayload, ctx: &mut StageContext) -> Result<StageOutput, StageError> {
    self(input, ctx)
  }
}

/// Handlers keyed by stage.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
  handlers: HashMap<StageId, Arc<dyn StageHandler>>,
}

impl HandlerRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers (or replaces) a closure handler for `stage`.
  pub fn register<F>(&mut self, stage: impl Into<StageId>, f: F) -> &mut Self
  where
    F: Fn(&StepPayload, &mut StageContext) -> Result<StageOutput, StageError> + Send + Sync + 'static,
  {
    self.register_handler(stage, f)
  }

  /// Registers (or replaces) any [StageHandler] for `stage`.
  pub fn register_handler(
    &mut self,
    stage: impl Into<StageId>,
    handler: impl StageHandler + 'static,
  ) -> &mut Self {
    self.handlers.insert(stage.into(), Arc::new(handler));
    self
  }

  /// Builder-style [Self::register].
  pub fn with<F>(mut self, stage: impl Into<StageId>, f: F) -> Self
  where
    F: Fn(&StepPayload, &mut StageContext) -> Result<StageOutput, StageError> + Send + Sync + 'static,
  {
    self.register(stage, f);
    self
  }

  /// Builder-style [Self::register_handler].
  pub fn with_handler(
    mut self,
    stage: impl Into<StageId>,
    handler: impl StageHandler + 'static,
  ) -> Self {
    self.register_handler(stage, handler);
    self
  }

  pub fn get(&self, stage: &str) -> Option<Arc<dyn StageHandler>> {
    self.handlers.get(stage).cloned()
  }

  pub fn contains(&self, stage: &str) -> bool {
    self.handlers.contains_key(stage)
  }

  pub fn stages(&self) -> impl Iterator<Item = &StageId> {
    self.handlers.keys()
  }

  pub fn len(&self) -> usize {
    self.handlers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.handlers.is_empty()
  }
}

impl fmt::Debug for HandlerRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut stages: Vec<&str> = self.handlers.keys().map(StageId::as_str).collect();
    stages.sort_unstable();
    f.debug_struct("HandlerRegistry")
      .field("stages", &stages)
      .finish()
  }
}
