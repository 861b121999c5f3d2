//! Closed stage set with its default transition table and stage roles.

use indexmap::IndexMap;

use crate::error::RegistryError;
use crate::types::StageId;

/// Fixed set of stages, each with zero or one default successor.
///
/// Totality (every successor and role names a declared stage) is checked once
/// in [StageRegistryBuilder::build]; lookups never re-validate.
#[derive(Debug, Clone)]
pub struct StageRegistry {
  stages: IndexMap<StageId, Option<StageId>>,
  initial: StageId,
  cycle_boundary: Option<StageId>,
  finalize: Option<StageId>,
  completed: Option<StageId>,
}

impl StageRegistry {
  pub fn builder() -> StageRegistryBuilder {
    StageRegistryBuilder::default()
  }

  /// Default successor of `stage`; `None` for terminal or unknown stages.
  pub fn successor(&self, stage: &str) -> Option<StageId> {
    self.stages.get(stage).cloned().flatten()
  }

  pub fn contains(&self, stage: &str) -> bool {
    self.stages.contains_key(stage)
  }

  /// Maps a stage name to its declared id.
  pub fn resolve(&self, name: &str) -> Option<StageId> {
    self.stages.get_key_value(name).map(|(k, _)| k.clone())
  }

  pub fn is_terminal(&self, stage: &str) -> bool {
    matches!(self.stages.get(stage), Some(None))
  }

  /// Declared stages in declaration order.
  pub fn stages(&self) -> impl Iterator<Item = &StageId> {
    self.stages.keys()
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  pub fn initial(&self) -> &StageId {
    &self.initial
  }

  /// Stage whose entry starts a new cycle.
  pub fn cycle_boundary(&self) -> Option<&StageId> {
    self.cycle_boundary.as_ref()
  }

  /// Stage that handler errors are routed to.
  pub fn finalize(&self) -> Option<&StageId> {
    self.finalize.as_ref()
  }

  /// Success sentinel; entering it finishes the run.
  pub fn completed(&self) -> Option<&StageId> {
    self.completed.as_ref()
  }

  pub fn is_cycle_boundary(&self, stage: &str) -> bool {
    self.cycle_boundary.as_ref().is_some_and(|b| b == stage)
  }

  pub fn is_completed(&self, stage: &str) -> bool {
    self.completed.as_ref().is_some_and(|c| c == stage)
  }
}

/// Builder for [StageRegistry].
#[derive(Debug, Clone, Default)]
pub struct StageRegistryBuilder {
  stages: Vec<(String, Option<String>)>,
  initial: Option<String>,
  cycle_boundary: Option<String>,
  finalize: Option<String>,
  completed: Option<String>,
}

impl StageRegistryBuilder {
  /// Declares a stage with a default successor.
  pub fn stage(mut self, name: impl Into<String>, successor: impl Into<String>) -> Self {
    self.stages.push((name.into(), Some(successor.into())));
    self
  }

  /// Declares a stage with no successor.
  pub fn terminal(mut self, name: impl Into<String>) -> Self {
    self.stages.push((name.into(), None));
    self
  }

  /// Initial stage; defaults to the first declared stage.
  pub fn initial(mut self, name: impl Into<String>) -> Self {
    self.initial = Some(name.into());
    self
  }

  pub fn cycle_boundary(mut self, name: impl Into<String>) -> Self {
    self.cycle_boundary = Some(name.into());
    self
  }

  pub fn finalize(mut self, name: impl Into<String>) -> Self {
    self.finalize = Some(name.into());
    self
  }

  pub fn completed(mut self, name: impl Into<String>) -> Self {
    self.completed = Some(name.into());
    self
  }

  /// Validates the table and builds the registry.
  pub fn build(self) -> Result<StageRegistry, RegistryError> {
    let mut stages: IndexMap<StageId, Option<StageId>> = IndexMap::new();
    for (name, successor) in &self.stages {
      if stages.contains_key(name.as_str()) {
        return Err(RegistryError::DuplicateStage(name.clone()));
      }
      stages.insert(StageId::new(name.as_str()), successor.as_deref().map(StageId::new));
    }
    let first = stages.keys().next().cloned().ok_or(RegistryError::Empty)?;

    for (stage, successor) in &stages {
      if let Some(next) = successor {
        if !stages.contains_key(next.as_str()) {
          return Err(RegistryError::UnknownSuccessor {
            stage: stage.to_string(),
            successor: next.to_string(),
          });
        }
      }
    }

    let role = |role: &'static str, name: Option<String>| -> Result<Option<StageId>, RegistryError> {
      match name {
        None => Ok(None),
        Some(n) if stages.contains_key(n.as_str()) => Ok(Some(StageId::new(n))),
        Some(n) => Err(RegistryError::UnknownRole { role, stage: n }),
      }
    };
    let initial = role("initial", self.initial)?.unwrap_or(first);
    let cycle_boundary = role("cycle boundary", self.cycle_boundary)?;
    let finalize = role("finalize", self.finalize)?;
    let completed = role("completed", self.completed)?;

    if let Some(c) = &completed {
      if matches!(stages.get(c.as_str()), Some(Some(_))) {
        return Err(RegistryError::CompletedHasSuccessor(c.to_string()));
      }
    }

    Ok(StageRegistry {
      stages,
      initial,
      cycle_boundary,
      finalize,
      completed,
    })
  }
}
