//! Breakpoint registry with hit counting and fail-open condition checks.

use tracing::{debug, instrument, warn};

use crate::condition::{VariableSource, evaluate_condition};
use crate::error::BreakpointError;
use crate::types::{Breakpoint, StageId};

/// Ordered set of breakpoints, unique by id.
#[derive(Debug, Clone, Default)]
pub struct BreakpointManager {
  breakpoints: Vec<Breakpoint>,
  next_id: u64,
}

impl BreakpointManager {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `bp` as given. Rejects an id that is already present.
  pub fn add(&mut self, bp: Breakpoint) -> Result<String, BreakpointError> {
    if self.get(&bp.id).is_some() {
      return Err(BreakpointError::DuplicateId(bp.id));
    }
    let id = bp.id.clone();
    debug!(id = %id, stage = %bp.stage, condition = ?bp.condition, "breakpoint added");
    self.breakpoints.push(bp);
    Ok(id)
  }

  /// Registers a new enabled breakpoint under a generated `bp_<n>` id.
  pub fn create(
    &mut self,
    stage: StageId,
    condition: Option<String>,
    description: Option<String>,
  ) -> String {
    let id = loop {
      self.next_id += 1;
      let candidate = format!("bp_{}", self.next_id);
      if self.get(&candidate).is_none() {
        break candidate;
      }
    };
    let mut bp = Breakpoint::new(id.clone(), stage);
    bp.condition = condition;
    bp.description = description.unwrap_or_default();
    debug!(id = %id, stage = %bp.stage, condition = ?bp.condition, "breakpoint added");
    self.breakpoints.push(bp);
    id
  }

  pub fn remove(&mut self, id: &str) -> bool {
    let before = self.breakpoints.len();
    self.breakpoints.retain(|b| b.id != id);
    let removed = self.breakpoints.len() != before;
    if removed {
      debug!(id, "breakpoint removed");
    }
    removed
  }

  pub fn enable(&mut self, id: &str) -> bool {
    self.set_enabled(id, true)
  }

  pub fn disable(&mut self, id: &str) -> bool {
    self.set_enabled(id, false)
  }

  fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
    match self.breakpoints.iter_mut().find(|b| b.id == id) {
      Some(bp) => {
        bp.enabled = enabled;
        debug!(id, enabled, "breakpoint toggled");
        true
      }
      None => false,
    }
  }

  pub fn get(&self, id: &str) -> Option<&Breakpoint> {
    self.breakpoints.iter().find(|b| b.id == id)
  }

  /// Breakpoints in insertion order.
  pub fn list(&self) -> &[Breakpoint] {
    &self.breakpoints
  }

  pub fn len(&self) -> usize {
    self.breakpoints.len()
  }

  pub fn is_empty(&self) -> bool {
    self.breakpoints.is_empty()
  }

  pub fn clear(&mut self) {
    self.breakpoints.clear();
  }

  /// Returns the first enabled breakpoint on `stage` whose condition holds,
  /// after incrementing its hit count.
  ///
  /// A condition that fails to parse or evaluate is logged and counts as not matched.
  #[instrument(level = "trace", skip(self, vars))]
  pub fn check(&mut self, stage: &StageId, vars: &dyn VariableSource) -> Option<Breakpoint> {
    let bp = self.breakpoints.iter_mut().find(|bp| {
      if !bp.enabled || bp.stage != *stage {
        return false;
      }
      let Some(cond) = bp.condition.as_deref() else {
        return true;
      };
      match evaluate_condition(cond, vars) {
        Ok(hit) => hit,
        Err(e) => {
          warn!(id = %bp.id, condition = cond, error = %e, "breakpoint condition failed; ignoring");
          false
        }
      }
    })?;
    bp.hit_count += 1;
    Some(bp.clone())
  }
}
