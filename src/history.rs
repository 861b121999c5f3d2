//! Append-only step history with rewind and a bounded snapshot ring.

use std::collections::VecDeque;

use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::types::{Snapshot, StepResult};

/// Ordered log of executed steps plus periodic [Snapshot]s.
#[derive(Debug, Clone)]
pub struct HistoryStore {
  entries: Vec<StepResult>,
  snapshots: VecDeque<Snapshot>,
  snapshot_interval: usize,
  max_snapshots: usize,
  /// Total appends since creation; rewind does not reset it.
  appends: u64,
}

impl HistoryStore {
  pub fn new(snapshot_interval: usize, max_snapshots: usize) -> Self {
    Self {
      entries: Vec::new(),
      snapshots: VecDeque::with_capacity(max_snapshots),
      snapshot_interval: snapshot_interval.max(1),
      max_snapshots: max_snapshots.max(1),
      appends: 0,
    }
  }

  pub fn from_config(config: &EngineConfig) -> Self {
    Self::new(config.snapshot_interval, config.max_snapshots)
  }

  /// Appends a step. Returns true when a snapshot is due (every `snapshot_interval` appends).
  pub fn append(&mut self, entry: StepResult) -> bool {
    self.entries.push(entry);
    self.appends += 1;
    self.appends % self.snapshot_interval as u64 == 0
  }

  /// Pushes a snapshot, dropping the oldest beyond capacity.
  pub fn record_snapshot(&mut self, snapshot: Snapshot) {
    if self.snapshots.len() == self.max_snapshots {
      self.snapshots.pop_front();
    }
    debug!(step_count = snapshot.step_count, stage = %snapshot.stage, "snapshot recorded");
    self.snapshots.push_back(snapshot);
  }

  /// Removes the last `n` entries. Fails without mutation if `n == 0` or `n > len`.
  ///
  /// Snapshots taken past the new end of history are discarded.
  #[instrument(level = "trace", skip(self))]
  pub fn rewind(&mut self, n: usize) -> Result<Vec<StepResult>, EngineError> {
    if n == 0 || n > self.entries.len() {
      return Err(EngineError::InvalidRewind {
        requested: n,
        available: self.entries.len(),
      });
    }
    let keep = self.entries.len() - n;
    let removed = self.entries.split_off(keep);
    self.snapshots.retain(|s| s.step_count <= keep);
    debug!(removed = n, remaining = keep, "history rewound");
    Ok(removed)
  }

  /// Most recent `limit` entries (or all), oldest first.
  pub fn get_trace(&self, limit: Option<usize>) -> &[StepResult] {
    let len = self.entries.len();
    let start = limit.map_or(0, |l| len.saturating_sub(l));
    &self.entries[start..]
  }

  pub fn entries(&self) -> &[StepResult] {
    &self.entries
  }

  pub fn last(&self) -> Option<&StepResult> {
    self.entries.last()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
    self.snapshots.iter()
  }

  pub fn snapshot_count(&self) -> usize {
    self.snapshots.len()
  }
}
