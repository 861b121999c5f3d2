//! Timing statistics over an execution trace.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{StageId, StepResult};

/// A single step identified by id, stage and duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTiming {
  pub step_id: String,
  pub stage: String,
  pub duration: f64,
}

/// Aggregate durations of one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
  pub total: f64,
  pub count: usize,
  pub mean: f64,
}

/// Aggregate durations of one cycle. Cycle 0 holds the steps before the first boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleTiming {
  pub cycle: u64,
  pub total_duration: f64,
  pub step_count: usize,
}

/// Performance report over a trace. Durations are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
  pub step_count: usize,
  pub total_duration: f64,
  pub mean_duration: f64,
  pub min_duration: f64,
  pub max_duration: f64,
  pub fastest: Option<StepTiming>,
  pub slowest: Option<StepTiming>,
  /// Per-stage totals, ordered by first appearance in the trace.
  pub per_stage: IndexMap<String, StageTiming>,
  pub cycles: Vec<CycleTiming>,
}

/// Computes [PerformanceReport]s, partitioning cycles at the boundary stage.
#[derive(Debug, Clone, Default)]
pub struct PerformanceAnalyzer {
  cycle_boundary: Option<StageId>,
}

impl PerformanceAnalyzer {
  pub fn new(cycle_boundary: Option<StageId>) -> Self {
    Self { cycle_boundary }
  }

  /// Analyzes `trace`; an empty trace yields the zero report.
  pub fn analyze(&self, trace: &[StepResult]) -> PerformanceReport {
    if trace.is_empty() {
      return PerformanceReport::default();
    }

    let mut report = PerformanceReport {
      step_count: trace.len(),
      ..PerformanceReport::default()
    };
    let mut fastest = &trace[0];
    let mut slowest = &trace[0];

    for step in trace {
      report.total_duration += step.duration;
      if step.duration < fastest.duration {
        fastest = step;
      }
      if step.duration > slowest.duration {
        slowest = step;
      }

      let stage = report
        .per_stage
        .entry(step.stage.to_string())
        .or_default();
      stage.total += step.duration;
      stage.count += 1;

      let starts_cycle = self.cycle_boundary.as_ref() == Some(&step.stage);
      if starts_cycle {
        let next = report.cycles.last().map_or(1, |c| c.cycle + 1);
        report.cycles.push(CycleTiming {
          cycle: next,
          total_duration: 0.0,
          step_count: 0,
        });
      } else if report.cycles.is_empty() {
        report.cycles.push(CycleTiming {
          cycle: 0,
          total_duration: 0.0,
          step_count: 0,
        });
      }
      if let Some(cycle) = report.cycles.last_mut() {
        cycle.total_duration += step.duration;
        cycle.step_count += 1;
      }
    }

    for timing in report.per_stage.values_mut() {
      timing.mean = timing.total / timing.count as f64;
    }
    report.mean_duration = report.total_duration / trace.len() as f64;
    report.min_duration = fastest.duration;
    report.max_duration = slowest.duration;
    report.fastest = Some(timing_of(fastest));
    report.slowest = Some(timing_of(slowest));
    report
  }
}

fn timing_of(step: &StepResult) -> StepTiming {
  StepTiming {
    step_id: step.step_id.clone(),
    stage: step.stage.to_string(),
    duration: step.duration,
  }
}
