//! # streamweave-stepper
//!
//! Single-step, breakpoint-capable execution engine for fixed-topology
//! multi-stage workflows.
//!
//! ## Architecture
//!
//! A [StageRegistry] declares the closed set of stages and their default
//! successors. A [StepEngine] runs one stage per call: it checks breakpoints,
//! invokes the [StageHandler] registered for the stage, picks the next stage
//! and records a [StepResult] in the [HistoryStore]. History can be rewound,
//! analyzed with the [PerformanceAnalyzer] and exported as a versioned JSON
//! session record (see `session_io`).
//!
//! The `workflow` module carries the 12-stage reference workflow driven by the
//! `step_debug` binary.

pub mod breakpoints;
#[cfg(test)]
mod breakpoints_test;
pub mod condition;
pub mod config;
#[cfg(test)]
mod config_test;
pub mod engine;
pub mod error;
pub mod handler;
pub mod history;
pub mod monitor;
pub mod performance;
pub mod session_io;
pub mod stage_registry;
pub mod types;
pub mod workflow;
#[cfg(test)]
mod workflow_test;

pub use breakpoints::BreakpointManager;
pub use condition::{Condition, StageVariables, VariableSource, evaluate_condition};
pub use config::EngineConfig;
pub use engine::{RunSummary, StepEngine, StepOutcome, StopReason};
pub use error::{
  BreakpointError, ConditionError, ConfigError, ContextError, EngineError, RegistryError,
  SerializationError, StageError,
};
pub use handler::{HandlerRegistry, StageContext, StageHandler, StageOutput};
pub use history::HistoryStore;
pub use monitor::EngineMonitor;
pub use performance::{PerformanceAnalyzer, PerformanceReport};
pub use session_io::SessionRecord;
pub use stage_registry::{StageRegistry, StageRegistryBuilder};
pub use types::{
  Breakpoint, DebugInfo, ExecutionState, Snapshot, StageId, StateSummary, StepContext,
  StepPayload, StepResult,
};
