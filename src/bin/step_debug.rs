//! CLI: Step through the reference workflow with breakpoints, then export the session.
//!
//! Runs the 12-stage reference workflow with deterministic demonstration
//! handlers. Every breakpoint hit prints the paused state and resumes. A
//! monitor task polls the engine while it runs.
//!
//! Usage: `step_debug [OPTIONS]`
//! Example: step_debug --break decision:"cycle_count > 1" --max-cycles 3
//!
//! The session record is written to .stepweave/debug_session.json by default.
//! `step_debug --inspect <file>` prints an exported session instead of running.
//!
//! Set RUST_LOG=streamweave_stepper=trace for TRACE-level span enter/exit and events.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use streamweave_stepper::config::EngineConfig;
use streamweave_stepper::session_io::{self, SESSION_FILENAME, SessionRecord};
use streamweave_stepper::workflow::{DEFAULT_MAX_CYCLES, reference_handlers, reference_registry};
use streamweave_stepper::{EngineError, PerformanceReport, RunSummary, StepEngine, StopReason};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

const RUN_DIR: &str = ".stepweave";

/// Step through the reference workflow.
#[derive(Parser, Debug)]
#[command(name = "step_debug")]
#[command(
  after_help = r#"Environment variables (override the matching flags when set):
  STEPWEAVE_MAX_CYCLES           Reasoning cycles to run before post-supervision.
  STEPWEAVE_SNAPSHOT_INTERVAL    Steps between history snapshots (default 5).
  STEPWEAVE_MAX_SNAPSHOTS        Snapshot ring capacity (default 20).
  STEPWEAVE_MAX_CONTEXT_ENTRIES  Stage context capacity (default 256).
  STEPWEAVE_MAX_STEPS            Step budget per run call (default 1000).

Examples:
  step_debug --task "triage the inbox"
  step_debug --break cycle_end --break decision:"cycle_count == 2"
  step_debug --fail-at value_evaluation --export /tmp/failed.json
  step_debug --inspect .stepweave/debug_session.json"#
)]
struct Args {
  /// Task text handed to the init stage.
  #[arg(long, default_value = "demo task")]
  task: String,

  /// Breakpoint as STAGE or STAGE:CONDITION. Repeatable.
  #[arg(long = "break", value_name = "STAGE[:COND]")]
  breakpoints: Vec<String>,

  /// Reasoning cycles to run.
  #[arg(long, env = "STEPWEAVE_MAX_CYCLES", default_value_t = DEFAULT_MAX_CYCLES)]
  max_cycles: u64,

  /// Stage whose handler fails on purpose.
  #[arg(long, value_name = "STAGE")]
  fail_at: Option<String>,

  /// JSON engine config file.
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Where to write the session record.
  #[arg(long, value_name = "FILE", default_value_t = default_export_path())]
  export: String,

  /// Interval at which the monitor task polls the engine.
  #[arg(long, value_name = "MS", default_value_t = 25)]
  monitor_interval_ms: u64,

  /// Print an exported session record and exit.
  #[arg(long, value_name = "FILE")]
  inspect: Option<PathBuf>,
}

fn default_export_path() -> String {
  Path::new(RUN_DIR)
    .join(SESSION_FILENAME)
    .display()
    .to_string()
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .init();

  info!("step_debug starting");
  let args = Args::parse();

  if let Some(path) = &args.inspect {
    match session_io::load_session(path) {
      Ok(record) => {
        print_record(&record);
        return;
      }
      Err(e) => {
        eprintln!("Error reading session {}: {}", path.display(), e);
        process::exit(1);
      }
    }
  }

  let config = match &args.config {
    Some(path) => match EngineConfig::load(path) {
      Ok(c) => c,
      Err(e) => {
        eprintln!("Error loading config {}: {}", path.display(), e);
        process::exit(1);
      }
    },
    None => EngineConfig::default(),
  }
  .with_env_overrides();
  if let Err(e) = config.validate() {
    eprintln!("Invalid config: {}", e);
    process::exit(1);
  }
  info!(?config, max_cycles = args.max_cycles, fail_at = ?args.fail_at, "options (env or flags)");

  let engine = match build_engine(&args, config) {
    Ok(e) => Arc::new(e),
    Err(e) => {
      eprintln!("Error building engine: {}", e);
      process::exit(1);
    }
  };

  for bp_arg in &args.breakpoints {
    let (stage, condition) = match bp_arg.split_once(':') {
      Some((stage, cond)) => (stage, Some(cond)),
      None => (bp_arg.as_str(), None),
    };
    match engine.add_breakpoint(stage, condition, Some(bp_arg.as_str())) {
      Ok(id) => println!("Breakpoint {} set at {}", id, bp_arg),
      Err(e) => {
        eprintln!("Error setting breakpoint {}: {}", bp_arg, e);
        process::exit(1);
      }
    }
  }

  engine.start(args.task.as_str());

  let monitor = engine.monitor();
  let interval = Duration::from_millis(args.monitor_interval_ms.max(1));
  let monitor_task = tokio::spawn(async move {
    let mut ticker = tokio::time::interval(interval);
    loop {
      ticker.tick().await;
      match monitor.inspect_state() {
        Ok(s) if s.finished => break,
        Ok(s) => debug!(stage = %s.current_stage, steps = s.step_count, cycle = s.cycle_count, "monitor"),
        Err(_) => break,
      }
    }
  });

  let runner = Arc::clone(&engine);
  let outcome = tokio::task::spawn_blocking(move || drive(&runner)).await;
  monitor_task.abort();

  let last = match outcome {
    Ok(Ok(run)) => run,
    Ok(Err(e)) => {
      eprintln!("Engine error: {}", e);
      process::exit(1);
    }
    Err(e) => {
      eprintln!("Run task failed: {}", e);
      process::exit(1);
    }
  };

  let report = engine.get_performance_report();
  print_report(&report);

  let export_path = PathBuf::from(&args.export);
  let record = match engine.session_record() {
    Ok(r) => r,
    Err(e) => {
      eprintln!("Error capturing session: {}", e);
      process::exit(1);
    }
  };
  if let Err(e) = session_io::save_session(&export_path, &record) {
    eprintln!("Error writing {}: {}", export_path.display(), e);
    process::exit(1);
  }
  info!(path = %export_path.display(), steps = record.step_history.len(), "session exported");
  println!("Session written to {}", export_path.display());

  println!("Run {}.", last.stop);
  if !matches!(last.stop, StopReason::Completed) {
    process::exit(1);
  }
}

fn build_engine(args: &Args, config: EngineConfig) -> Result<StepEngine, EngineError> {
  let registry = reference_registry()?;
  let handlers = reference_handlers(args.max_cycles, args.fail_at.as_deref());
  StepEngine::new(registry, handlers, config)
}

/// Runs to the end, printing and resuming at every breakpoint.
fn drive(engine: &StepEngine) -> Result<RunSummary, EngineError> {
  loop {
    let run = engine.run_to_completion()?;
    for step in &run.steps {
      println!(
        "  {:<18} {:<16} {:>9.6}s{}",
        step.stage,
        step.executor_tag,
        step.duration,
        step
          .error
          .as_ref()
          .map(|e| format!("  error: {e}"))
          .unwrap_or_default()
      );
    }
    match &run.stop {
      StopReason::Paused { breakpoint_id, stage } => {
        let state = engine.inspect_state()?;
        println!(
          "Paused at {} by {} (cycle {}, {} steps, context keys: {:?})",
          stage, breakpoint_id, state.cycle_count, state.step_count, state.context_keys
        );
      }
      _ => return Ok(run),
    }
  }
}

fn print_report(report: &PerformanceReport) {
  println!("Performance:");
  println!("  Steps: {}", report.step_count);
  println!("  Total: {:.6}s  Mean: {:.6}s", report.total_duration, report.mean_duration);
  if let (Some(fast), Some(slow)) = (&report.fastest, &report.slowest) {
    println!("  Fastest: {} ({:.6}s)", fast.stage, fast.duration);
    println!("  Slowest: {} ({:.6}s)", slow.stage, slow.duration);
  }
  for (stage, timing) in &report.per_stage {
    println!(
      "  {:<18} x{:<3} total {:.6}s mean {:.6}s",
      stage, timing.count, timing.total, timing.mean
    );
  }
  for cycle in &report.cycles {
    println!(
      "  cycle {}: {} steps, {:.6}s",
      cycle.cycle, cycle.step_count, cycle.total_duration
    );
  }
}

fn print_record(record: &SessionRecord) {
  println!("Session exported at {}", record.timestamp.to_rfc3339());
  println!(
    "  Position: {} (cycle {}, finished: {})",
    record.debug_state.current_step, record.debug_state.cycle_count, record.debug_state.is_finished
  );
  println!("  Steps: {}", record.step_history.len());
  for step in &record.step_history {
    println!(
      "    {:<18} -> {:<18} {}",
      step.step_type,
      step.next_step.as_deref().unwrap_or("-"),
      step.error.as_deref().unwrap_or("")
    );
  }
  println!("  Breakpoints: {}", record.breakpoints.len());
  for bp in &record.breakpoints {
    println!(
      "    {} at {} hits={} enabled={} condition={}",
      bp.id,
      bp.step_type,
      bp.hit_count,
      bp.enabled,
      bp.condition.as_deref().unwrap_or("-")
    );
  }
  print_report(&record.performance_metrics);
}
