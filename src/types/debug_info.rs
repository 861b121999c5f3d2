//! Per-step debug information.
//!
//! An ordered, open map. Handlers may add any key; the well-known keys in
//! [keys] are the ones the engine and the bundled workflow fill in.

use indexmap::IndexMap;
use serde_json::Value;

/// Ordered string-keyed debug map attached to every step record.
pub type DebugInfo = IndexMap<String, Value>;

/// Well-known optional debug keys.
pub mod keys {
  /// Size of the step input (characters or record fields). Set by the engine.
  pub const INPUT_SIZE: &str = "input_size";
  /// Size of the step output. Set by the engine.
  pub const OUTPUT_SIZE: &str = "output_size";
  /// Cycle number the step ran in. Set by the engine.
  pub const CYCLE: &str = "cycle";
  /// Choice made by a decision-like stage.
  pub const DECISION: &str = "decision";
  /// Confidence score in `[0, 1]` reported by a stage.
  pub const CONFIDENCE: &str = "confidence";
  /// Free-form explanation of the step's result.
  pub const REASON: &str = "reason";
  /// Retries a stage performed internally.
  pub const RETRIES: &str = "retries";
}
