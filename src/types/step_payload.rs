//! Input/output value passed between stages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input or output of one stage, tagged by logical category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StepPayload {
  /// No value (e.g. a run started without input).
  #[default]
  Empty,
  Text(String),
  /// Structured record; key order is preserved.
  Record(Map<String, Value>),
  /// Error description produced by a failed stage.
  Error(String),
}

impl StepPayload {
  pub fn text(s: impl Into<String>) -> Self {
    StepPayload::Text(s.into())
  }

  /// Builds a record from `(key, value)` pairs, keeping their order.
  pub fn record<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
  where
    K: Into<String>,
    V: Into<Value>,
  {
    StepPayload::Record(
      fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    )
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      StepPayload::Text(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_record(&self) -> Option<&Map<String, Value>> {
    match self {
      StepPayload::Record(m) => Some(m),
      _ => None,
    }
  }

  pub fn is_error(&self) -> bool {
    matches!(self, StepPayload::Error(_))
  }

  /// Rough size used for the `input_size`/`output_size` debug keys:
  /// characters for text and errors, fields for records.
  pub fn size(&self) -> usize {
    match self {
      StepPayload::Empty => 0,
      StepPayload::Text(s) | StepPayload::Error(s) => s.chars().count(),
      StepPayload::Record(m) => m.len(),
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      StepPayload::Empty => "empty",
      StepPayload::Text(_) => "text",
      StepPayload::Record(_) => "record",
      StepPayload::Error(_) => "error",
    }
  }
}

impl From<&str> for StepPayload {
  fn from(s: &str) -> Self {
    StepPayload::Text(s.to_string())
  }
}

impl From<String> for StepPayload {
  fn from(s: String) -> Self {
    StepPayload::Text(s)
  }
}
