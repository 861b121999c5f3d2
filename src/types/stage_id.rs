//! Identifier of one workflow stage.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one workflow stage, drawn from a [crate::StageRegistry]'s closed set.
///
/// Serialized as the bare stage name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(String);

impl StageId {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for StageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(&self.0)
  }
}

impl Borrow<str> for StageId {
  fn borrow(&self) -> &str {
    &self.0
  }
}

impl AsRef<str> for StageId {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl From<&str> for StageId {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

impl From<String> for StageId {
  fn from(s: String) -> Self {
    Self(s)
  }
}

impl From<&StageId> for StageId {
  fn from(s: &StageId) -> Self {
    s.clone()
  }
}

impl PartialEq<str> for StageId {
  fn eq(&self, other: &str) -> bool {
    self.0 == other
  }
}

impl PartialEq<&str> for StageId {
  fn eq(&self, other: &&str) -> bool {
    self.0 == *other
  }
}
