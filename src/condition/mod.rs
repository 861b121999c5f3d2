//! Restricted boolean expressions for breakpoint conditions.
//!
//! Grammar (keywords are lowercase):
//!
//! ```text
//! expr    := or
//! or      := and ( "or" and )*
//! and     := unary ( "and" unary )*
//! unary   := "not" unary | compare
//! compare := operand ( ("==" | "!=" | "<" | ">" | "<=" | ">=" | "in" | "contains") operand )?
//! operand := NUMBER | STRING | "true" | "false" | IDENT | "(" expr ")"
//! ```
//!
//! Only named variables are readable; nothing can call back into host code.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::error::ConditionError;
use crate::types::{StageId, StepContext};

mod eval;
mod lexer;
#[cfg(test)]
mod lexer_test;
mod parser;

pub use eval::evaluate;
pub use parser::{CompareOp, Expr, MAX_DEPTH, parse};

/// Runtime value inside a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Bool(bool),
  Number(f64),
  Str(String),
}

impl Value {
  /// `false`, `0` and `""` are false; everything else is true.
  pub fn truthy(&self) -> bool {
    match self {
      Value::Bool(b) => *b,
      Value::Number(n) => *n != 0.0,
      Value::Str(s) => !s.is_empty(),
    }
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Bool(_) => "bool",
      Value::Number(_) => "number",
      Value::Str(_) => "string",
    }
  }

  /// Converts a context JSON value; null, arrays and objects are unsupported.
  pub fn from_json(name: &str, v: &JsonValue) -> Result<Self, ConditionError> {
    match v {
      JsonValue::Bool(b) => Ok(Value::Bool(*b)),
      JsonValue::Number(n) => n.as_f64().map(Value::Number).ok_or_else(|| {
        ConditionError::UnsupportedValue {
          name: name.to_string(),
          kind: "number",
        }
      }),
      JsonValue::String(s) => Ok(Value::Str(s.clone())),
      JsonValue::Null => Err(ConditionError::UnsupportedValue {
        name: name.to_string(),
        kind: "null",
      }),
      JsonValue::Array(_) => Err(ConditionError::UnsupportedValue {
        name: name.to_string(),
        kind: "array",
      }),
      JsonValue::Object(_) => Err(ConditionError::UnsupportedValue {
        name: name.to_string(),
        kind: "object",
      }),
    }
  }
}

/// Source of named variables for evaluation.
pub trait VariableSource {
  fn resolve(&self, name: &str) -> Result<Value, ConditionError>;
}

impl VariableSource for HashMap<String, Value> {
  fn resolve(&self, name: &str) -> Result<Value, ConditionError> {
    self
      .get(name)
      .cloned()
      .ok_or_else(|| ConditionError::UnknownVariable(name.to_string()))
  }
}

/// Variables visible to a breakpoint: `cycle_count`, `stage` (alias `current_stage`),
/// `step_count`, then every key of the step context.
#[derive(Debug, Clone, Copy)]
pub struct StageVariables<'a> {
  pub stage: &'a StageId,
  pub cycle_count: u64,
  pub step_count: usize,
  pub context: &'a StepContext,
}

impl VariableSource for StageVariables<'_> {
  fn resolve(&self, name: &str) -> Result<Value, ConditionError> {
    match name {
      "cycle_count" => Ok(Value::Number(self.cycle_count as f64)),
      "stage" | "current_stage" => Ok(Value::Str(self.stage.to_string())),
      "step_count" => Ok(Value::Number(self.step_count as f64)),
      _ => self
        .context
        .get(name)
        .ok_or_else(|| ConditionError::UnknownVariable(name.to_string()))
        .and_then(|v| Value::from_json(name, v)),
    }
  }
}

/// A parsed condition together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
  source: String,
  expr: Expr,
}

impl Condition {
  pub fn parse(source: &str) -> Result<Self, ConditionError> {
    Ok(Self {
      source: source.to_string(),
      expr: parse(source)?,
    })
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn expr(&self) -> &Expr {
    &self.expr
  }

  pub fn evaluate(&self, vars: &dyn VariableSource) -> Result<bool, ConditionError> {
    evaluate(&self.expr, vars)
  }
}

/// Parses and evaluates `source` in one go.
pub fn evaluate_condition(source: &str, vars: &dyn VariableSource) -> Result<bool, ConditionError> {
  Condition::parse(source)?.evaluate(vars)
}
