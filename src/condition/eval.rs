//! Evaluation of a parsed condition against named variables.

use std::cmp::Ordering;

use crate::error::ConditionError;

use super::parser::{CompareOp, Expr};
use super::{Value, VariableSource};

/// Evaluates `expr` and reduces the result to a boolean via truthiness.
pub fn evaluate(expr: &Expr, vars: &dyn VariableSource) -> Result<bool, ConditionError> {
  Ok(eval_value(expr, vars)?.truthy())
}

fn eval_value(expr: &Expr, vars: &dyn VariableSource) -> Result<Value, ConditionError> {
  match expr {
    Expr::Literal(v) => Ok(v.clone()),
    Expr::Var(name) => vars.resolve(name),
    Expr::Not(inner) => Ok(Value::Bool(!evaluate(inner, vars)?)),
    // and/or short-circuit: the right side is not evaluated (and cannot fail) when decided.
    Expr::And(l, r) => Ok(Value::Bool(evaluate(l, vars)? && evaluate(r, vars)?)),
    Expr::Or(l, r) => Ok(Value::Bool(evaluate(l, vars)? || evaluate(r, vars)?)),
    Expr::Compare { op, left, right } => {
      let l = eval_value(left, vars)?;
      let r = eval_value(right, vars)?;
      compare(*op, &l, &r).map(Value::Bool)
    }
  }
}

fn compare(op: CompareOp, l: &Value, r: &Value) -> Result<bool, ConditionError> {
  let mismatch = || ConditionError::TypeMismatch {
    op: op.symbol(),
    left: l.type_name(),
    right: r.type_name(),
  };
  match op {
    CompareOp::Eq => Ok(l == r),
    CompareOp::Ne => Ok(l != r),
    CompareOp::In | CompareOp::Contains => {
      let (needle, haystack) = if op == CompareOp::In { (l, r) } else { (r, l) };
      match (needle, haystack) {
        (Value::Str(n), Value::Str(h)) => Ok(h.contains(n.as_str())),
        _ => Err(mismatch()),
      }
    }
    CompareOp::Lt | CompareOp::Gt | CompareOp::Le | CompareOp::Ge => {
      let ord = match (l, r) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).ok_or_else(mismatch)?,
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => return Err(mismatch()),
      };
      Ok(match op {
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Le => ord != Ordering::Greater,
        _ => ord != Ordering::Less,
      })
    }
  }
}
