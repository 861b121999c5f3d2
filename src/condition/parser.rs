//! Recursive-descent parser producing the condition AST.

use crate::error::ConditionError;

use super::Value;
use super::lexer::{Spanned, Token, tokenize};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
  Eq,
  Ne,
  Lt,
  Gt,
  Le,
  Ge,
  /// `needle in haystack`
  In,
  /// `haystack contains needle`
  Contains,
}

impl CompareOp {
  pub fn symbol(self) -> &'static str {
    match self {
      CompareOp::Eq => "==",
      CompareOp::Ne => "!=",
      CompareOp::Lt => "<",
      CompareOp::Gt => ">",
      CompareOp::Le => "<=",
      CompareOp::Ge => ">=",
      CompareOp::In => "in",
      CompareOp::Contains => "contains",
    }
  }
}

/// Condition AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Literal(Value),
  Var(String),
  Not(Box<Expr>),
  And(Box<Expr>, Box<Expr>),
  Or(Box<Expr>, Box<Expr>),
  Compare {
    op: CompareOp,
    left: Box<Expr>,
    right: Box<Expr>,
  },
}

/// Deepest nesting accepted, counting both `not`/parentheses and the height
/// of `and`/`or` chains.
pub const MAX_DEPTH: usize = 64;

/// Parsed subtree with its height.
type Node = (Expr, usize);

/// Parses a full condition; trailing tokens are an error.
pub fn parse(src: &str) -> Result<Expr, ConditionError> {
  let tokens = tokenize(src)?;
  let mut p = Parser {
    tokens,
    pos: 0,
    depth: 0,
  };
  let (expr, _) = p.parse_or()?;
  match p.tokens.get(p.pos) {
    None => Ok(expr),
    Some((offset, tok)) => Err(ConditionError::UnexpectedToken {
      found: tok.describe(),
      offset: *offset,
    }),
  }
}

fn bounded(expr: Expr, height: usize) -> Result<Node, ConditionError> {
  if height > MAX_DEPTH {
    return Err(ConditionError::TooDeep { max: MAX_DEPTH });
  }
  Ok((expr, height))
}

struct Parser {
  tokens: Vec<Spanned>,
  pos: usize,
  /// Current recursion depth through `not` and parentheses.
  depth: usize,
}

impl Parser {
  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos).map(|(_, t)| t)
  }

  fn next(&mut self) -> Result<Spanned, ConditionError> {
    let tok = self
      .tokens
      .get(self.pos)
      .cloned()
      .ok_or(ConditionError::UnexpectedEnd)?;
    self.pos += 1;
    Ok(tok)
  }

  fn descend(&mut self) -> Result<(), ConditionError> {
    if self.depth >= MAX_DEPTH {
      return Err(ConditionError::TooDeep { max: MAX_DEPTH });
    }
    self.depth += 1;
    Ok(())
  }

  fn parse_or(&mut self) -> Result<Node, ConditionError> {
    let (mut left, mut height) = self.parse_and()?;
    while self.peek() == Some(&Token::Or) {
      self.pos += 1;
      let (right, rh) = self.parse_and()?;
      (left, height) = bounded(Expr::Or(Box::new(left), Box::new(right)), height.max(rh) + 1)?;
    }
    Ok((left, height))
  }

  fn parse_and(&mut self) -> Result<Node, ConditionError> {
    let (mut left, mut height) = self.parse_unary()?;
    while self.peek() == Some(&Token::And) {
      self.pos += 1;
      let (right, rh) = self.parse_unary()?;
      (left, height) = bounded(Expr::And(Box::new(left), Box::new(right)), height.max(rh) + 1)?;
    }
    Ok((left, height))
  }

  fn parse_unary(&mut self) -> Result<Node, ConditionError> {
    if self.peek() == Some(&Token::Not) {
      self.pos += 1;
      self.descend()?;
      let (inner, height) = self.parse_unary()?;
      self.depth -= 1;
      return bounded(Expr::Not(Box::new(inner)), height + 1);
    }
    self.parse_compare()
  }

  fn parse_compare(&mut self) -> Result<Node, ConditionError> {
    let (left, lh) = self.parse_operand()?;
    let op = match self.peek() {
      Some(Token::Eq) => CompareOp::Eq,
      Some(Token::Ne) => CompareOp::Ne,
      Some(Token::Lt) => CompareOp::Lt,
      Some(Token::Gt) => CompareOp::Gt,
      Some(Token::Le) => CompareOp::Le,
      Some(Token::Ge) => CompareOp::Ge,
      Some(Token::In) => CompareOp::In,
      Some(Token::Contains) => CompareOp::Contains,
      _ => return Ok((left, lh)),
    };
    self.pos += 1;
    let (right, rh) = self.parse_operand()?;
    bounded(
      Expr::Compare {
        op,
        left: Box::new(left),
        right: Box::new(right),
      },
      lh.max(rh) + 1,
    )
  }

  fn parse_operand(&mut self) -> Result<Node, ConditionError> {
    let (offset, tok) = self.next()?;
    match tok {
      Token::Number(n) => Ok((Expr::Literal(Value::Number(n)), 1)),
      Token::Str(s) => Ok((Expr::Literal(Value::Str(s)), 1)),
      Token::True => Ok((Expr::Literal(Value::Bool(true)), 1)),
      Token::False => Ok((Expr::Literal(Value::Bool(false)), 1)),
      Token::Ident(name) => Ok((Expr::Var(name), 1)),
      Token::LParen => {
        self.descend()?;
        let inner = self.parse_or()?;
        self.depth -= 1;
        match self.next()? {
          (_, Token::RParen) => Ok(inner),
          (offset, other) => Err(ConditionError::UnexpectedToken {
            found: other.describe(),
            offset,
          }),
        }
      }
      other => Err(ConditionError::UnexpectedToken {
        found: other.describe(),
        offset,
      }),
    }
  }
}
