//! Tests for the condition tokenizer.

use super::lexer::{Token, tokenize};
use crate::error::ConditionError;

fn kinds(src: &str) -> Vec<Token> {
  tokenize(src).unwrap().into_iter().map(|(_, t)| t).collect()
}

#[test]
fn operators_and_keywords() {
  assert_eq!(
    kinds("a == 1 and not b != 'x' or c <= -2.5"),
    vec![
      Token::Ident("a".into()),
      Token::Eq,
      Token::Number(1.0),
      Token::And,
      Token::Not,
      Token::Ident("b".into()),
      Token::Ne,
      Token::Str("x".into()),
      Token::Or,
      Token::Ident("c".into()),
      Token::Le,
      Token::Number(-2.5),
    ]
  );
}

#[test]
fn dotted_identifier_and_parens() {
  assert_eq!(
    kinds("(task.kind contains \"io\")"),
    vec![
      Token::LParen,
      Token::Ident("task.kind".into()),
      Token::Contains,
      Token::Str("io".into()),
      Token::RParen,
    ]
  );
}

#[test]
fn string_escapes() {
  assert_eq!(kinds(r#""a\"b\n""#), vec![Token::Str("a\"b\n".into())]);
}

#[test]
fn offsets_are_byte_positions() {
  let toks = tokenize("x >= 10").unwrap();
  let offsets: Vec<usize> = toks.iter().map(|(o, _)| *o).collect();
  assert_eq!(offsets, vec![0, 2, 5]);
}

#[test]
fn single_equals_is_rejected() {
  assert_eq!(
    tokenize("a = 1").unwrap_err(),
    ConditionError::UnexpectedChar { ch: '=', offset: 2 }
  );
}

#[test]
fn unterminated_string() {
  assert_eq!(
    tokenize("stage == 'dec").unwrap_err(),
    ConditionError::UnterminatedString { offset: 9 }
  );
}

#[test]
fn host_syntax_is_rejected() {
  assert!(matches!(
    tokenize("__import__('os').system('x'); 1").unwrap_err(),
    ConditionError::UnexpectedChar { ch: '.', .. }
  ));
  assert!(matches!(
    tokenize("a + b").unwrap_err(),
    ConditionError::UnexpectedChar { ch: '+', .. }
  ));
}
