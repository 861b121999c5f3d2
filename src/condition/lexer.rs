//! Tokenizer for breakpoint conditions.

use crate::error::ConditionError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
  Number(f64),
  Str(String),
  Ident(String),
  True,
  False,
  And,
  Or,
  Not,
  In,
  Contains,
  Eq,
  Ne,
  Lt,
  Gt,
  Le,
  Ge,
  LParen,
  RParen,
}

impl Token {
  pub(crate) fn describe(&self) -> String {
    match self {
      Token::Number(n) => n.to_string(),
      Token::Str(s) => format!("{s:?}"),
      Token::Ident(s) => s.clone(),
      Token::True => "true".into(),
      Token::False => "false".into(),
      Token::And => "and".into(),
      Token::Or => "or".into(),
      Token::Not => "not".into(),
      Token::In => "in".into(),
      Token::Contains => "contains".into(),
      Token::Eq => "==".into(),
      Token::Ne => "!=".into(),
      Token::Lt => "<".into(),
      Token::Gt => ">".into(),
      Token::Le => "<=".into(),
      Token::Ge => ">=".into(),
      Token::LParen => "(".into(),
      Token::RParen => ")".into(),
    }
  }
}

/// A token and the byte offset where it starts.
pub(crate) type Spanned = (usize, Token);

/// Splits a condition into tokens. Identifiers may contain `_` and `.`.
pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, ConditionError> {
  let bytes = src.as_bytes();
  let mut tokens = Vec::new();
  let mut i = 0;
  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }
    let start = i;
    match c {
      b'(' => {
        tokens.push((start, Token::LParen));
        i += 1;
      }
      b')' => {
        tokens.push((start, Token::RParen));
        i += 1;
      }
      b'=' | b'!' | b'<' | b'>' => {
        let followed_by_eq = bytes.get(i + 1) == Some(&b'=');
        let tok = match (c, followed_by_eq) {
          (b'=', true) => Token::Eq,
          (b'!', true) => Token::Ne,
          (b'<', true) => Token::Le,
          (b'>', true) => Token::Ge,
          (b'<', false) => Token::Lt,
          (b'>', false) => Token::Gt,
          _ => {
            return Err(ConditionError::UnexpectedChar {
              ch: c as char,
              offset: start,
            });
          }
        };
        i += if followed_by_eq { 2 } else { 1 };
        tokens.push((start, tok));
      }
      b'"' | b'\'' => {
        let (s, next) = read_string(src, start)?;
        tokens.push((start, Token::Str(s)));
        i = next;
      }
      b'-' | b'0'..=b'9' => {
        let end = scan_number(bytes, i);
        let text = &src[start..end];
        let n = text
          .parse::<f64>()
          .map_err(|_| ConditionError::UnexpectedChar {
            ch: c as char,
            offset: start,
          })?;
        tokens.push((start, Token::Number(n)));
        i = end;
      }
      c if c.is_ascii_alphabetic() || c == b'_' => {
        let end = bytes[i..]
          .iter()
          .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_' || *b == b'.'))
          .map(|p| i + p)
          .unwrap_or(bytes.len());
        tokens.push((start, keyword_or_ident(&src[start..end])));
        i = end;
      }
      _ => {
        let ch = src[start..].chars().next().unwrap_or('?');
        return Err(ConditionError::UnexpectedChar { ch, offset: start });
      }
    }
  }
  Ok(tokens)
}

fn keyword_or_ident(word: &str) -> Token {
  match word {
    "and" => Token::And,
    "or" => Token::Or,
    "not" => Token::Not,
    "in" => Token::In,
    "contains" => Token::Contains,
    "true" => Token::True,
    "false" => Token::False,
    _ => Token::Ident(word.to_string()),
  }
}

/// Returns the end offset of a number starting at `i` (optional `-`, digits, one `.`).
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
  if bytes[i] == b'-' {
    i += 1;
  }
  let mut seen_dot = false;
  while i < bytes.len() {
    match bytes[i] {
      b'0'..=b'9' => i += 1,
      b'.' if !seen_dot => {
        seen_dot = true;
        i += 1;
      }
      _ => break,
    }
  }
  i
}

/// Reads a quoted string starting at `start`; supports `\"`, `\'`, `\\`, `\n`, `\t`.
/// Returns the unescaped contents and the offset after the closing quote.
fn read_string(src: &str, start: usize) -> Result<(String, usize), ConditionError> {
  let mut chars = src[start..].char_indices();
  let (_, quote) = chars.next().ok_or(ConditionError::UnexpectedEnd)?;
  let mut out = String::new();
  while let Some((off, ch)) = chars.next() {
    match ch {
      '\\' => {
        let (_, esc) = chars
          .next()
          .ok_or(ConditionError::UnterminatedString { offset: start })?;
        out.push(match esc {
          'n' => '\n',
          't' => '\t',
          other => other,
        });
      }
      c if c == quote => return Ok((out, start + off + c.len_utf8())),
      c => out.push(c),
    }
  }
  Err(ConditionError::UnterminatedString { offset: start })
}
