//! Splits query text into operator, relation and parameter tokens, nesting
//! parenthesized groups.

use std::fmt;

use super::ast::{BinaryOp, UnaryOp};
use crate::error::{RelalgError, Result};

/// Characters after which a unary parameter is still incomplete.
const PARAM_CONTINUATION: [char; 10] = ['=', '!', '<', '>', '+', '-', '*', '/', '%', ','];

/// Keywords after which a unary parameter is still incomplete.
const PARAM_CONTINUATION_WORDS: [&str; 3] = ["and", "or", "not"];

/// Lexical unit of a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Identifier naming a relation.
    Relation(String),
    /// Infix operator.
    Binary(BinaryOp),
    /// Prefix operator; always followed by a [`Token::Param`].
    Unary(UnaryOp),
    /// Raw parameter text of the preceding unary operator.
    Param(String),
    /// Tokens of a parenthesized group.
    Group(Vec<Token>),
    /// Text that is not part of the query language.
    Unknown(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Relation(name) => f.write_str(name),
            Token::Binary(op) => f.write_str(op.symbol()),
            Token::Unary(op) => f.write_str(op.symbol()),
            Token::Param(text) => f.write_str(text),
            Token::Group(tokens) => write!(f, "({})", render(tokens)),
            Token::Unknown(text) => f.write_str(text),
        }
    }
}

/// Space-separated rendering used in error messages.
pub fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tokenizes a whole query.
pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while let Some(ch) = text[pos..].chars().next() {
        if ch.is_whitespace() {
            pos += ch.len_utf8();
            continue;
        }
        match ch {
            '(' => {
                let close = matching_paren(text, pos)?;
                tokens.push(Token::Group(tokenize(&text[pos + 1..close])?));
                pos = close + 1;
            }
            ')' => {
                return Err(RelalgError::Tokenize(format!(
                    "unmatched ')' at offset {pos}"
                )))
            }
            _ => {
                if let Some(op) = UnaryOp::ALL.into_iter().find(|op| text[pos..].starts_with(op.symbol())) {
                    pos += op.symbol().len();
                    let end = operand_start(text, pos)?.unwrap_or(text.len());
                    tokens.push(Token::Unary(op));
                    tokens.push(Token::Param(text[pos..end].trim().to_owned()));
                    pos = end;
                } else if let Some((op, width)) = binary_at(&text[pos..]) {
                    tokens.push(Token::Binary(op));
                    pos += width;
                } else if ch.is_ascii_alphabetic() || ch == '_' {
                    let end = scan_while(text, pos, |c| c.is_ascii_alphanumeric() || c == '_');
                    tokens.push(Token::Relation(text[pos..end].to_owned()));
                    pos = end;
                } else {
                    let end = scan_while(text, pos, |c| {
                        !c.is_whitespace() && c != '(' && c != ')' && !c.is_ascii_alphanumeric()
                    });
                    tokens.push(Token::Unknown(text[pos..end].to_owned()));
                    pos = end;
                }
            }
        }
    }
    Ok(tokens)
}

/// Longest binary operator spelling at the start of `rest`.
fn binary_at(rest: &str) -> Option<(BinaryOp, usize)> {
    BinaryOp::ALL
        .into_iter()
        .flat_map(|op| {
            std::iter::once(op.symbol())
                .chain(op.legacy_symbol())
                .map(move |spelling| (op, spelling))
        })
        .filter(|(_, spelling)| rest.starts_with(spelling))
        .max_by_key(|(_, spelling)| spelling.len())
        .map(|(op, spelling)| (op, spelling.len()))
}

fn scan_while(text: &str, start: usize, keep: impl Fn(char) -> bool) -> usize {
    let mut end = start;
    for c in text[start..].chars() {
        if !keep(c) {
            break;
        }
        end += c.len_utf8();
    }
    // Always consume at least one character so the caller makes progress.
    if end == start {
        end += text[start..].chars().next().map_or(0, char::len_utf8);
    }
    end
}

/// Offset of the `)` closing the `(` at `open`, ignoring quoted text.
fn matching_paren(text: &str, open: usize) -> Result<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, c) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open + offset);
                }
            }
            _ => {}
        }
    }
    Err(RelalgError::Tokenize(format!(
        "unmatched '(' at offset {open}"
    )))
}

/// Finds the `(` opening the operand of a unary operator whose parameter starts
/// at `from`. Parenthesized groups that cannot end a parameter belong to it.
fn operand_start(text: &str, from: usize) -> Result<Option<usize>> {
    let mut pos = from;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    while let Some(c) = text[pos..].chars().next() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            pos += c.len_utf8();
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => {
                if param_complete(&text[from..pos]) {
                    return Ok(Some(pos));
                }
                pos = matching_paren(text, pos)? + 1;
                continue;
            }
            ')' => {
                return Err(RelalgError::Tokenize(format!(
                    "unmatched ')' at offset {pos}"
                )))
            }
            _ => {}
        }
        pos += c.len_utf8();
    }
    Ok(None)
}

fn param_complete(param: &str) -> bool {
    let param = param.trim_end();
    if param.is_empty() || param.ends_with(PARAM_CONTINUATION) {
        return false;
    }
    let word_start = param
        .char_indices()
        .rev()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(0, |(idx, c)| idx + c.len_utf8());
    !PARAM_CONTINUATION_WORDS.contains(&&param[word_start..])
}
