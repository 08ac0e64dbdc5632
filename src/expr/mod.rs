#![forbid(unsafe_code)]

//! Predicate language used by selections and theta joins.
//!
//! The language is deliberately small: boolean connectives, chained comparisons,
//! arithmetic, literals and attribute references with an optional date field
//! (`d.year`, `d.month`, `d.day`, `d.weekday`). Besides evaluation, the module
//! exposes the token-level helpers the optimizer uses to rewrite predicate text
//! without re-printing it.

mod eval;
mod lexer;
mod parser;

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

pub use eval::{evaluate, Bindings, Scalar};
pub use lexer::{tokenize, Keyword, Symbol, Token, TokenKind};
pub use parser::{parse_expr, ArithOp, CmpOp, Expr};

use crate::relation::Value;

/// Failures raised while lexing, parsing or evaluating a predicate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// The predicate text is blank.
    #[error("empty predicate")]
    Empty,
    /// A character that starts no token.
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar {
        /// Offending character.
        ch: char,
        /// Byte offset.
        offset: usize,
    },
    /// A quoted literal without its closing quote.
    #[error("unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),
    /// A numeric literal that does not fit its type.
    #[error("invalid number literal '{0}'")]
    BadNumber(String),
    /// A token that does not fit the grammar at this point.
    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    Unexpected {
        /// Description of the token found.
        found: String,
        /// Byte offset.
        offset: usize,
        /// What the grammar allows here.
        expected: &'static str,
    },
    /// The predicate ended too early.
    #[error("unexpected end of predicate, expected {0}")]
    UnexpectedEnd(&'static str),
    /// The tuple has no attribute with this name.
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),
    /// The field does not exist on the value's type.
    #[error("unknown field '.{field}' on {ty} value")]
    UnknownField {
        /// Requested field.
        field: String,
        /// Type of the value.
        ty: &'static str,
    },
    /// A binary operator applied to incompatible operands.
    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        /// Operator symbol.
        op: &'static str,
        /// Left operand type.
        left: &'static str,
        /// Right operand type.
        right: &'static str,
    },
    /// A unary operator applied to an incompatible operand.
    #[error("cannot apply unary '{op}' to {operand}")]
    UnaryMismatch {
        /// Operator symbol.
        op: &'static str,
        /// Operand type.
        operand: &'static str,
    },
    /// Division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Integer or date arithmetic left its range.
    #[error("arithmetic overflow in '{0}'")]
    Overflow(&'static str),
}

impl ExprError {
    /// Whether the error is about the predicate text rather than a tuple.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            ExprError::Empty
                | ExprError::UnexpectedChar { .. }
                | ExprError::UnterminatedString(_)
                | ExprError::BadNumber(_)
                | ExprError::Unexpected { .. }
                | ExprError::UnexpectedEnd(_)
        )
    }
}

/// A parsed predicate together with its source text.
#[derive(Clone, Debug)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

impl Predicate {
    /// Parses `source`; syntax errors are reported before any tuple is seen.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        Ok(Self {
            source: source.trim().to_owned(),
            expr: parse_expr(source)?,
        })
    }

    /// Source text, trimmed.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed expression tree.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Attribute names referenced by the predicate.
    pub fn attributes(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.expr.for_each_attribute(&mut |name| {
            names.insert(name.to_owned());
        });
        names
    }

    /// Evaluates the predicate on one tuple and applies truthiness.
    pub fn test(&self, bindings: &Bindings<'_>, tuple: &[Value]) -> Result<bool, ExprError> {
        Ok(evaluate(&self.expr, bindings, tuple)?.truthy())
    }
}

/// Base identifiers of `text` (field names after a dot are excluded).
pub fn identifiers(text: &str) -> Result<BTreeSet<String>, ExprError> {
    let tokens = tokenize(text)?;
    Ok(base_identifiers(&tokens)
        .map(|(name, _)| name.to_owned())
        .collect())
}

/// Replaces every base identifier found in `map` with its mapped name, leaving the
/// rest of the text (string literals included) untouched.
pub fn rename_identifiers(text: &str, map: &BTreeMap<String, String>) -> Result<String, ExprError> {
    let tokens = tokenize(text)?;
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (name, span) in base_identifiers(&tokens) {
        if let Some(replacement) = map.get(name) {
            out.push_str(&text[cursor..span.start]);
            out.push_str(replacement);
            cursor = span.end;
        }
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

fn base_identifiers(tokens: &[Token]) -> impl Iterator<Item = (&str, std::ops::Range<usize>)> {
    tokens.iter().enumerate().filter_map(move |(idx, token)| {
        let after_dot = idx > 0 && tokens[idx - 1].is_symbol(Symbol::Dot);
        match &token.kind {
            TokenKind::Ident(name) if !after_dot => Some((name.as_str(), token.span.clone())),
            _ => None,
        }
    })
}

/// Splits a predicate on its top-level `and` connectives.
///
/// Enclosing parentheses are stripped and nested conjunctions are flattened. A
/// predicate (or conjunct) with a top-level `or` is kept whole.
pub fn split_conjuncts(text: &str) -> Result<Vec<String>, ExprError> {
    parse_expr(text)?;
    let tokens = tokenize(text)?;
    let mut parts = Vec::new();
    collect_conjuncts(text, &tokens, &mut parts);
    Ok(parts)
}

fn collect_conjuncts(text: &str, tokens: &[Token], out: &mut Vec<String>) {
    let tokens = strip_outer_parens(tokens);
    let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
        return;
    };
    let source = &text[first.span.start..last.span.end];
    let mut depth = 0usize;
    let mut cuts = Vec::new();
    let mut has_or = false;
    for (idx, token) in tokens.iter().enumerate() {
        if token.is_symbol(Symbol::LParen) {
            depth += 1;
        } else if token.is_symbol(Symbol::RParen) {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_keyword(Keyword::Or) {
            has_or = true;
        } else if depth == 0 && token.is_keyword(Keyword::And) {
            cuts.push(idx);
        }
    }
    if has_or || cuts.is_empty() {
        out.push(source.to_owned());
        return;
    }
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(tokens.len())) {
        collect_conjuncts(text, &tokens[start..cut], out);
        start = cut + 1;
    }
}

fn strip_outer_parens(mut tokens: &[Token]) -> &[Token] {
    while tokens.len() >= 2
        && tokens[0].is_symbol(Symbol::LParen)
        && matching_paren(tokens, 0) == Some(tokens.len() - 1)
    {
        tokens = &tokens[1..tokens.len() - 1];
    }
    tokens
}

fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        if token.is_symbol(Symbol::LParen) {
            depth += 1;
        } else if token.is_symbol(Symbol::RParen) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

/// Whether `text` has an `or` outside every parenthesis. Unlexable text counts as
/// having one so that callers parenthesize it.
pub fn has_top_level_or(text: &str) -> bool {
    let Ok(tokens) = tokenize(text) else {
        return true;
    };
    let mut depth = 0usize;
    tokens.iter().any(|token| {
        if token.is_symbol(Symbol::LParen) {
            depth += 1;
        } else if token.is_symbol(Symbol::RParen) {
            depth = depth.saturating_sub(1);
        }
        depth == 0 && token.is_keyword(Keyword::Or)
    })
}

/// Joins conjuncts with `and`, parenthesizing those with a top-level `or`.
pub fn conjoin<S: AsRef<str>>(parts: &[S]) -> String {
    if let [single] = parts {
        return single.as_ref().trim().to_owned();
    }
    parts
        .iter()
        .map(|part| {
            let part = part.as_ref().trim();
            if has_top_level_or(part) {
                format!("({part})")
            } else {
                part.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Logical negation of a predicate.
pub fn negate(text: &str) -> String {
    format!("not ({})", text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_skip_fields_and_literals() {
        let ids = identifiers("d.year > 2000 and name == 'age' and age > 1").unwrap();
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec!["age".to_string(), "d".to_string(), "name".to_string()]
        );
    }

    #[test]
    fn rename_splices_only_identifiers() {
        let map = BTreeMap::from([
            ("id".to_string(), "pid".to_string()),
            ("year".to_string(), "yy".to_string()),
        ]);
        let renamed = rename_identifiers("id>2 and d.year == 1 and s=='id'", &map).unwrap();
        assert_eq!(renamed, "pid>2 and d.year == 1 and s=='id'");
    }

    #[test]
    fn conjuncts_flatten_and_respect_or() {
        assert_eq!(
            split_conjuncts("(a > 1 and b < 2) and (c == 3)").unwrap(),
            vec!["a > 1", "b < 2", "c == 3"]
        );
        assert_eq!(
            split_conjuncts("a > 1 and b < 2 or c == 3").unwrap(),
            vec!["a > 1 and b < 2 or c == 3"]
        );
        assert_eq!(
            split_conjuncts("(a or b) and c").unwrap(),
            vec!["a or b", "c"]
        );
        assert_eq!(
            split_conjuncts("name == 'x and y' and id > 1").unwrap(),
            vec!["name == 'x and y'", "id > 1"]
        );
    }

    #[test]
    fn split_rejects_bad_syntax() {
        assert!(split_conjuncts("a and").is_err());
    }

    #[test]
    fn conjoin_parenthesizes_disjunctions() {
        assert_eq!(conjoin(&["a or b", "c"]), "(a or b) and c");
        assert_eq!(conjoin(&["(a or b)", "c"]), "(a or b) and c");
        assert_eq!(conjoin(&["a > 1"]), "a > 1");
        assert_eq!(negate("a or b"), "not (a or b)");
    }

    #[test]
    fn predicate_collects_attributes() {
        let predicate = Predicate::parse(" age > 26 and d.day == 3 ").unwrap();
        assert_eq!(predicate.source(), "age > 26 and d.day == 3");
        assert_eq!(
            predicate.attributes().into_iter().collect::<Vec<_>>(),
            vec!["age".to_string(), "d".to_string()]
        );
    }

    #[test]
    fn syntax_classification() {
        assert!(ExprError::Empty.is_syntax());
        assert!(!ExprError::DivisionByZero.is_syntax());
    }
}
