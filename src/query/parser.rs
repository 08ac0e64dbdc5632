//! Builds [`Node`] trees from token lists.

use super::ast::{Node, UnaryOp};
use super::params::{parse_projection, parse_rename};
use super::tokenizer::{render, tokenize, Token};
use crate::error::{RelalgError, Result};
use crate::relation::is_identifier;

/// Parses query text into an expression tree.
pub fn parse(text: &str) -> Result<Node> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(RelalgError::parse("empty expression"));
    }
    parse_tokens(&tokens)
}

/// Parses an already tokenized query.
pub fn parse_tokens(tokens: &[Token]) -> Result<Node> {
    if let Some(Token::Unknown(text)) = tokens.iter().find(|t| matches!(t, Token::Unknown(_))) {
        return Err(RelalgError::parse(format!("unknown symbol '{text}'")));
    }
    match tokens {
        [] => return Err(RelalgError::parse("expected an expression")),
        [Token::Group(inner)] => {
            if inner.is_empty() {
                return Err(RelalgError::parse("empty parentheses"));
            }
            return parse_tokens(inner);
        }
        [Token::Relation(name)] => {
            if !is_identifier(name) {
                return Err(RelalgError::parse(format!(
                    "'{name}' is not a valid relation name"
                )));
            }
            return Ok(Node::relation(name.clone()));
        }
        _ => {}
    }

    // Rightmost binary operator: every binary operator has the same precedence and
    // associates to the left.
    let rightmost_binary = tokens.iter().enumerate().rev().find_map(|(idx, t)| match t {
        Token::Binary(op) => Some((idx, op)),
        _ => None,
    });
    if let Some((idx, op)) = rightmost_binary {
        if idx == 0 {
            return Err(RelalgError::parse(format!(
                "missing left operand of {}",
                op.symbol()
            )));
        }
        if idx == tokens.len() - 1 {
            return Err(RelalgError::parse(format!(
                "missing right operand of {}",
                op.symbol()
            )));
        }
        let left = parse_tokens(&tokens[..idx])?;
        let right = parse_tokens(&tokens[idx + 1..])?;
        return Ok(Node::binary(*op, left, right));
    }

    let rightmost_unary = tokens.iter().enumerate().rev().find_map(|(idx, t)| match t {
        Token::Unary(op) => Some((idx, op)),
        _ => None,
    });
    if let Some((idx, op)) = rightmost_unary {
        if idx != 0 {
            return Err(RelalgError::parse(format!(
                "unexpected '{}' before {}",
                render(&tokens[..idx]),
                op.symbol()
            )));
        }
        let param = match tokens.get(1) {
            Some(Token::Param(param)) => param,
            _ => {
                return Err(RelalgError::parse(format!(
                    "expected a parameter after {}",
                    op.symbol()
                )))
            }
        };
        if tokens.len() < 3 {
            return Err(RelalgError::parse(format!(
                "expected more tokens after '{} {param}'",
                op.symbol()
            )));
        }
        if tokens.len() > 3 {
            return Err(RelalgError::parse(format!(
                "too many tokens after '{} {param}': {}",
                op.symbol(),
                render(&tokens[3..])
            )));
        }
        validate_param(*op, param)?;
        let child = parse_tokens(&tokens[2..])?;
        return Ok(Node::unary(*op, param.clone(), child));
    }

    Err(RelalgError::parse(format!(
        "cannot parse '{}'",
        render(tokens)
    )))
}

fn validate_param(op: UnaryOp, param: &str) -> Result<()> {
    match op {
        UnaryOp::Selection if param.is_empty() => {
            Err(RelalgError::parse("selection needs a predicate"))
        }
        UnaryOp::Selection => Ok(()),
        UnaryOp::Projection => parse_projection(param).map(drop),
        UnaryOp::Rename => parse_rename(param).map(drop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::BinaryOp;

    #[test]
    fn binary_operators_associate_left() {
        let tree = parse("a ∪ b - c").unwrap();
        assert_eq!(
            tree,
            Node::binary(
                BinaryOp::Difference,
                Node::binary(BinaryOp::Union, Node::relation("a"), Node::relation("b")),
                Node::relation("c"),
            )
        );
    }

    #[test]
    fn unary_binds_its_operand() {
        let tree = parse("σ age > 26 (people) ⋈ skills").unwrap();
        assert_eq!(
            tree,
            Node::binary(
                BinaryOp::Join,
                Node::selection("age > 26", Node::relation("people")),
                Node::relation("skills"),
            )
        );
    }

    #[test]
    fn nested_groups_collapse() {
        assert_eq!(parse("((people))").unwrap(), Node::relation("people"));
    }

    #[test]
    fn printing_round_trips() {
        for text in [
            "a∪(b⋈c)",
            "σ name == 'x' (π name,age (people))",
            "ρ id➡i (a)*b-c",
            "a÷(b⧓c)⧑d",
        ] {
            let tree = parse(text).unwrap();
            assert_eq!(parse(&tree.to_string()).unwrap(), tree, "{text}");
        }
    }

    #[test]
    fn malformed_queries() {
        assert_eq!(parse("").unwrap_err().code(), "ParseError");
        assert_eq!(parse("∪ b").unwrap_err().code(), "ParseError");
        assert_eq!(parse("a ∪").unwrap_err().code(), "ParseError");
        assert_eq!(parse("a b").unwrap_err().code(), "ParseError");
        assert_eq!(parse("()").unwrap_err().code(), "ParseError");
        assert_eq!(parse("a ?? b").unwrap_err().code(), "ParseError");
        assert_eq!(parse("and").unwrap_err().code(), "ParseError");
        assert!(parse("σ age > 1").unwrap_err().to_string().contains("expected more tokens"));
        assert!(parse("π id (a) (b)").unwrap_err().to_string().contains("too many tokens"));
        assert_eq!(parse("π id,,x (a)").unwrap_err().code(), "ParseError");
        assert_eq!(parse("ρ id (a)").unwrap_err().code(), "ParseError");
        assert_eq!(parse("(a").unwrap_err().code(), "TokenizeError");
    }
}
