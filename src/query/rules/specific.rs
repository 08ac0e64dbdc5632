//! Rules that consult the inferred schema of sub-expressions.

use std::collections::BTreeSet;

use super::general::SharedOperand;
use super::predicate_error;
use crate::error::Result;
use crate::expr::{conjoin, identifiers, split_conjuncts};
use crate::query::ast::{BinaryOp, Node, UnaryOp};
use crate::query::params::parse_projection;
use crate::relation::Environment;

/// σp(A×B), σp(A⋈B): conjuncts that reference one side only move onto that side.
pub(super) fn selection_and_product(node: &Node, env: &Environment) -> Result<Option<Node>> {
    let Some((p, inner)) = node.as_unary(UnaryOp::Selection) else {
        return Ok(None);
    };
    let Some((op, a, b)) = inner.as_binary() else {
        return Ok(None);
    };
    if !matches!(op, BinaryOp::Product | BinaryOp::Join) {
        return Ok(None);
    }
    let left_format = attribute_set(a, env)?;
    let right_format = attribute_set(b, env)?;

    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut both = Vec::new();
    for conjunct in split_conjuncts(p).map_err(predicate_error(p))? {
        let used = identifiers(&conjunct).map_err(predicate_error(&conjunct))?;
        if used.is_subset(&left_format) {
            left.push(conjunct);
        } else if used.is_subset(&right_format) {
            right.push(conjunct);
        } else {
            both.push(conjunct);
        }
    }
    if left.is_empty() && right.is_empty() {
        return Ok(None);
    }

    let filtered = |parts: &[String], side: &Node| {
        if parts.is_empty() {
            side.clone()
        } else {
            Node::selection(conjoin(parts), side.clone())
        }
    };
    let joined = Node::binary(op, filtered(&left, a), filtered(&right, b));
    if both.is_empty() {
        return Ok(Some(joined));
    }
    Ok(Some(Node::selection(conjoin(&both), joined)))
}

/// πL(A) ∪ πL(B) → πL(A∪B) when A and B have the same attributes.
pub(super) fn projection_and_union(node: &Node, env: &Environment) -> Result<Option<Node>> {
    let Some((BinaryOp::Union, left, right)) = node.as_binary() else {
        return Ok(None);
    };
    let (Some((l1, a)), Some((l2, b))) = (
        left.as_unary(UnaryOp::Projection),
        right.as_unary(UnaryOp::Projection),
    ) else {
        return Ok(None);
    };
    if parse_projection(l1)? != parse_projection(l2)? {
        return Ok(None);
    }
    if attribute_set(a, env)? != attribute_set(b, env)? {
        return Ok(None);
    }
    Ok(Some(Node::unary(
        UnaryOp::Projection,
        l1,
        Node::binary(BinaryOp::Union, a.clone(), b.clone()),
    )))
}

/// πL(R) → R when L names every attribute of R.
pub(super) fn useless_projection(node: &Node, env: &Environment) -> Result<Option<Node>> {
    let Some((list, child)) = node.as_unary(UnaryOp::Projection) else {
        return Ok(None);
    };
    let wanted: BTreeSet<String> = parse_projection(list)?.into_iter().collect();
    if wanted != attribute_set(child, env)? {
        return Ok(None);
    }
    Ok(Some(child.clone()))
}

/// (A⋈B) ∪ (A⋈C) → A⋈(B∪C) when B and C have the same attributes.
pub(super) fn union_and_join(node: &Node, env: &Environment) -> Result<Option<Node>> {
    let Some(shared) = SharedOperand::find(node, BinaryOp::Join) else {
        return Ok(None);
    };
    let (b, c) = shared.unioned();
    if attribute_set(b, env)? != attribute_set(c, env)? {
        return Ok(None);
    }
    Ok(Some(shared.factor()))
}

fn attribute_set(node: &Node, env: &Environment) -> Result<BTreeSet<String>> {
    Ok(node.result_format(env)?.into_iter().collect())
}
