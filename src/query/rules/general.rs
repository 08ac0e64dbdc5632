//! Rules that hold for every schema.

use std::collections::BTreeSet;

use super::predicate_error;
use crate::error::Result;
use crate::expr::{conjoin, identifiers, negate, rename_identifiers};
use crate::query::ast::{BinaryOp, Node, UnaryOp};
use crate::query::params::{format_projection, format_rename, parse_projection, parse_rename};
use crate::relation::RenameMap;

const FALSE: &str = "False";

/// σp(σq(R)) → σ(q and p)(R). The inner predicate stays first so it still guards
/// the outer one under short-circuit evaluation.
pub(super) fn duplicated_select(node: &Node) -> Result<Option<Node>> {
    let Some((p, inner)) = node.as_unary(UnaryOp::Selection) else {
        return Ok(None);
    };
    let Some((q, child)) = inner.as_unary(UnaryOp::Selection) else {
        return Ok(None);
    };
    let merged = if p.trim() == q.trim() {
        p.trim().to_owned()
    } else {
        conjoin(&[q, p])
    };
    Ok(Some(Node::selection(merged, child.clone())))
}

/// σp(A op B) → σp(A) op σp(B) for the set operators.
pub(super) fn down_to_unions_subtractions_intersections(node: &Node) -> Result<Option<Node>> {
    let Some((p, inner)) = node.as_unary(UnaryOp::Selection) else {
        return Ok(None);
    };
    let Some((op, left, right)) = inner.as_binary() else {
        return Ok(None);
    };
    if !op.is_set_op() {
        return Ok(None);
    }
    let left = Node::selection(p, left.clone());
    let right = match right.as_unary(UnaryOp::Selection) {
        Some((q, _)) if op == BinaryOp::Difference && q.trim() == p.trim() => right.clone(),
        _ => Node::selection(p, right.clone()),
    };
    Ok(Some(Node::binary(op, left, right)))
}

/// πL(πM(R)) → πL(R).
pub(super) fn duplicated_projection(node: &Node) -> Result<Option<Node>> {
    let Some((attributes, inner)) = node.as_unary(UnaryOp::Projection) else {
        return Ok(None);
    };
    let Some((_, child)) = inner.as_unary(UnaryOp::Projection) else {
        return Ok(None);
    };
    Ok(Some(Node::unary(
        UnaryOp::Projection,
        attributes,
        child.clone(),
    )))
}

/// σp(πL(R)) → πL(σp(R)).
pub(super) fn selection_inside_projection(node: &Node) -> Result<Option<Node>> {
    let Some((p, inner)) = node.as_unary(UnaryOp::Selection) else {
        return Ok(None);
    };
    let Some((attributes, child)) = inner.as_unary(UnaryOp::Projection) else {
        return Ok(None);
    };
    Ok(Some(Node::unary(
        UnaryOp::Projection,
        attributes,
        Node::selection(p, child.clone()),
    )))
}

/// ρm1(ρm2(R)) → ρm(R) with the two maps composed.
pub(super) fn subsequent_renames(node: &Node) -> Result<Option<Node>> {
    let Some((outer, inner)) = node.as_unary(UnaryOp::Rename) else {
        return Ok(None);
    };
    let Some((inner_param, child)) = inner.as_unary(UnaryOp::Rename) else {
        return Ok(None);
    };
    let outer = parse_rename(outer)?;
    let inner = parse_rename(inner_param)?;
    let produced: BTreeSet<&String> = inner.values().collect();
    // The outer rename refers to a name the inner one removed: leave the error in place.
    if outer
        .keys()
        .any(|old| inner.contains_key(old) && !produced.contains(old))
    {
        return Ok(None);
    }

    let mut composed = RenameMap::new();
    for (old, new) in &inner {
        let target = outer.get(new).unwrap_or(new);
        composed.insert(old.clone(), target.clone());
    }
    for (old, new) in &outer {
        if !produced.contains(old) {
            composed.insert(old.clone(), new.clone());
        }
    }
    composed.retain(|old, new| old != new);

    if composed.is_empty() {
        return Ok(Some(child.clone()));
    }
    Ok(Some(Node::unary(
        UnaryOp::Rename,
        format_rename(&composed),
        child.clone(),
    )))
}

/// Drops `x➡x` entries, and the rename itself when nothing is left.
pub(super) fn futile_renames(node: &Node) -> Result<Option<Node>> {
    let Some((param, child)) = node.as_unary(UnaryOp::Rename) else {
        return Ok(None);
    };
    let mut map = parse_rename(param)?;
    let before = map.len();
    map.retain(|old, new| old != new);
    if map.len() == before {
        return Ok(None);
    }
    if map.is_empty() {
        return Ok(Some(child.clone()));
    }
    Ok(Some(Node::unary(
        UnaryOp::Rename,
        format_rename(&map),
        child.clone(),
    )))
}

/// σp(ρm(R)) → ρm(σp'(R)), p' naming the attributes as they are before the rename.
pub(super) fn swap_rename_select(node: &Node) -> Result<Option<Node>> {
    let Some((p, inner)) = node.as_unary(UnaryOp::Selection) else {
        return Ok(None);
    };
    let Some((param, child)) = inner.as_unary(UnaryOp::Rename) else {
        return Ok(None);
    };
    let map = parse_rename(param)?;
    let inverse = invert(&map);
    let used = identifiers(p).map_err(predicate_error(p))?;
    if used.iter().any(|name| hidden_by(&map, &inverse, name)) {
        return Ok(None);
    }
    let p = rename_identifiers(p, &inverse).map_err(predicate_error(p))?;
    Ok(Some(Node::unary(
        UnaryOp::Rename,
        param,
        Node::selection(p, child.clone()),
    )))
}

/// πL(ρm(R)) → ρm'(πL'(R)), keeping only the rename entries the projection uses.
pub(super) fn swap_rename_projection(node: &Node) -> Result<Option<Node>> {
    let Some((list, inner)) = node.as_unary(UnaryOp::Projection) else {
        return Ok(None);
    };
    let Some((param, child)) = inner.as_unary(UnaryOp::Rename) else {
        return Ok(None);
    };
    let attributes = parse_projection(list)?;
    let map = parse_rename(param)?;
    let inverse = invert(&map);
    if attributes
        .iter()
        .any(|name| hidden_by(&map, &inverse, name))
    {
        return Ok(None);
    }
    let before: Vec<&str> = attributes
        .iter()
        .map(|name| inverse.get(name).unwrap_or(name).as_str())
        .collect();
    let kept: RenameMap = map
        .into_iter()
        .filter(|(_, new)| attributes.contains(new))
        .collect();

    let projection = Node::unary(UnaryOp::Projection, format_projection(&before), child.clone());
    if kept.is_empty() {
        return Ok(Some(projection));
    }
    Ok(Some(Node::unary(
        UnaryOp::Rename,
        format_rename(&kept),
        projection,
    )))
}

/// Set operators whose operands are the same relation, possibly filtered.
pub(super) fn futile_union_intersection_subtraction(node: &Node) -> Result<Option<Node>> {
    let Some((op, left, right)) = node.as_binary() else {
        return Ok(None);
    };
    if !op.is_set_op() {
        return Ok(None);
    }
    if left == right {
        return Ok(Some(match op {
            BinaryOp::Difference => Node::selection(FALSE, left.clone()),
            _ => left.clone(),
        }));
    }

    let filtered = |side: &Node, other: &Node| -> Option<String> {
        side.as_unary(UnaryOp::Selection)
            .filter(|(_, child)| *child == other)
            .map(|(p, _)| p.to_owned())
    };
    let rewritten = match op {
        // σp(A) ∪ A and A ∪ σp(A) are A.
        BinaryOp::Union => filtered(left, right)
            .map(|_| right.clone())
            .or_else(|| filtered(right, left).map(|_| left.clone())),
        // σp(A) ∩ A and A ∩ σp(A) are σp(A).
        BinaryOp::Intersection => filtered(left, right)
            .map(|_| left.clone())
            .or_else(|| filtered(right, left).map(|_| right.clone())),
        BinaryOp::Difference => {
            if let Some(p) = filtered(right, left) {
                Some(Node::selection(negate(&p), left.clone()))
            } else {
                filtered(left, right).map(|_| Node::selection(FALSE, right.clone()))
            }
        }
        _ => None,
    };
    Ok(rewritten)
}

/// σp(A) op σq(A) → σr(A) with r combining p and q.
pub(super) fn select_union_intersect_subtract(node: &Node) -> Result<Option<Node>> {
    let Some((op, left, right)) = node.as_binary() else {
        return Ok(None);
    };
    let (Some((p, a)), Some((q, b))) = (
        left.as_unary(UnaryOp::Selection),
        right.as_unary(UnaryOp::Selection),
    ) else {
        return Ok(None);
    };
    if a != b {
        return Ok(None);
    }
    let predicate = match op {
        BinaryOp::Union => format!("{} or {}", p.trim(), q.trim()),
        BinaryOp::Intersection => conjoin(&[p, q]),
        BinaryOp::Difference => conjoin(&[p.to_owned(), negate(q)]),
        _ => return Ok(None),
    };
    Ok(Some(Node::selection(predicate, a.clone())))
}

/// ρm(A) op ρm(B) → ρm(A op B) for the set operators.
pub(super) fn rename_distributive(node: &Node) -> Result<Option<Node>> {
    let Some((op, left, right)) = node.as_binary() else {
        return Ok(None);
    };
    if !op.is_set_op() {
        return Ok(None);
    }
    let (Some((m1, a)), Some((m2, b))) = (
        left.as_unary(UnaryOp::Rename),
        right.as_unary(UnaryOp::Rename),
    ) else {
        return Ok(None);
    };
    if m1 != m2 && parse_rename(m1)? != parse_rename(m2)? {
        return Ok(None);
    }
    Ok(Some(Node::unary(
        UnaryOp::Rename,
        m1,
        Node::binary(op, a.clone(), b.clone()),
    )))
}

/// (A×B) ∪ (A×C) → A×(B∪C), with the shared operand on either side.
pub(super) fn union_and_product(node: &Node) -> Result<Option<Node>> {
    Ok(SharedOperand::find(node, BinaryOp::Product).map(|shared| shared.factor()))
}

/// Union of two `inner` nodes that have one operand in common, in the same position.
pub(super) struct SharedOperand<'a> {
    inner: BinaryOp,
    shared: &'a Node,
    first: &'a Node,
    second: &'a Node,
    on_left: bool,
}

impl<'a> SharedOperand<'a> {
    /// Matches `node`; identical operands on both sides are left to other rules.
    pub(super) fn find(node: &'a Node, inner: BinaryOp) -> Option<Self> {
        let (BinaryOp::Union, left, right) = node.as_binary()? else {
            return None;
        };
        let (l_op, a, b) = left.as_binary()?;
        let (r_op, c, d) = right.as_binary()?;
        if l_op != inner || r_op != inner || left == right {
            return None;
        }
        if a == c {
            Some(Self { inner, shared: a, first: b, second: d, on_left: true })
        } else if b == d {
            Some(Self { inner, shared: b, first: a, second: c, on_left: false })
        } else {
            None
        }
    }

    /// The two operands that end up in the union.
    pub(super) fn unioned(&self) -> (&'a Node, &'a Node) {
        (self.first, self.second)
    }

    pub(super) fn factor(&self) -> Node {
        let union = Node::binary(BinaryOp::Union, self.first.clone(), self.second.clone());
        if self.on_left {
            Node::binary(self.inner, self.shared.clone(), union)
        } else {
            Node::binary(self.inner, union, self.shared.clone())
        }
    }
}

fn invert(map: &RenameMap) -> RenameMap {
    map.iter()
        .map(|(old, new)| (new.clone(), old.clone()))
        .collect()
}

/// Whether `name` is the old side of a rename without being produced by it, so it
/// no longer exists above the rename.
fn hidden_by(map: &RenameMap, inverse: &RenameMap, name: &str) -> bool {
    map.contains_key(name) && !inverse.contains_key(name)
}
