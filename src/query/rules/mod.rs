//! Rewrite rules and the post-order walk that applies them.
//!
//! A rule looks at one node and either returns a replacement or declines. Each
//! [`Rule::apply`] call rebuilds the tree bottom-up, so a node is offered to the
//! rule only after its children were rewritten, and counts one change per
//! replacement.

mod general;
mod specific;

use tracing::trace;

use super::ast::Node;
use crate::error::{RelalgError, Result};
use crate::expr::ExprError;
use crate::relation::Environment;

/// Rewrite that only looks at the tree.
pub type GeneralFn = fn(&Node) -> Result<Option<Node>>;

/// Rewrite that needs the schemas of the relations in the environment.
pub type SpecificFn = fn(&Node, &Environment) -> Result<Option<Node>>;

/// How a rule inspects a node.
#[derive(Clone, Copy)]
pub enum RuleKind {
    /// Schema-independent rule.
    General(GeneralFn),
    /// Schema-dependent rule.
    Specific(SpecificFn),
}

/// Named rewrite rule.
#[derive(Clone, Copy)]
pub struct Rule {
    /// Stable name reported in traces and logs.
    pub name: &'static str,
    kind: RuleKind,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("general", &self.is_general())
            .finish()
    }
}

impl Rule {
    const fn general(name: &'static str, rewrite: GeneralFn) -> Self {
        Self {
            name,
            kind: RuleKind::General(rewrite),
        }
    }

    const fn specific(name: &'static str, rewrite: SpecificFn) -> Self {
        Self {
            name,
            kind: RuleKind::Specific(rewrite),
        }
    }

    /// Whether the rule works without schema information.
    pub fn is_general(&self) -> bool {
        matches!(self.kind, RuleKind::General(_))
    }

    /// Offers a single node to the rule.
    pub fn rewrite(&self, node: &Node, env: &Environment) -> Result<Option<Node>> {
        match self.kind {
            RuleKind::General(rewrite) => rewrite(node),
            RuleKind::Specific(rewrite) => rewrite(node, env),
        }
    }

    /// Applies the rule over the whole tree, returning the new tree and the number
    /// of rewrites performed.
    pub fn apply(&self, tree: &Node, env: &Environment) -> Result<(Node, usize)> {
        let mut changes = 0;
        let tree = self.walk(tree, env, &mut changes)?;
        Ok((tree, changes))
    }

    fn walk(&self, node: &Node, env: &Environment, changes: &mut usize) -> Result<Node> {
        let rebuilt = match node {
            Node::Relation(_) => node.clone(),
            Node::Unary { op, param, child } => {
                Node::unary(*op, param.clone(), self.walk(child, env, changes)?)
            }
            Node::Binary { op, left, right } => Node::binary(
                *op,
                self.walk(left, env, changes)?,
                self.walk(right, env, changes)?,
            ),
        };
        match self.rewrite(&rebuilt, env)? {
            Some(replacement) => {
                trace!(rule = self.name, from = %rebuilt, to = %replacement, "rule fired");
                *changes += 1;
                Ok(replacement)
            }
            None => Ok(rebuilt),
        }
    }
}

/// Schema-independent rules in application order.
pub const GENERAL_RULES: [Rule; 12] = [
    Rule::general("duplicated_select", general::duplicated_select),
    Rule::general(
        "down_to_unions_subtractions_intersections",
        general::down_to_unions_subtractions_intersections,
    ),
    Rule::general("duplicated_projection", general::duplicated_projection),
    Rule::general("selection_inside_projection", general::selection_inside_projection),
    Rule::general("subsequent_renames", general::subsequent_renames),
    Rule::general("futile_renames", general::futile_renames),
    Rule::general("swap_rename_select", general::swap_rename_select),
    Rule::general("swap_rename_projection", general::swap_rename_projection),
    Rule::general(
        "futile_union_intersection_subtraction",
        general::futile_union_intersection_subtraction,
    ),
    Rule::general("select_union_intersect_subtract", general::select_union_intersect_subtract),
    Rule::general("rename_distributive", general::rename_distributive),
    Rule::general("union_and_product", general::union_and_product),
];

/// Schema-dependent rules in application order.
pub const SPECIFIC_RULES: [Rule; 4] = [
    Rule::specific("selection_and_product", specific::selection_and_product),
    Rule::specific("projection_and_union", specific::projection_and_union),
    Rule::specific("useless_projection", specific::useless_projection),
    Rule::specific("union_and_join", specific::union_and_join),
];

/// Finds a rule of either set by name.
pub fn find(name: &str) -> Option<&'static Rule> {
    GENERAL_RULES
        .iter()
        .chain(SPECIFIC_RULES.iter())
        .find(|rule| rule.name == name)
}

fn predicate_error(text: &str) -> impl FnOnce(ExprError) -> RelalgError + '_ {
    move |err| RelalgError::parse(format!("invalid predicate `{}`: {err}", text.trim()))
}
