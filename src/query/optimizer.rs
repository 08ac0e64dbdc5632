//! Fixpoint driver for the rewrite rules.
//!
//! A pass applies every selected rule in turn (schema-dependent rules first), each
//! one walking the whole tree. Passes repeat until one of them changes nothing.
//! There is no iteration cap: every rule either shrinks the tree or moves an
//! operator towards the leaves.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ast::Node;
use super::parser::parse;
use super::rules::{Rule, GENERAL_RULES, SPECIFIC_RULES};
use super::split::split;
use crate::error::{RelalgError, Result};
use crate::relation::{is_identifier, Environment};

/// Rule selection and tracing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Apply the schema-independent rules.
    pub general: bool,
    /// Apply the rules that consult the environment.
    pub specific: bool,
    /// Record the tree after every rule application that changed it.
    pub trace: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            general: true,
            specific: true,
            trace: false,
        }
    }
}

/// One change-producing rule application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceStep {
    /// Rule name.
    pub rule: &'static str,
    /// Rewrites performed by this application.
    pub changes: usize,
    /// Tree after the application.
    pub tree: String,
}

/// Result of optimizing a tree.
#[derive(Clone, Debug)]
pub struct Optimized {
    /// Rewritten tree.
    pub tree: Node,
    /// Total number of rewrites.
    pub changes: usize,
    /// Full passes run, including the final one that changed nothing.
    pub passes: usize,
    /// Rule applications that changed the tree; empty unless tracing.
    pub trace: Vec<TraceStep>,
}

/// Rewrites trees with the configured rule sets until nothing changes.
#[derive(Clone, Debug, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    /// Creates an optimizer with the given configuration.
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> OptimizerConfig {
        self.config
    }

    /// Rules applied in each pass, in order.
    pub fn rules(&self) -> impl Iterator<Item = &'static Rule> {
        let specific: &'static [Rule] = if self.config.specific {
            &SPECIFIC_RULES
        } else {
            &[]
        };
        let general: &'static [Rule] = if self.config.general {
            &GENERAL_RULES
        } else {
            &[]
        };
        specific.iter().chain(general.iter())
    }

    /// Runs passes over `tree` until one changes nothing.
    pub fn optimize(&self, tree: &Node, env: &Environment) -> Result<Optimized> {
        let mut tree = tree.clone();
        let mut total = 0;
        let mut passes = 0;
        let mut trace = Vec::new();
        loop {
            passes += 1;
            let mut pass_changes = 0;
            for rule in self.rules() {
                let (rewritten, changes) = rule.apply(&tree, env)?;
                if changes == 0 {
                    continue;
                }
                debug!(rule = rule.name, changes, tree = %rewritten, "rule applied");
                tree = rewritten;
                pass_changes += changes;
                if self.config.trace {
                    trace.push(TraceStep {
                        rule: rule.name,
                        changes,
                        tree: tree.to_string(),
                    });
                }
            }
            total += pass_changes;
            debug!(pass = passes, changes = pass_changes, "optimizer pass finished");
            if pass_changes == 0 {
                break;
            }
        }
        Ok(Optimized {
            tree,
            changes: total,
            passes,
            trace,
        })
    }
}

/// Optimizes an already parsed tree.
pub fn optimize_tree(tree: &Node, env: &Environment, config: OptimizerConfig) -> Result<Optimized> {
    Optimizer::new(config).optimize(tree, env)
}

/// Parses, optimizes and prints a query.
pub fn optimize_query(text: &str, env: &Environment, config: OptimizerConfig) -> Result<String> {
    let tree = parse(text)?;
    Ok(optimize_tree(&tree, env, config)?.tree.to_string())
}

/// Optimizes a program of `name = query` lines and splits the result into steps.
///
/// Names assigned on earlier lines are inlined where later lines reference them.
/// The last line is the query to optimize and may be a bare expression or an
/// assignment. Blank lines are ignored.
pub fn optimize_program(code: &str, env: &Environment) -> Result<String> {
    let lines: Vec<&str> = code
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let Some((last, earlier)) = lines.split_last() else {
        return Err(RelalgError::parse("empty program"));
    };

    let mut assigned: FxHashMap<String, Node> = FxHashMap::default();
    for line in earlier {
        let Some((name, query)) = assignment(line) else {
            return Err(RelalgError::parse(format!(
                "expected `name = query`, found '{line}'"
            )));
        };
        let tree = inline(parse(query)?, &assigned);
        assigned.insert(name.to_owned(), tree);
    }
    let query = assignment(last).map_or(*last, |(_, query)| query);
    let tree = inline(parse(query)?, &assigned);

    let optimized = Optimizer::default().optimize(&tree, env)?;
    debug!(
        lines = lines.len(),
        changes = optimized.changes,
        "program optimized"
    );
    Ok(split(&optimized.tree, env))
}

/// Splits `name = query`, rejecting `==` and non-identifier targets.
fn assignment(line: &str) -> Option<(&str, &str)> {
    let (name, query) = line.split_once('=')?;
    let name = name.trim();
    if query.starts_with('=') || !is_identifier(name) {
        return None;
    }
    Some((name, query.trim()))
}

fn inline(tree: Node, assigned: &FxHashMap<String, Node>) -> Node {
    match tree {
        Node::Relation(name) => match assigned.get(&name) {
            Some(definition) => definition.clone(),
            None => Node::Relation(name),
        },
        Node::Unary { op, param, child } => Node::unary(op, param, inline(*child, assigned)),
        Node::Binary { op, left, right } => {
            Node::binary(op, inline(*left, assigned), inline(*right, assigned))
        }
    }
}
