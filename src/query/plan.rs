//! Executable plans lowered from expression trees, and their explain output.

use std::fmt;

use tracing::trace;

use super::ast::{BinaryOp, Node, UnaryOp};
use super::params::{format_projection, format_rename, parse_projection, parse_rename};
use crate::error::Result;
use crate::expr::Predicate;
use crate::relation::{parse_predicate, Environment, Relation, RenameMap};

/// Tree of relation-engine calls with every parameter decoded.
#[derive(Clone, Debug)]
pub enum Plan {
    /// Reads a relation from the environment.
    Scan(String),
    /// Filters by a parsed predicate.
    Selection {
        /// Predicate to test each tuple against.
        predicate: Predicate,
        /// Input plan.
        input: Box<Plan>,
    },
    /// Keeps the listed attributes.
    Projection {
        /// Attributes, in output order.
        attributes: Vec<String>,
        /// Input plan.
        input: Box<Plan>,
    },
    /// Relabels attributes.
    Rename {
        /// Old name to new name.
        map: RenameMap,
        /// Input plan.
        input: Box<Plan>,
    },
    /// Applies a binary operator.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left input.
        left: Box<Plan>,
        /// Right input.
        right: Box<Plan>,
    },
}

impl Plan {
    /// Lowers `node`, failing on the first malformed parameter.
    pub fn from_node(node: &Node) -> Result<Plan> {
        Ok(match node {
            Node::Relation(name) => Plan::Scan(name.clone()),
            Node::Unary { op, param, child } => {
                let input = Box::new(Plan::from_node(child)?);
                match op {
                    UnaryOp::Selection => Plan::Selection {
                        predicate: parse_predicate(param)?,
                        input,
                    },
                    UnaryOp::Projection => Plan::Projection {
                        attributes: parse_projection(param)?,
                        input,
                    },
                    UnaryOp::Rename => Plan::Rename {
                        map: parse_rename(param)?,
                        input,
                    },
                }
            }
            Node::Binary { op, left, right } => Plan::Binary {
                op: *op,
                left: Box::new(Plan::from_node(left)?),
                right: Box::new(Plan::from_node(right)?),
            },
        })
    }

    /// Evaluates the plan bottom-up against `env`.
    pub fn execute(&self, env: &Environment) -> Result<Relation> {
        let result = match self {
            Plan::Scan(name) => env.get(name)?.clone(),
            Plan::Selection { predicate, input } => input.execute(env)?.filter(predicate)?,
            Plan::Projection { attributes, input } => input.execute(env)?.projection(attributes)?,
            Plan::Rename { map, input } => input.execute(env)?.rename(map)?,
            Plan::Binary { op, left, right } => {
                let left = left.execute(env)?;
                let right = right.execute(env)?;
                op.apply(&left, &right)?
            }
        };
        trace!(op = self.name(), rows = result.len(), "executed plan node");
        Ok(result)
    }

    fn name(&self) -> &'static str {
        match self {
            Plan::Scan(_) => "Scan",
            Plan::Selection { .. } => UnaryOp::Selection.name(),
            Plan::Projection { .. } => UnaryOp::Projection.name(),
            Plan::Rename { .. } => UnaryOp::Rename.name(),
            Plan::Binary { op, .. } => op.name(),
        }
    }

    /// Operator tree for display.
    pub fn explain(&self) -> ExplainNode {
        let mut node = ExplainNode::new(self.name());
        match self {
            Plan::Scan(name) => node.props.push(ExplainProp::new("relation", name)),
            Plan::Selection { predicate, input } => {
                node.props
                    .push(ExplainProp::new("predicate", predicate.source()));
                node.inputs.push(input.explain());
            }
            Plan::Projection { attributes, input } => {
                node.props
                    .push(ExplainProp::new("attributes", format_projection(attributes)));
                node.inputs.push(input.explain());
            }
            Plan::Rename { map, input } => {
                node.props.push(ExplainProp::new("map", format_rename(map)));
                node.inputs.push(input.explain());
            }
            Plan::Binary { op, left, right } => {
                node.props.push(ExplainProp::new("symbol", op.symbol()));
                node.inputs.push(left.explain());
                node.inputs.push(right.explain());
            }
        }
        node
    }
}

/// Explain node representing an operator with its decoded parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplainNode {
    /// Operator name.
    pub op: String,
    /// Properties describing the operator.
    pub props: Vec<ExplainProp>,
    /// Input operators.
    pub inputs: Vec<ExplainNode>,
}

impl ExplainNode {
    /// Creates a node with no properties or inputs.
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            props: Vec::new(),
            inputs: Vec::new(),
        }
    }

    fn render(&self, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.op, indent = depth * 2)?;
        if !self.props.is_empty() {
            let props: Vec<String> = self
                .props
                .iter()
                .map(|p| format!("{}={}", p.key, p.value))
                .collect();
            write!(f, " [{}]", props.join(", "))?;
        }
        writeln!(f)?;
        for input in &self.inputs {
            input.render(depth + 1, f)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(0, f)
    }
}

/// Key/value pair attached to an [`ExplainNode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplainProp {
    /// Property key.
    pub key: String,
    /// Property value rendered for display.
    pub value: String,
}

impl ExplainProp {
    fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
