//! Expression tree produced by the parser and rewritten by the optimizer.
//!
//! Nodes are immutable values: rewrites build new nodes, and structural equality
//! (derived) is what the optimizer and the splitter use to recognize repeated
//! sub-expressions.

use std::collections::BTreeSet;
use std::fmt;

use super::params::{parse_projection, parse_rename};
use super::plan::{ExplainNode, Plan};
use crate::error::Result;
use crate::relation::{Environment, Relation};

/// Rename arrow separating old and new names in a rename parameter.
pub const RENAME_ARROW: char = '➡';

/// Unary operators; each carries a raw parameter string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnaryOp {
    /// σ
    Selection,
    /// π
    Projection,
    /// ρ
    Rename,
}

impl UnaryOp {
    /// All unary operators.
    pub const ALL: [UnaryOp; 3] = [UnaryOp::Selection, UnaryOp::Projection, UnaryOp::Rename];

    /// Operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Selection => "σ",
            UnaryOp::Projection => "π",
            UnaryOp::Rename => "ρ",
        }
    }

    /// Operator name used in plans and traces.
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Selection => "Selection",
            UnaryOp::Projection => "Projection",
            UnaryOp::Rename => "Rename",
        }
    }
}

/// Binary operators, all with the same precedence and left associativity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOp {
    /// `*`
    Product,
    /// `-`
    Difference,
    /// `∪`
    Union,
    /// `∩`
    Intersection,
    /// `÷`
    Division,
    /// `⋈`
    Join,
    /// `⧑`
    JoinLeft,
    /// `⧒`
    JoinRight,
    /// `⧓`
    JoinFull,
}

impl BinaryOp {
    /// All binary operators.
    pub const ALL: [BinaryOp; 9] = [
        BinaryOp::Product,
        BinaryOp::Difference,
        BinaryOp::Union,
        BinaryOp::Intersection,
        BinaryOp::Division,
        BinaryOp::Join,
        BinaryOp::JoinLeft,
        BinaryOp::JoinRight,
        BinaryOp::JoinFull,
    ];

    /// Canonical symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Product => "*",
            BinaryOp::Difference => "-",
            BinaryOp::Union => "∪",
            BinaryOp::Intersection => "∩",
            BinaryOp::Division => "÷",
            BinaryOp::Join => "⋈",
            BinaryOp::JoinLeft => "⧑",
            BinaryOp::JoinRight => "⧒",
            BinaryOp::JoinFull => "⧓",
        }
    }

    /// Older spellings still accepted on input.
    pub fn legacy_symbol(self) -> Option<&'static str> {
        match self {
            BinaryOp::Union => Some("ᑌ"),
            BinaryOp::Intersection => Some("ᑎ"),
            BinaryOp::Join => Some("ᐅᐊ"),
            BinaryOp::JoinLeft => Some("ᐅLEFTᐊ"),
            BinaryOp::JoinRight => Some("ᐅRIGHTᐊ"),
            BinaryOp::JoinFull => Some("ᐅFULLᐊ"),
            _ => None,
        }
    }

    /// Operator name used in plans and traces.
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Product => "Product",
            BinaryOp::Difference => "Difference",
            BinaryOp::Union => "Union",
            BinaryOp::Intersection => "Intersection",
            BinaryOp::Division => "Division",
            BinaryOp::Join => "Join",
            BinaryOp::JoinLeft => "LeftOuterJoin",
            BinaryOp::JoinRight => "RightOuterJoin",
            BinaryOp::JoinFull => "FullOuterJoin",
        }
    }

    /// Union, intersection and difference.
    pub fn is_set_op(self) -> bool {
        matches!(
            self,
            BinaryOp::Union | BinaryOp::Intersection | BinaryOp::Difference
        )
    }

    /// Natural and outer joins.
    pub fn is_join(self) -> bool {
        matches!(
            self,
            BinaryOp::Join | BinaryOp::JoinLeft | BinaryOp::JoinRight | BinaryOp::JoinFull
        )
    }

    /// Applies the operator to two evaluated relations.
    pub fn apply(self, left: &Relation, right: &Relation) -> Result<Relation> {
        match self {
            BinaryOp::Product => left.product(right),
            BinaryOp::Difference => left.difference(right),
            BinaryOp::Union => left.union(right),
            BinaryOp::Intersection => left.intersection(right),
            BinaryOp::Division => left.division(right),
            BinaryOp::Join => left.join(right),
            BinaryOp::JoinLeft => left.outer_left(right),
            BinaryOp::JoinRight => left.outer_right(right),
            BinaryOp::JoinFull => left.outer(right),
        }
    }
}

/// Relational-algebra expression tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    /// Reference to a named relation.
    Relation(String),
    /// Unary operator with its raw parameter.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Parameter text (predicate, attribute list or rename list).
        param: String,
        /// Operand.
        child: Box<Node>,
    },
    /// Infix binary operator.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Node>,
        /// Right operand.
        right: Box<Node>,
    },
}

impl Node {
    /// Leaf referencing `name`.
    pub fn relation(name: impl Into<String>) -> Node {
        Node::Relation(name.into())
    }

    /// Unary node.
    pub fn unary(op: UnaryOp, param: impl Into<String>, child: Node) -> Node {
        Node::Unary {
            op,
            param: param.into(),
            child: Box::new(child),
        }
    }

    /// Binary node.
    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `σ predicate (child)`.
    pub fn selection(predicate: impl Into<String>, child: Node) -> Node {
        Node::unary(UnaryOp::Selection, predicate, child)
    }

    /// Parameter and child when this is a unary node with operator `op`.
    pub fn as_unary(&self, op: UnaryOp) -> Option<(&str, &Node)> {
        match self {
            Node::Unary {
                op: found,
                param,
                child,
            } if *found == op => Some((param.as_str(), child.as_ref())),
            _ => None,
        }
    }

    /// Operator and children when this is a binary node.
    pub fn as_binary(&self) -> Option<(BinaryOp, &Node, &Node)> {
        match self {
            Node::Binary { op, left, right } => Some((*op, left.as_ref(), right.as_ref())),
            _ => None,
        }
    }

    /// Names of every relation the tree references.
    pub fn relations(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_relations(&mut names);
        names
    }

    fn collect_relations(&self, names: &mut BTreeSet<String>) {
        match self {
            Node::Relation(name) => {
                names.insert(name.clone());
            }
            Node::Unary { child, .. } => child.collect_relations(names),
            Node::Binary { left, right, .. } => {
                left.collect_relations(names);
                right.collect_relations(names);
            }
        }
    }

    /// Attribute list of the result, inferred without evaluating anything.
    pub fn result_format(&self, env: &Environment) -> Result<Vec<String>> {
        match self {
            Node::Relation(name) => Ok(env.get(name)?.header().attributes().to_vec()),
            Node::Unary { op, param, child } => {
                let attributes = child.result_format(env)?;
                match op {
                    UnaryOp::Selection => Ok(attributes),
                    UnaryOp::Projection => parse_projection(param),
                    UnaryOp::Rename => {
                        let map = parse_rename(param)?;
                        Ok(attributes
                            .into_iter()
                            .map(|a| map.get(&a).cloned().unwrap_or(a))
                            .collect())
                    }
                }
            }
            Node::Binary { op, left, right } => {
                let mut attributes = left.result_format(env)?;
                let right = right.result_format(env)?;
                match op {
                    BinaryOp::Product => attributes.extend(right),
                    BinaryOp::Union | BinaryOp::Intersection | BinaryOp::Difference => {}
                    BinaryOp::Division => attributes.retain(|a| !right.contains(a)),
                    BinaryOp::Join
                    | BinaryOp::JoinLeft
                    | BinaryOp::JoinRight
                    | BinaryOp::JoinFull => {
                        let extra: Vec<String> = right
                            .into_iter()
                            .filter(|a| !attributes.contains(a))
                            .collect();
                        attributes.extend(extra);
                    }
                }
                Ok(attributes)
            }
        }
    }

    /// Lowers the tree into an executable plan, decoding every parameter.
    pub fn lower(&self) -> Result<Plan> {
        Plan::from_node(self)
    }

    /// Evaluates the tree against `env`.
    pub fn compile(&self, env: &Environment) -> Result<Relation> {
        self.lower()?.execute(env)
    }

    /// Operator tree of the lowered plan.
    pub fn explain(&self) -> Result<ExplainNode> {
        Ok(self.lower()?.explain())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Relation(name) => f.write_str(name),
            Node::Unary { op, param, child } => write!(f, "{} {} ({})", op.symbol(), param, child),
            Node::Binary { op, left, right } => {
                write!(f, "{}{}", left, op.symbol())?;
                if matches!(**right, Node::Binary { .. }) {
                    write!(f, "({right})")
                } else {
                    write!(f, "{right}")
                }
            }
        }
    }
}
