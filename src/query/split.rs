//! Factoring an expression tree into a linear program of named steps.
//!
//! Every operator node becomes a step `name = expression` whose operands are leaves
//! or earlier steps. Structurally equal sub-expressions share a step, so a query
//! that repeats a join evaluates it once.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;

use super::ast::Node;
use crate::relation::Environment;

/// Prefix of generated step names.
pub const STEP_PREFIX: &str = "optm_";

/// One assignment of a split program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    /// Name bound by the step.
    pub name: String,
    /// Expression over leaves and names of earlier steps.
    pub expr: Node,
}

/// Steps in evaluation order; the last one computes the whole query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    /// Assignments in order.
    pub steps: Vec<Step>,
}

impl Program {
    /// Splits `tree`, choosing names that collide with neither the relations in
    /// `env` nor the tree's own leaves.
    pub fn from_tree(tree: &Node, env: &Environment) -> Program {
        let mut avoid: BTreeSet<String> = env.names().map(str::to_owned).collect();
        avoid.extend(tree.relations());
        let mut splitter = Splitter {
            names: NameGen::new(avoid),
            seen: FxHashMap::default(),
            steps: Vec::new(),
        };
        if let Node::Relation(_) = tree {
            splitter.push(tree.clone());
        } else {
            splitter.visit(tree);
        }
        Program {
            steps: splitter.steps,
        }
    }

    /// Name holding the query result.
    pub fn result(&self) -> Option<&str> {
        self.steps.last().map(|step| step.name.as_str())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{} = {}", step.name, step.expr)?;
        }
        Ok(())
    }
}

/// Splits `tree` and renders the program, one step per line.
pub fn split(tree: &Node, env: &Environment) -> String {
    Program::from_tree(tree, env).to_string()
}

struct Splitter {
    names: NameGen,
    seen: FxHashMap<Node, String>,
    steps: Vec<Step>,
}

impl Splitter {
    /// Returns the leaf standing for `node` once its steps are emitted.
    fn visit(&mut self, node: &Node) -> Node {
        let expr = match node {
            Node::Relation(_) => return node.clone(),
            Node::Unary { op, param, child } => Node::unary(*op, param.clone(), self.visit(child)),
            Node::Binary { op, left, right } => {
                let left = self.visit(left);
                let right = self.visit(right);
                Node::binary(*op, left, right)
            }
        };
        if let Some(name) = self.seen.get(&expr) {
            return Node::relation(name.clone());
        }
        self.push(expr)
    }

    fn push(&mut self, expr: Node) -> Node {
        let name = self.names.next_name();
        self.seen.insert(expr.clone(), name.clone());
        self.steps.push(Step {
            name: name.clone(),
            expr,
        });
        Node::relation(name)
    }
}

/// `optm_a`, `optm_b`, … `optm_z`, `optm_ba`, … skipping taken names.
struct NameGen {
    counter: usize,
    avoid: BTreeSet<String>,
}

impl NameGen {
    fn new(avoid: BTreeSet<String>) -> Self {
        Self { counter: 0, avoid }
    }

    fn next_name(&mut self) -> String {
        loop {
            let name = format!("{STEP_PREFIX}{}", base26(self.counter));
            self.counter += 1;
            if !self.avoid.contains(&name) {
                return name;
            }
        }
    }
}

fn base26(mut counter: usize) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(char::from(b'a' + (counter % 26) as u8));
        if counter < 26 {
            break;
        }
        counter /= 26;
    }
    digits.iter().rev().collect()
}
