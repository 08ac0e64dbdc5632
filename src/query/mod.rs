#![forbid(unsafe_code)]

//! Relational-algebra queries: parsing, rewriting, evaluation and splitting.
//!
//! Query text goes through the [`tokenizer`] and [`parser`] into an [`ast::Node`]
//! tree. The [`optimizer`] drives the rewrite [`rules`] to a fixpoint, [`plan`]
//! lowers a tree into relation-engine calls, and [`split`] factors a tree into a
//! linear program of named steps.

/// Expression tree and operator tags.
pub mod ast;

/// Fixpoint driver over the rewrite rules, plus program optimization.
pub mod optimizer;

/// Projection and rename parameter codecs.
pub mod params;

/// Token list to expression tree.
pub mod parser;

/// Executable plans and explain output.
pub mod plan;

/// Semantics-preserving rewrite rules.
///
/// General rules look only at the tree; specific rules also consult the schema of
/// the relations in the environment.
pub mod rules;

/// Common-subexpression splitting into named steps.
pub mod split;

/// Query text to nested tokens.
pub mod tokenizer;

pub use ast::{BinaryOp, Node, UnaryOp, RENAME_ARROW};
pub use optimizer::{Optimized, Optimizer, OptimizerConfig, TraceStep};
pub use parser::parse;
pub use plan::{ExplainNode, ExplainProp, Plan};
pub use split::Program;
