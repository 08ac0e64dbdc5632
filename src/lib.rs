//! Relational-algebra query engine.
//!
//! Query text is tokenized and parsed into a [`Node`] tree, rewritten by the rule-based
//! [`Optimizer`] and either evaluated against an [`Environment`] of named relations or
//! split into a linear program of named steps.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod expr;
pub mod logging;
pub mod query;
pub mod relation;

pub use error::{RelalgError, Result};
pub use query::optimizer::{optimize_program, optimize_query, optimize_tree, Optimized, Optimizer, OptimizerConfig};
pub use query::split::split;
pub use query::{parse, BinaryOp, Node, UnaryOp};
pub use relation::{Environment, Header, Relation, Tuple, Value, ValueType};
