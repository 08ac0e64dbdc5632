#![forbid(unsafe_code)]

//! Error taxonomy shared by the tokenizer, parser, optimizer and relation engine.

use std::io;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RelalgError>;

/// Errors surfaced to callers of the query engine.
///
/// Every failure is returned synchronously to the immediate caller; the engine never
/// retries and never leaves an input relation half-modified.
#[derive(Debug, Error)]
pub enum RelalgError {
    /// Query text could not be split into tokens (unbalanced parentheses).
    #[error("tokenize error: {0}")]
    Tokenize(String),
    /// Tokens do not form a valid expression, or a name/parameter is malformed.
    #[error("parse error: {0}")]
    Parse(String),
    /// Attribute sets are incompatible with the requested operation.
    #[error("schema error: {0}")]
    Schema(String),
    /// A predicate failed while being evaluated against a tuple.
    #[error("evaluation error in `{predicate}` on tuple {tuple}: {message}")]
    Evaluation {
        /// Predicate source text.
        predicate: String,
        /// Rendered tuple the predicate was evaluated against.
        tuple: String,
        /// Underlying failure.
        message: String,
    },
    /// The environment has no relation with this name.
    #[error("name error: relation '{0}' is not defined")]
    Name(String),
    /// Raw filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// CSV decoding or encoding failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON decoding or encoding failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// A request that is valid but not supported (e.g. unknown file format).
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Caller supplied an invalid argument outside of query text.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RelalgError {
    /// Builds a [`RelalgError::Schema`] from anything displayable.
    pub fn schema(message: impl Into<String>) -> Self {
        RelalgError::Schema(message.into())
    }

    /// Builds a [`RelalgError::Parse`] from anything displayable.
    pub fn parse(message: impl Into<String>) -> Self {
        RelalgError::Parse(message.into())
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            RelalgError::Tokenize(_) => "TokenizeError",
            RelalgError::Parse(_) => "ParseError",
            RelalgError::Schema(_) => "SchemaError",
            RelalgError::Evaluation { .. } => "EvaluationError",
            RelalgError::Name(_) => "NameError",
            RelalgError::Io(_) => "IoError",
            RelalgError::Csv(_) => "CsvError",
            RelalgError::Json(_) => "JsonError",
            RelalgError::Unsupported(_) => "Unsupported",
            RelalgError::InvalidArgument(_) => "InvalidArgument",
        }
    }
}
