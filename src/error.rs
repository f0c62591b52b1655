//! Error types for exploration, caching and resumption

use crate::syntax::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SymexError {
    #[error("unsupported operator '{operator}' in `{expression}`")]
    UnsupportedOperator { operator: String, expression: String },

    #[error("unsupported if test `{test}`: expected a binary relational expression")]
    UnsupportedTest { test: String },

    #[error("unsupported declaration of '{name}': {reason}")]
    UnsupportedDeclaration { name: String, reason: String },

    #[error("unsupported assignment `{expression}`: only plain `=` to a variable is modelled")]
    UnsupportedAssignment { expression: String },

    #[error("unsupported statement {kind}: {source_text}")]
    UnsupportedStatement { kind: String, source_text: String },

    #[error("unsupported literal {literal}")]
    UnsupportedLiteral { literal: String },

    #[error("assignment to undeclared variable '{name}'")]
    UndeclaredVariable { name: String },

    #[error("comparison `{expression}` has no symbolic operand")]
    NonSymbolicComparison { expression: String },

    #[error("no cache entry matches {location}")]
    CacheMiss { location: String },

    #[error("corrupt cache record on line {line}: {source}")]
    CorruptCache {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("corrupt diff record on line {line}: {source}")]
    CorruptDiff {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SymexError>;
