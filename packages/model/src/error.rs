//! Error types for the document model

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),

    #[error("Invalid content expression for {node}: {reason}")]
    InvalidContentExpression { node: String, reason: String },

    #[error("Invalid content for node {node}: {reason}")]
    InvalidContent { node: String, reason: String },

    #[error("No value supplied for attribute {attr} on {node}")]
    MissingAttribute { node: String, attr: String },

    #[error("Mark {mark} is not allowed in {node}")]
    MarkNotAllowed { node: String, mark: String },

    #[error("Invalid document JSON: {0}")]
    InvalidJson(String),

    #[error("Position {pos} out of range (content size {size})")]
    PositionOutOfRange { pos: usize, size: usize },

    #[error("Invalid replace: {0}")]
    InvalidReplace(String),

    #[error("No node at position {0}")]
    NoNodeAt(usize),

    #[error("Transaction was built against a different document")]
    MismatchedTransaction,
}

/// Result alias used throughout the model crate
pub type ModelResult<T> = Result<T, ModelError>;
