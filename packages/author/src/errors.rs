//! Error types for the editor

use reprose_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    /// Feature set or key map could not be assembled
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Document validation error: {0}")]
    DocumentValidation(String),

    #[error("Nested session error: {0}")]
    NestedSession(String),

    #[error("Async action failed: {0}")]
    AsyncAction(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Editor is read-only")]
    ReadOnly,

    #[error("Editor is not recovering a document")]
    NotRecovering,

    /// The operation needs a valid document but one is being recovered
    #[error("Editor is recovering an invalid document")]
    Recovering,

    #[error("Unknown menu option: {group}.{option}")]
    UnknownMenuOption { group: String, option: String },
}

pub type EditorResult<T> = Result<T, EditorError>;
