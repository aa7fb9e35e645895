//! Errors raised by the library itself (as opposed to the records it builds).

use thiserror::Error;

use crate::types::ErrorRef;

/// Attaching to something that is not a structured value.
///
/// Signals a programming mistake. The offending sub-error travels with the
/// failure so it is not lost.
#[derive(Debug, Error)]
#[error("Cannot add error to non object")]
pub struct AggregationError {
    /// The error that could not be attached.
    pub errors: Vec<ErrorRef>,
}

/// Failures while declaring error kinds.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Kind already declared: {name}")]
    Duplicate { name: String },

    #[error("Unknown parent kind `{parent}` for `{name}`")]
    UnknownParent { name: String, parent: String },

    #[error("Kind name must not be empty")]
    EmptyName,

    #[error("Invalid kind declarations: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
