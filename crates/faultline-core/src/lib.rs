//! faultline-core: composable error trees.
//!
//! This crate defines:
//! - [`ErrorRecord`] / [`ErrorRef`]: the error shape and its shared handle
//! - [`ErrorKind`]: named defaults records are built from, with inheritance
//! - [`add`] / [`rebase`]: merging errors into trees
//! - [`stack::render`]: the indented diagnostic text of a tree
//! - [`json::project`]: redacted JSON views of a tree
//! - [`KindRegistry`]: the trait for looking up declared kinds

pub mod aggregate;
pub mod capture;
pub mod error;
pub mod json;
pub mod kind;
pub mod registry;
pub mod stack;
pub mod types;
pub mod value;

pub use aggregate::{add, add_at, add_value, rebase};
pub use capture::{HeadlineCapture, StackCapture};
pub use error::{AggregationError, RegistryError};
pub use json::{project, project_all, project_value, to_client, Exclude, Exclusion, Projection};
pub use kind::{CauseOrField, ErrorKind, Init, KindBuilder, KindSpec};
pub use registry::{KindRegistry, MemoryKindRegistry};
pub use stack::{render, render_all, render_value, render_with, Depth};
pub use types::{
    Additional, ErrorRecord, ErrorRef, FieldErrors, DEFAULT_MESSAGE, DEFAULT_STATUS, UNKNOWN_NAME,
};
pub use value::from_value;
