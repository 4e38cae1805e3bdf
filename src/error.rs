//! Error types for stagehand
//!
//! Contract violations are reported synchronously at the call site and never
//! partially applied; instantiation failures carry their original cause.

use thiserror::Error;

/// Stagehand error type
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("illegal state in {operation}: expected {expected}, actual {actual}")]
    IllegalState {
        operation: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error("scene tag `{0}` already exists in this stack")]
    DuplicateTag(String),

    #[error("illegal pop count {count}, stack size is {stack_size}")]
    IllegalPopCount { count: usize, stack_size: usize },

    #[error("no scene with tag `{0}` in this stack")]
    UnknownTag(String),

    #[error("suppress token mismatch: expected `{expected}`, released `{released}`")]
    SuppressTokenMismatch { expected: String, released: String },

    #[error("unable to instantiate scene `{type_key}`: make sure the type key is registered and its constructor succeeds")]
    Instantiation {
        type_key: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{0} can't be empty")]
    MissingArgument(&'static str),

    #[error("state restore requested but restore support is disabled")]
    RestoreUnsupported,

    #[error("cannot change view creation mode after the scene is attached")]
    CreationModeSealed,

    #[error("saved state is missing or malformed: {0}")]
    CorruptSavedState(String),
}

impl NavigationError {
    pub(crate) fn illegal_state(
        operation: &'static str,
        expected: &'static str,
        actual: impl Into<String>,
    ) -> Self {
        NavigationError::IllegalState {
            operation,
            expected,
            actual: actual.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NavigationError>;
