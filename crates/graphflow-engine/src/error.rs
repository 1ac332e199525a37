//! Error types for the execution engine.

use thiserror::Error;

use crate::condition::ConditionError;
use crate::store::StoreError;

/// Errors that can occur while driving a workflow.
///
/// A flat enum distinguishing engine-fatal failures (which abort `process`
/// and propagate) from step-local failures (which are recorded in session
/// state as a step error and never reach this type).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("condition error: {0}")]
    Condition(#[from] ConditionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no step is awaiting input for session {0}")]
    NotAwaitingInput(String),

    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors returned by a registered function invocation.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct FunctionError(pub String);

impl FunctionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
