//! The storage boundary the engine drives against.
//!
//! A thin, backend-agnostic contract that `graphflow-store` implements
//! twice (Postgres, in-memory).

use async_trait::async_trait;
use graphflow_model::{Edge, State, Step};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("mutator rejected the update: {0}")]
    Mutator(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// The read side of the graph store (component A), plus the single atomic
/// read-modify-write primitive session mutation funnels through.
///
/// `update_session` is the one write path: it opens a transaction, reads
/// current state, hands it to a mutator, writes the result back, and
/// commits. Rust's `#[async_trait]` trait objects can't carry generic
/// methods, so the mutator is boxed rather than a type parameter.
/// `graphflow_engine::session::SessionStore` (component B) wraps this with
/// the ergonomic generic-closure API callers actually use.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn get_step(&self, step_id: &str) -> Result<Option<Step>, StoreError>;

    async fn get_outgoing(&self, step_id: &str) -> Result<Vec<Edge>, StoreError>;

    async fn create_session_node(&self, state: &State) -> Result<(), StoreError>;

    async fn read_session_state(&self, session_id: &str) -> Result<Option<State>, StoreError>;

    /// Opens a transaction, reads the current state, hands it to `mutator`,
    /// writes the result back, and commits — or rolls back and propagates
    /// the mutator's error without persisting anything.
    async fn update_session(
        &self,
        session_id: &str,
        mutator: Box<dyn FnOnce(State) -> Result<State, StoreError> + Send>,
    ) -> Result<State, StoreError>;
}
