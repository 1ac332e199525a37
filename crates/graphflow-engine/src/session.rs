//! Session Store (component B) — optimistic-concurrency access to session
//! state, built once on top of any `GraphStore` implementation.
//!
//! Layers the `update`/`create`/`get` API a caller actually wants on top
//! of the flat CRUD primitives `GraphStore` exposes to backends.

use std::sync::Arc;

use graphflow_model::{State, Value};

use crate::error::EngineError;
use crate::store::{GraphStore, StoreError};

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn GraphStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<State>, EngineError> {
        Ok(self.store.read_session_state(session_id).await?)
    }

    /// Build a fresh session. `seed_data`, if present, is stored both as a
    /// per-key synthetic completed output and as a single combined entry
    /// under the reserved id `initial`.
    pub async fn create(
        &self,
        session_id: impl Into<String>,
        seed_data: Option<Value>,
    ) -> Result<State, EngineError> {
        let mut state = State::new(session_id.into());

        if let Some(seed) = seed_data {
            if let Value::Map(fields) = &seed {
                for (key, value) in fields {
                    state.push_output(key, value.clone());
                }
            }
            state.push_output("initial", seed);
        }

        self.store.create_session_node(&state).await?;
        Ok(state)
    }

    /// Read-modify-write a session's state through the store's transaction
    /// primitive. The mutator never sees a shared reference into stored
    /// state — only an owned copy it must return a replacement for.
    pub async fn update<F>(&self, session_id: &str, mutator: F) -> Result<State, EngineError>
    where
        F: FnOnce(State) -> Result<State, EngineError> + Send + 'static,
    {
        let boxed: Box<dyn FnOnce(State) -> Result<State, StoreError> + Send> =
            Box::new(move |state| mutator(state).map_err(|e| StoreError::Mutator(e.to_string())));
        Ok(self.store.update_session(session_id, boxed).await?)
    }
}
