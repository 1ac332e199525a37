//! In-memory `GraphStore` — a zero-dependency default for local development
//! and the backing store engine unit/integration tests run against.
//!
//! `Arc<RwLock<HashMap<...>>>` plus a `Default`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use graphflow_engine::{GraphStore, StoreError};
use graphflow_model::{Edge, State, Step};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
struct Graph {
    steps: HashMap<String, Step>,
    edges: HashMap<String, Vec<Edge>>,
}

/// In-memory implementation of the graph store and session store contract.
///
/// The workflow graph (`steps`/`edges`) is seeded up front via
/// [`InMemoryGraphStore::with_step`]/[`with_edge`]; session state lives in a
/// separate map mutated through `update_session`.
pub struct InMemoryGraphStore {
    graph: Graph,
    sessions: Arc<RwLock<HashMap<String, State>>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self {
            graph: Graph::default(),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.graph.steps.insert(step.id.clone(), step);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.graph.edges.entry(edge.source.clone()).or_default().push(edge);
        self
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn get_step(&self, step_id: &str) -> Result<Option<Step>, StoreError> {
        Ok(self.graph.steps.get(step_id).cloned())
    }

    async fn get_outgoing(&self, step_id: &str) -> Result<Vec<Edge>, StoreError> {
        Ok(self.graph.edges.get(step_id).cloned().unwrap_or_default())
    }

    async fn create_session_node(&self, state: &State) -> Result<(), StoreError> {
        self.sessions.write().await.insert(state.id.clone(), state.clone());
        Ok(())
    }

    async fn read_session_state(&self, session_id: &str) -> Result<Option<State>, StoreError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn update_session(
        &self,
        session_id: &str,
        mutator: Box<dyn FnOnce(State) -> Result<State, StoreError> + Send>,
    ) -> Result<State, StoreError> {
        let mut sessions = self.sessions.write().await;
        let current = sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;
        let updated = mutator(current)?;
        sessions.insert(session_id.to_string(), updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphflow_model::StepStatus;

    #[tokio::test]
    async fn round_trips_session_state() {
        let store = InMemoryGraphStore::new();
        let state = State::new("s1");
        store.create_session_node(&state).await.unwrap();

        let loaded = store.read_session_state("s1").await.unwrap().unwrap();
        assert_eq!(loaded.id, "s1");
    }

    #[tokio::test]
    async fn update_session_rolls_back_on_mutator_error() {
        let store = InMemoryGraphStore::new();
        store.create_session_node(&State::new("s1")).await.unwrap();

        let result = store
            .update_session(
                "s1",
                Box::new(|_state| Err(StoreError::Mutator("nope".to_string()))),
            )
            .await;
        assert!(result.is_err());

        let loaded = store.read_session_state("s1").await.unwrap().unwrap();
        assert_eq!(loaded.step_status("root"), Some(StepStatus::Active));
    }

    #[tokio::test]
    async fn get_step_and_outgoing_reflect_seeded_graph() {
        let store = InMemoryGraphStore::new()
            .with_step(Step::new("root"))
            .with_edge(Edge::new("root", "next"));

        assert!(store.get_step("root").await.unwrap().is_some());
        assert!(store.get_step("missing").await.unwrap().is_none());
        assert_eq!(store.get_outgoing("root").await.unwrap().len(), 1);
        assert!(store.get_outgoing("next").await.unwrap().is_empty());
    }
}
