//! `PgGraphStore` — the production `GraphStore` backend.
//!
//! `sqlx::query_as` for typed reads, and `pool.begin()` /
//! `.execute(&mut *tx)` / `tx.commit()` for the one write path that must be
//! transactional (`update_session`).

use async_trait::async_trait;
use graphflow_engine::{GraphStore, StoreError};
use graphflow_model::{Edge, Operator, State, Step, Value as GfValue};
use sqlx::PgPool;
use tracing::info;

use super::entities::{EdgeRow, SessionRow, StepRow};

#[derive(Clone)]
pub struct PgGraphStore {
    pool: PgPool,
}

impl PgGraphStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the crate's bundled migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        info!("graph store migrations applied");
        Ok(())
    }
}

fn step_from_row(row: StepRow) -> Step {
    let function = if !row.function.is_empty() {
        row.function
    } else {
        row.utility.unwrap_or_default()
    };
    Step {
        id: row.id,
        function,
        input_template: row.input_template.map(GfValue::from_json),
        description: row.description,
        tags: row.tags,
    }
}

fn edge_from_row(row: EdgeRow) -> Edge {
    let operator = if row.operator.eq_ignore_ascii_case("OR") {
        Operator::Or
    } else {
        Operator::And
    };
    Edge {
        source: row.source,
        target: row.target,
        condition: row.condition.map(GfValue::from_json),
        operator,
        priority: row.priority,
    }
}

#[async_trait]
impl GraphStore for PgGraphStore {
    async fn get_step(&self, step_id: &str) -> Result<Option<Step>, StoreError> {
        let row = sqlx::query_as::<_, StepRow>(
            "SELECT id, function, utility, input_template, description, tags FROM steps WHERE id = $1",
        )
        .bind(step_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(row.map(step_from_row))
    }

    async fn get_outgoing(&self, step_id: &str) -> Result<Vec<Edge>, StoreError> {
        let rows = sqlx::query_as::<_, EdgeRow>(
            "SELECT source, target, condition, operator, priority FROM edges \
             WHERE source = $1 ORDER BY priority ASC",
        )
        .bind(step_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(rows.into_iter().map(edge_from_row).collect())
    }

    async fn create_session_node(&self, state: &State) -> Result<(), StoreError> {
        let state_json = serde_json::to_value(state)?;
        sqlx::query(
            "INSERT INTO sessions (id, state, created_at, updated_at) VALUES ($1, $2, now(), now())",
        )
        .bind(&state.id)
        .bind(state_json)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(())
    }

    async fn read_session_state(&self, session_id: &str) -> Result<Option<State>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT id, state FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        row.map(|r| serde_json::from_value(r.state).map_err(StoreError::from)).transpose()
    }

    async fn update_session(
        &self,
        session_id: &str,
        mutator: Box<dyn FnOnce(State) -> Result<State, StoreError> + Send>,
    ) -> Result<State, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| StoreError::Connection(e.to_string()))?;

        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, state FROM sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?
        .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;

        let current: State = serde_json::from_value(row.state)?;
        let updated = match mutator(current) {
            Ok(s) => s,
            Err(e) => {
                // Rolling back by dropping `tx` without committing.
                return Err(e);
            }
        };

        let updated_json = serde_json::to_value(&updated)?;
        sqlx::query("UPDATE sessions SET state = $2, updated_at = now() WHERE id = $1")
            .bind(session_id)
            .bind(updated_json)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        tx.commit().await.map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(updated)
    }
}
