//! Row types for the Postgres-backed graph store.
//!
//! Plain `sqlx::FromRow` structs with no behavior beyond shape.

use serde_json::Value as Json;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct StepRow {
    pub id: String,
    pub function: String,
    /// Legacy attribute name, tolerated as a read-side fallback: used only
    /// when `function` is empty.
    pub utility: Option<String>,
    pub input_template: Option<Json>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct EdgeRow {
    pub source: String,
    pub target: String,
    pub condition: Option<Json>,
    pub operator: String,
    pub priority: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub state: Json,
}
