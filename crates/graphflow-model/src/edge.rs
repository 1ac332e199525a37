//! NEXT edges — directed connections between steps, gated by conditions.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Top-level boolean combinator for an edge's clause list, or for the
/// `true`/`false` keys inside a single clause.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    #[default]
    And,
    Or,
}

/// A directed edge from one step to another: a single NEXT relation per
/// pair of steps, gated by an optional condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,

    /// Serialized condition clause list (see `graphflow_engine::condition`).
    /// `None`/empty means the edge is unconditionally taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,

    #[serde(default)]
    pub operator: Operator,

    /// Lower activates first; ties break by discovery order.
    #[serde(default)]
    pub priority: i64,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            condition: None,
            operator: Operator::default(),
            priority: 0,
        }
    }

    pub fn is_unconditional(&self) -> bool {
        match &self.condition {
            None => true,
            Some(Value::List(clauses)) => clauses.is_empty(),
            Some(_) => false,
        }
    }
}
