//! Step definitions — the workflow graph's nodes.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A single unit of work in a workflow graph: a function reference plus a
/// parameter template. No UI position, no node-type registry, no
/// credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    /// Unique identifier within the workflow. `"root"` is the distinguished
    /// entry point reachable only by outbound edges.
    pub id: String,

    /// Dotted function name to invoke. Empty means "no-op, succeed with an
    /// empty result".
    #[serde(default)]
    pub function: String,

    /// Parameter template, resolved against session state before dispatch.
    /// `None` is equivalent to an empty object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_template: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Step {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            function: String::new(),
            input_template: None,
            description: None,
            tags: Vec::new(),
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    pub fn with_input(mut self, template: Value) -> Self {
        self.input_template = Some(template);
        self
    }

    pub fn is_no_op(&self) -> bool {
        self.function.is_empty()
    }
}

pub const ROOT_STEP_ID: &str = "root";
