//! Session state document — the mutable record of one workflow execution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::step::ROOT_STEP_ID;
use crate::value::Value;

/// Per-step status within a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Active,
    Pending,
    Complete,
    Error,
    AwaitingInput,
}

/// Tracking record for one step within a session's `workflow` map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRecord {
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default)]
    pub last_executed: i64,
    /// The edge priority that activated this step (lower activates first);
    /// `0` for the root step or any activation not introduced by an edge.
    #[serde(default)]
    pub priority: i64,
    /// Monotonic tiebreaker among steps sharing a priority, assigned from
    /// `State::activation_counter` at activation time — insertion order.
    #[serde(default)]
    pub activation_seq: u64,
    /// The step's `util.request_input`-style resolved call arguments while
    /// `status == AwaitingInput`. Kept off the step's output window so
    /// `outputs[step_id]` only ever holds completed results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awaiting_payload: Option<Value>,
}

impl StepRecord {
    pub fn new(status: StepStatus) -> Self {
        Self {
            status,
            error: String::new(),
            last_executed: 0,
            priority: 0,
            activation_seq: 0,
            awaiting_payload: None,
        }
    }

    pub fn active() -> Self {
        Self::new(StepStatus::Active)
    }
}

/// Conversational role for a message entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Value,
    pub timestamp: i64,
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Maximum number of outputs retained per step — the rolling window.
pub const OUTPUT_WINDOW: usize = 5;

/// The per-execution mutable record: which steps are active/complete/
/// pending/errored, the rolling per-step output windows, and message
/// history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct State {
    pub id: String,
    pub workflow: BTreeMap<String, StepRecord>,
    pub last_evaluated: i64,
    pub data: StateData,
    /// Source of `StepRecord::activation_seq`; incremented on every
    /// activation so concurrently active steps can be ordered by the order
    /// they were actually activated in, independent of step-id sort order.
    #[serde(default)]
    pub activation_counter: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StateData {
    pub outputs: BTreeMap<String, Vec<Value>>,
    pub messages: Vec<Message>,
}

impl State {
    /// Build the initial document for a freshly created session: just the
    /// root step, active, and nothing else.
    pub fn new(id: impl Into<String>) -> Self {
        let mut workflow = BTreeMap::new();
        let mut root = StepRecord::active();
        root.activation_seq = 1;
        workflow.insert(ROOT_STEP_ID.to_string(), root);
        Self {
            id: id.into(),
            workflow,
            last_evaluated: 0,
            data: StateData::default(),
            activation_counter: 1,
        }
    }

    /// Append an output to a step's rolling window, evicting the oldest
    /// entry once the window would exceed `OUTPUT_WINDOW`.
    pub fn push_output(&mut self, step_id: &str, value: Value) {
        let entries = self.data.outputs.entry(step_id.to_string()).or_default();
        entries.push(value);
        if entries.len() > OUTPUT_WINDOW {
            entries.remove(0);
        }
    }

    pub fn step_status(&self, step_id: &str) -> Option<StepStatus> {
        self.workflow.get(step_id).map(|r| r.status)
    }

    pub fn set_status(&mut self, step_id: &str, status: StepStatus) {
        let record = self.workflow.entry(step_id.to_string()).or_insert_with(|| StepRecord::new(status));
        record.status = status;
        if status != StepStatus::AwaitingInput {
            record.awaiting_payload = None;
        }
    }

    /// Activate a step with no edge priority (root re-activation, pending
    /// retries). See `activate_with_priority` for the edge-driven case.
    pub fn activate(&mut self, step_id: &str) {
        self.activate_with_priority(step_id, 0);
    }

    /// Activate a step, clearing any error left over from a previous
    /// attempt — re-activation through an edge is how a failing branch
    /// recovers. `priority` is the firing edge's priority (lower activates
    /// first among steps made active in the same round); `activation_seq`
    /// is stamped from the session's own counter to break ties by the
    /// order activation actually happened in.
    pub fn activate_with_priority(&mut self, step_id: &str, priority: i64) {
        self.activation_counter += 1;
        let seq = self.activation_counter;
        let record = self.workflow.entry(step_id.to_string()).or_insert_with(StepRecord::active);
        record.status = StepStatus::Active;
        record.error.clear();
        record.awaiting_payload = None;
        record.priority = priority;
        record.activation_seq = seq;
    }

    pub fn set_error(&mut self, step_id: &str, message: impl Into<String>) {
        let record = self
            .workflow
            .entry(step_id.to_string())
            .or_insert_with(|| StepRecord::new(StepStatus::Error));
        record.status = StepStatus::Error;
        record.error = message.into();
    }

    /// Mark a step suspended on input, stashing its resolved call
    /// arguments for later retrieval without re-running the step.
    pub fn set_awaiting(&mut self, step_id: &str, payload: Value) {
        let record = self
            .workflow
            .entry(step_id.to_string())
            .or_insert_with(|| StepRecord::new(StepStatus::AwaitingInput));
        record.status = StepStatus::AwaitingInput;
        record.awaiting_payload = Some(payload);
    }

    /// The single step currently suspended on input, if any.
    pub fn awaiting_step(&self) -> Option<&str> {
        self.workflow
            .iter()
            .find(|(_, rec)| rec.status == StepStatus::AwaitingInput)
            .map(|(id, _)| id.as_str())
    }

    /// The step currently suspended on input together with its stashed
    /// call arguments, if any.
    pub fn awaiting(&self) -> Option<(&str, &Value)> {
        self.workflow.iter().find_map(|(id, rec)| {
            if rec.status == StepStatus::AwaitingInput {
                rec.awaiting_payload.as_ref().map(|payload| (id.as_str(), payload))
            } else {
                None
            }
        })
    }
}
