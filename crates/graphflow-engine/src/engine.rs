//! Workflow Engine (component F) — the activate/execute/advance drive loop.
//!
//! Drives a session's active steps forward one iteration at a time:
//! resolve each active step's inputs, dispatch to its function (or suspend
//! for input), commit the resulting mutations, then advance edges out of
//! whatever just completed.

use std::collections::HashMap;
use std::sync::Arc;

use graphflow_model::{Message, Role, State, Step, StepRecord, StepStatus, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::registry::{FunctionRegistry, REPLY_FUNCTION};
use crate::session::SessionStore;
use crate::store::GraphStore;
use crate::{condition, expr};

/// Default safety bound on drive-loop iterations per `process` call.
pub const DEFAULT_ITERATION_MAX: u32 = 1000;

/// What `process`/`submit_input` leave the caller to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// No step is active, pending, or awaiting input.
    Completed,
    /// A step suspended the workflow waiting for a user message.
    AwaitingInput {
        step_id: String,
        prompt: Value,
        options: Option<Value>,
    },
    /// The iteration safety bound was hit; callers may call `process` again.
    IterationLimitReached,
}

/// Outcome of evaluating a single active step, computed before any state
/// mutation is committed (function calls are awaited here, outside any
/// transaction; the SessionStore's mutator closure is synchronous).
enum StepOutcome {
    Pending(String),
    Error(String, String),
    Complete {
        step_id: String,
        function: String,
        output: Value,
    },
    AwaitingInput {
        step_id: String,
        payload: Value,
    },
}

pub struct WorkflowEngine {
    store: Arc<dyn GraphStore>,
    sessions: SessionStore,
    registry: FunctionRegistry,
    max_iterations: u32,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn GraphStore>, registry: FunctionRegistry) -> Self {
        Self::with_iteration_max(store, registry, DEFAULT_ITERATION_MAX)
    }

    pub fn with_iteration_max(store: Arc<dyn GraphStore>, registry: FunctionRegistry, max_iterations: u32) -> Self {
        Self {
            sessions: SessionStore::new(store.clone()),
            store,
            registry,
            max_iterations,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    async fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(session_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Drive `session_id` until it completes, suspends, or hits the
    /// iteration cap.
    pub async fn process(&self, session_id: &str) -> Result<ProcessOutcome, EngineError> {
        let session_lock = self.lock_for(session_id).await;
        let _guard = session_lock.lock().await;
        self.drive(session_id).await
    }

    /// Resume a session suspended on `awaiting_input` with a user-supplied
    /// value, then drive it forward.
    pub async fn submit_input(&self, session_id: &str, user_input: Value) -> Result<ProcessOutcome, EngineError> {
        let session_lock = self.lock_for(session_id).await;
        let _guard = session_lock.lock().await;

        let current = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| EngineError::UnknownSession(session_id.to_string()))?;
        let step_id = current
            .awaiting_step()
            .ok_or_else(|| EngineError::NotAwaitingInput(session_id.to_string()))?
            .to_string();

        let now = now_ts();
        let input_for_closure = user_input.clone();
        let step_id_for_closure = step_id.clone();
        let post_step_state = self
            .sessions
            .update(session_id, move |mut state| {
                state.push_output(&step_id_for_closure, input_for_closure.clone());
                state.data.messages.push(Message {
                    role: Role::User,
                    content: input_for_closure.clone(),
                    timestamp: now,
                    id: None,
                });
                state.set_status(&step_id_for_closure, StepStatus::Complete);
                let record = state.workflow.get_mut(&step_id_for_closure).expect("just set above");
                record.last_executed = now;
                Ok(state)
            })
            .await?;

        // The resumed step completed outside the drive loop's own
        // completed_ids tracking, so its outgoing edges have to be
        // advanced explicitly here before `drive` re-reads state.
        self.advance_edges(session_id, &[step_id], &post_step_state).await?;

        self.drive(session_id).await
    }

    async fn drive(&self, session_id: &str) -> Result<ProcessOutcome, EngineError> {
        // Set the iteration after something completed elsewhere; a pending
        // step is only worth retrying in that one following iteration (it
        // may have been waiting on a sibling's output). If retrying still
        // doesn't resolve it, nothing completed, so the flag clears and we
        // report completion instead of spinning to the iteration cap.
        let mut retry_pending = false;

        for iteration in 0..self.max_iterations {
            let state = self
                .sessions
                .get(session_id)
                .await?
                .ok_or_else(|| EngineError::UnknownSession(session_id.to_string()))?;

            // Priority order (lower first), ties broken by activation
            // order — not step-id order, which is an artifact of
            // `workflow` being a `BTreeMap`.
            let mut active: Vec<(&String, &StepRecord)> = state
                .workflow
                .iter()
                .filter(|(_, record)| record.status == StepStatus::Active)
                .collect();
            active.sort_by_key(|(_, record)| (record.priority, record.activation_seq));
            let active_ids: Vec<String> = active.into_iter().map(|(id, _)| id.clone()).collect();

            if active_ids.is_empty() {
                if state.step_status(graphflow_model::ROOT_STEP_ID).is_none() {
                    self.sessions
                        .update(session_id, |mut state| {
                            state.activate(graphflow_model::ROOT_STEP_ID);
                            Ok(state)
                        })
                        .await?;
                    continue;
                }

                let pending_ids: Vec<String> = state
                    .workflow
                    .iter()
                    .filter(|(_, record)| record.status == StepStatus::Pending)
                    .map(|(id, _)| id.clone())
                    .collect();

                if pending_ids.is_empty() || !retry_pending {
                    debug!(session_id, iteration, "no resolvable active or pending steps; workflow complete");
                    return Ok(ProcessOutcome::Completed);
                }

                retry_pending = false;
                self.sessions
                    .update(session_id, move |mut state| {
                        for id in &pending_ids {
                            state.activate(id);
                        }
                        Ok(state)
                    })
                    .await?;
                continue;
            }

            // Steps are evaluated in order and processing stops for this
            // iteration the moment one suspends — later active steps are
            // left untouched and retried on the next `process` call.
            let mut outcomes = Vec::with_capacity(active_ids.len());
            let mut suspended = None;
            for step_id in &active_ids {
                let outcome = self.evaluate_step(step_id, &state).await?;
                if let StepOutcome::AwaitingInput { step_id, payload } = &outcome {
                    suspended = Some((step_id.clone(), payload.clone()));
                    outcomes.push(outcome);
                    break;
                }
                outcomes.push(outcome);
            }

            if let Some((step_id, payload)) = suspended {
                self.apply_outcomes(session_id, outcomes).await?;
                let prompt = payload.get("prompt").cloned().unwrap_or(Value::Null);
                let options = payload.get("options").cloned();
                info!(session_id, step_id, "suspended awaiting input");
                return Ok(ProcessOutcome::AwaitingInput { step_id, prompt, options });
            }

            let completed_ids: Vec<String> = outcomes
                .iter()
                .filter_map(|o| match o {
                    StepOutcome::Complete { step_id, .. } => Some(step_id.clone()),
                    _ => None,
                })
                .collect();

            let post_step_state = self.apply_outcomes(session_id, outcomes).await?;

            retry_pending = !completed_ids.is_empty();
            if retry_pending {
                self.advance_edges(session_id, &completed_ids, &post_step_state).await?;
            }
        }

        warn!(session_id, max_iterations = self.max_iterations, "iteration cap reached");
        Ok(ProcessOutcome::IterationLimitReached)
    }

    async fn evaluate_step(&self, step_id: &str, state: &State) -> Result<StepOutcome, EngineError> {
        let Some(step): Option<Step> = self.store.get_step(step_id).await? else {
            return Ok(StepOutcome::Error(step_id.to_string(), "Step not found".to_string()));
        };

        if step.is_no_op() {
            debug!(step_id, "no-op step; trivial success");
            return Ok(StepOutcome::Complete {
                step_id: step_id.to_string(),
                function: String::new(),
                output: Value::map(),
            });
        }

        let template = step.input_template.clone().unwrap_or_else(Value::map);
        let resolved = match expr::resolve_value(&template, &state.data.outputs) {
            Ok(v) => v,
            Err(expr::Unresolved) => {
                debug!(step_id, "input unresolved; marking pending");
                return Ok(StepOutcome::Pending(step_id.to_string()));
            }
        };

        if self.registry.suspends_execution(&step.function) {
            debug!(step_id, function = %step.function, "suspending for input");
            return Ok(StepOutcome::AwaitingInput {
                step_id: step_id.to_string(),
                payload: resolved,
            });
        }

        let Some(function) = self.registry.get(&step.function) else {
            warn!(step_id, function = %step.function, "unregistered function");
            return Ok(StepOutcome::Error(
                step_id.to_string(),
                format!("Utility not found: {}", step.function),
            ));
        };

        let args = resolved.as_map().cloned().unwrap_or_default().into_iter().collect();
        match function.call(args).await {
            Ok(output) => Ok(StepOutcome::Complete {
                step_id: step_id.to_string(),
                function: step.function.clone(),
                output,
            }),
            Err(e) => {
                warn!(step_id, error = %e, "function call failed");
                Ok(StepOutcome::Error(step_id.to_string(), e.0))
            }
        }
    }

    async fn apply_outcomes(&self, session_id: &str, outcomes: Vec<StepOutcome>) -> Result<State, EngineError> {
        let now = now_ts();
        self.sessions
            .update(session_id, move |mut state| {
                for outcome in outcomes {
                    match outcome {
                        StepOutcome::Pending(step_id) => {
                            state.set_status(&step_id, StepStatus::Pending);
                        }
                        StepOutcome::Error(step_id, message) => {
                            state.set_error(&step_id, message);
                        }
                        StepOutcome::Complete { step_id, function, output } => {
                            state.push_output(&step_id, output.clone());
                            state.set_status(&step_id, StepStatus::Complete);
                            if let Some(record) = state.workflow.get_mut(&step_id) {
                                record.last_executed = now;
                            }
                            if function == REPLY_FUNCTION {
                                state.data.messages.push(Message {
                                    role: Role::Assistant,
                                    content: output,
                                    timestamp: now,
                                    id: None,
                                });
                            }
                        }
                        StepOutcome::AwaitingInput { step_id, payload } => {
                            state.set_awaiting(&step_id, payload);
                        }
                    }
                }
                Ok(state)
            })
            .await
    }

    async fn advance_edges(
        &self,
        session_id: &str,
        completed_ids: &[String],
        state_after_steps: &State,
    ) -> Result<(), EngineError> {
        struct Candidate {
            target: String,
            priority: i64,
            order: usize,
        }

        let mut candidates = Vec::new();
        let mut order = 0usize;
        for step_id in completed_ids {
            let edges = self.store.get_outgoing(step_id).await?;
            for edge in edges {
                if condition::evaluate(&edge, &state_after_steps.data.outputs)? {
                    candidates.push(Candidate { target: edge.target, priority: edge.priority, order });
                }
                order += 1;
            }
        }
        candidates.sort_by_key(|c| (c.priority, c.order));

        // Multiple edges can target the same step in one pass; keep only
        // the best (lowest priority, earliest-evaluated) candidate per
        // target so it doesn't get activated — and counted — twice.
        let mut targets: Vec<(String, i64)> = Vec::new();
        for c in candidates {
            if !targets.iter().any(|(t, _)| *t == c.target) {
                targets.push((c.target, c.priority));
            }
        }

        let now = now_ts();
        self.sessions
            .update(session_id, move |mut state| {
                for (target, priority) in &targets {
                    state.activate_with_priority(target, *priority);
                }
                state.last_evaluated = now;
                Ok(state)
            })
            .await?;
        Ok(())
    }
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
