//! Session API handlers (component G).
//!
//! Plain `async fn` handlers taking `State<AppState>` and `Json<...>`,
//! returning `impl IntoResponse` / `Result<Json<_>, ApiError>`.

use axum::extract::{Path, State};
use axum::Json;
use graphflow_engine::ProcessOutcome;
use graphflow_model::{State as SessionState, StepStatus, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::config::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub initial_data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub status: String,
    pub messages: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_input: Option<serde_json::Value>,
}

fn status_label(outcome: &ProcessOutcome) -> &'static str {
    match outcome {
        ProcessOutcome::Completed => "completed",
        ProcessOutcome::AwaitingInput { .. } => "awaiting_input",
        ProcessOutcome::IterationLimitReached => "active",
    }
}

fn response_from_outcome(session_id: Option<String>, state: &SessionState, outcome: ProcessOutcome) -> SessionResponse {
    let status = status_label(&outcome).to_string();
    let awaiting_input = match &outcome {
        ProcessOutcome::AwaitingInput { prompt, options, .. } => Some(json!({
            "prompt": prompt.to_json(),
            "options": options.as_ref().map(Value::to_json),
        })),
        _ => None,
    };
    SessionResponse {
        session_id,
        status,
        messages: state.data.messages.iter().map(|m| serde_json::to_value(m).unwrap_or(json!(null))).collect(),
        awaiting_input,
    }
}

/// Reconstruct the `awaiting_input` payload for a session that's already
/// suspended, without re-running `process` — the request-input step's
/// resolved call arguments are stashed on its own record while it's
/// suspended (see `State::set_awaiting`).
fn response_from_state(session_id: Option<String>, state: &SessionState) -> SessionResponse {
    let status = if state.awaiting_step().is_some() {
        "awaiting_input".to_string()
    } else {
        let has_outstanding = state
            .workflow
            .values()
            .any(|r| matches!(r.status, StepStatus::Active | StepStatus::Pending));
        if has_outstanding { "active".to_string() } else { "completed".to_string() }
    };

    let awaiting_input = state.awaiting().map(|(_, payload)| {
        json!({
            "prompt": payload.get("prompt").unwrap_or(&Value::Null).to_json(),
            "options": payload.get("options").map(Value::to_json),
        })
    });

    SessionResponse {
        session_id,
        status,
        messages: state.data.messages.iter().map(|m| serde_json::to_value(m).unwrap_or(json!(null))).collect(),
        awaiting_input,
    }
}

pub async fn create_session(
    State(app): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = Uuid::new_v4().to_string();
    let seed = req.initial_data.map(Value::from_json);

    app.engine.sessions().create(session_id.clone(), seed).await?;
    let outcome = app.engine.process(&session_id).await?;
    let state = app
        .engine
        .sessions()
        .get(&session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(session_id.clone()))?;

    Ok(Json(response_from_outcome(Some(session_id), &state, outcome)))
}

pub async fn send_message(
    State(app): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let outcome = app.engine.submit_input(&session_id, Value::from_json(req.message)).await?;
    let state = app
        .engine
        .sessions()
        .get(&session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(session_id.clone()))?;

    Ok(Json(response_from_outcome(None, &state, outcome)))
}

pub async fn get_session(
    State(app): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let state = app
        .engine
        .sessions()
        .get(&session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(session_id.clone()))?;

    Ok(Json(response_from_state(None, &state)))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}
