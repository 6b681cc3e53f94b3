use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clean::clean_response;
use crate::state::AppState;

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
pub struct ChatBody {
    pub content: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatQuery {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub agent_name: String,
    pub transition_path: Vec<String>,
    pub session_id: String,
}

// POST /chat
pub async fn chat_post(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, StatusCode> {
    process_chat(&state, &body.content, body.session_id).await
}

// GET /chat?message=...&session_id=...
pub async fn chat_get(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ChatQuery>,
) -> Result<Json<ChatResponse>, StatusCode> {
    process_chat(&state, &q.message, q.session_id).await
}

async fn process_chat(
    state: &AppState,
    content: &str,
    session_id: Option<String>,
) -> Result<Json<ChatResponse>, StatusCode> {
    if content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let (key, session) = match session_id {
        Some(key) => {
            let session = state.sessions.get_or_create(&key).await;
            (key, session)
        }
        None => state.sessions.open().await,
    };
    debug!(session = %key, "Chat message received");

    let mut graph = session.lock().await;
    let raw = graph.respond(content).await;
    let agent_name = graph.get_current_agent().to_string();
    info!(session = %key, agent = %agent_name, "Chat turn finished");

    Ok(Json(ChatResponse {
        content: clean_response(&raw),
        agent_name,
        transition_path: graph.get_agent_path().to_vec(),
        session_id: key,
    }))
}

// GET /agents
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let roster = state.sessions.roster();
    let agents: Vec<&str> = roster.names().collect();
    Json(serde_json::json!({
        "agents": agents,
        "root": roster.root(),
    }))
}

#[derive(Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

// GET /current-agent?session_id=...
//
// Without a known session the answer is the root, where every new
// session starts.
pub async fn current_agent(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SessionQuery>,
) -> Json<serde_json::Value> {
    let session = match q.session_id {
        Some(ref key) => state.sessions.get(key).await,
        None => None,
    };
    let agent = match session {
        Some(session) => session.lock().await.get_current_agent().to_string(),
        None => state.sessions.roster().root().to_string(),
    };
    Json(serde_json::json!({ "agent": agent }))
}

// GET /api/sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let keys = state.sessions.list().await;
    Json(serde_json::json!({ "sessions": keys }))
}

#[derive(Deserialize)]
pub struct TransitionsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

// GET /sessions/{id}/transitions?limit=20
pub async fn session_transitions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<TransitionsQuery>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let session = state.sessions.get(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    let graph = session.lock().await;
    let transitions = serde_json::to_value(graph.get_recent_transitions(q.limit))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(serde_json::json!({
        "session_id": id,
        "current_agent": graph.get_current_agent(),
        "transitions": transitions,
    })))
}
