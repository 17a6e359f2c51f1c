//! REST endpoints.

use agent_gateway_core::context::DEFAULT_THREAD_ID;
use agent_gateway_session::DispatchError;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::server::AppState;

/// Service name reported by the root endpoint.
pub const SERVICE_NAME: &str = "Agent Gateway";

fn default_thread_id() -> String {
    DEFAULT_THREAD_ID.to_string()
}

/// `POST /chat` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    #[serde(default = "default_thread_id")]
    pub thread_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// `POST /chat` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub tools_used: Vec<String>,
    pub thread_id: String,
}

/// `GET /status` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub agent_ready: bool,
    pub tools_count: usize,
}

/// `POST /clear` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearRequest {
    #[serde(default = "default_thread_id")]
    pub thread_id: String,
}

/// `POST /clear` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub status: String,
    pub thread_id: String,
}

/// Errors surfaced to HTTP callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Agent not initialized")]
    AgentNotReady,
    #[error("{0}")]
    Agent(String),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::AgentNotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Agent(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::AgentNotReady => Self::AgentNotReady,
            DispatchError::Agent(e) => Self::Agent(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}

/// `GET /`
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

/// `GET /status`
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let agent = state.dispatcher.status();
    Json(StatusResponse {
        status: (if agent.ready { "operational" } else { "not_ready" }).to_string(),
        agent_ready: agent.ready,
        tools_count: agent.tools_count,
    })
}

/// `POST /chat`
///
/// Agent failures still answer 200 with `"Error: ..."` as the response text.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state
        .dispatcher
        .dispatch(
            &request.text,
            &request.thread_id,
            request.user_name.as_deref(),
        )
        .await?;

    Ok(Json(ChatResponse {
        response: response.content,
        tools_used: response.tools_used,
        thread_id: request.thread_id,
    }))
}

/// `POST /clear`
pub async fn clear(
    State(state): State<AppState>,
    Json(request): Json<ClearRequest>,
) -> Result<Json<ClearResponse>, ApiError> {
    state
        .dispatcher
        .clear_history(&request.thread_id)
        .await
        .inspect_err(|e| {
            tracing::error!(thread_id = %request.thread_id, error = %e, "clear history failed");
        })?;

    Ok(Json(ClearResponse {
        status: "cleared".to_string(),
        thread_id: request.thread_id,
    }))
}
