use super::not_found;
use crate::config::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tmcp_fetch_mcp::McpServer;

pub const SESSION_HEADER: &str = "mcp-session-id";

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

/// Handle one JSON-RPC message posted to the MCP endpoint
pub async fn post_mcp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request = match McpServer::parse_message(&body) {
        Ok(request) => request,
        Err(response) => return (StatusCode::BAD_REQUEST, Json(response)).into_response(),
    };

    if request.method == "initialize" {
        let client_name = request
            .params
            .as_ref()
            .and_then(|params| params.get("clientInfo"))
            .and_then(|info| info.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);

        return match state.server.handle_request(request).await {
            Some(response) if !response.is_error() => {
                let session = state.sessions.create(client_name).await;
                ([(SESSION_HEADER, session)], Json(response)).into_response()
            }
            Some(response) => Json(response).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        };
    }

    if let Some(session) = session_id(&headers) {
        match state.sessions.get(session).await {
            Some(known) => {
                tracing::debug!(session, client = ?known.client_name, method = %request.method, "session request");
            }
            None => {
                tracing::debug!(session, "request for unknown session");
                return not_found().await.into_response();
            }
        }
    }

    match state.server.handle_request(request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Terminate a session
pub async fn delete_mcp(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(session) = session_id(&headers) else {
        return (StatusCode::BAD_REQUEST, "Missing Mcp-Session-Id header").into_response();
    };

    if state.sessions.remove(session).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found().await.into_response()
    }
}
