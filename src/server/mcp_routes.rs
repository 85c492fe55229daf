//! MCP transport endpoints: plain JSON-RPC and the two SSE channels.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::ACCEPT, HeaderMap, StatusCode},
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::auth::Caller;
use super::state::{GuardedConfig, GuardedDispatcher, GuardedSessionManager, ServerState};
use crate::mcp::streaming::{idle_channel, message_stream, request_channel};
use crate::mcp::{DispatchOutcome, McpError, RpcRequest, RpcResponse, SessionGuard, SessionUpdate};

const EVENT_STREAM: &str = "text/event-stream";

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(EVENT_STREAM))
}

/// `POST /mcp`: one request or a batch.
async fn post_mcp(
    State(dispatcher): State<GuardedDispatcher>,
    caller: Caller,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = caller.context();
    match dispatcher.dispatch_body(&body, &ctx).await {
        DispatchOutcome::NoResponse => StatusCode::NO_CONTENT.into_response(),
        DispatchOutcome::ParseError(response) => {
            (StatusCode::BAD_REQUEST, Json(response)).into_response()
        }
        DispatchOutcome::Batch(responses) => Json(responses).into_response(),
        DispatchOutcome::Single(response) if wants_event_stream(&headers) => {
            Sse::new(message_stream(&response)).into_response()
        }
        DispatchOutcome::Single(response) => Json(response).into_response(),
    }
}

/// `GET /mcp/sse`: opens a session and its idle channel.
async fn open_idle_channel(
    State(config): State<GuardedConfig>,
    State(sessions): State<GuardedSessionManager>,
    caller: Caller,
) -> Response {
    let session_id = sessions.create(caller.token);
    info!(session_id = %session_id, "Opened idle channel");

    let guard = SessionGuard::new(sessions.clone(), session_id);
    let stream = idle_channel(guard, config.server_info(), config.heartbeat_interval());
    Sse::new(stream).into_response()
}

fn parse_single_request(body: &[u8]) -> Result<RpcRequest, McpError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| McpError::ParseError(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| McpError::InvalidRequest(e.to_string()))
}

/// `POST /mcp/sse/{session_id}`: runs one request and streams
/// progress, result and done.
async fn post_session_request(
    State(dispatcher): State<GuardedDispatcher>,
    State(sessions): State<GuardedSessionManager>,
    Path(session_id): Path<String>,
    caller: Caller,
    body: Bytes,
) -> Response {
    let session = match sessions.touch(
        &session_id,
        SessionUpdate {
            token: caller.token.clone(),
            ..Default::default()
        },
    ) {
        Ok(session) => session,
        Err(e) => {
            debug!("{}", e);
            return (StatusCode::NOT_FOUND, Json(json!({ "error": e.to_string() })))
                .into_response();
        }
    };

    let request = match parse_single_request(&body) {
        Ok(request) => request,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(RpcResponse::error(None, e))).into_response()
        }
    };

    let ctx = caller.context_or(session.token);
    let stream = request_channel(dispatcher, sessions, session_id, request, ctx);
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// `DELETE /mcp/sse/{session_id}`: closes a session. Unknown ids are fine.
async fn close_session(
    State(sessions): State<GuardedSessionManager>,
    Path(session_id): Path<String>,
) -> StatusCode {
    if sessions.destroy(&session_id) {
        info!(session_id = %session_id, "Closed session");
    }
    StatusCode::NO_CONTENT
}

pub fn make_mcp_routes(state: ServerState) -> Router {
    Router::new()
        .route("/mcp", post(post_mcp))
        .route("/mcp/sse", get(open_idle_channel))
        .route(
            "/mcp/sse/{session_id}",
            post(post_session_request).delete(close_session),
        )
        .with_state(state)
}
