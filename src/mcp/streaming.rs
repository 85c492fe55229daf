//! Server-sent event streams for MCP.
//!
//! Two shapes: an idle channel (session and server identity, then heartbeats)
//! and a per-request channel (progress, result, done).

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::Event;
use futures::stream::{self, Stream, StreamExt};
use serde_json::{json, Value};
use tracing::debug;

use super::dispatcher::McpDispatcher;
use super::protocol::{
    methods, InitializeParams, RpcRequest, RpcResponse, ServerInfo, MCP_PROTOCOL_VERSION,
};
use super::session::{SessionGuard, SessionManager, SessionUpdate};
use crate::backend::RequestContext;

pub mod events {
    pub const SESSION: &str = "session";
    pub const SERVER_INFO: &str = "server_info";
    pub const PING: &str = "ping";
    pub const PROGRESS: &str = "progress";
    pub const RESULT: &str = "result";
    pub const DONE: &str = "done";
    pub const MESSAGE: &str = "message";
}

pub type EventResult = Result<Event, Infallible>;

fn event(name: &str, data: &Value) -> Event {
    Event::default().event(name).data(data.to_string())
}

fn request_id_value(request: &RpcRequest) -> Value {
    request
        .id
        .as_ref()
        .and_then(|id| serde_json::to_value(id).ok())
        .unwrap_or(Value::Null)
}

/// Idle channel for an already created session.
///
/// The guard is owned by the stream: dropping the stream (client gone)
/// destroys the session. Heartbeats stop once the session no longer exists.
pub fn idle_channel(
    guard: SessionGuard,
    server_info: ServerInfo,
    heartbeat: Duration,
) -> impl Stream<Item = EventResult> {
    let opening = stream::iter(vec![
        Ok(event(
            events::SESSION,
            &json!({ "session_id": guard.session_id() }),
        )),
        Ok(event(
            events::SERVER_INFO,
            &json!({
                "name": server_info.name,
                "version": server_info.version,
                "protocolVersion": MCP_PROTOCOL_VERSION,
            }),
        )),
    ]);

    let heartbeats = stream::unfold(guard, move |guard| async move {
        tokio::time::sleep(heartbeat).await;
        if !guard.is_alive() {
            debug!(session_id = %guard.session_id(), "Session gone, ending idle channel");
            return None;
        }
        let ping = event(
            events::PING,
            &json!({ "timestamp": chrono::Utc::now().to_rfc3339() }),
        );
        Some((Ok(ping), guard))
    });

    opening.chain(heartbeats)
}

/// Per-request channel: `progress`, then the dispatcher's response as
/// `result`, then `done`. The dispatch runs only once `progress` has been
/// emitted.
pub fn request_channel(
    dispatcher: Arc<McpDispatcher>,
    sessions: Arc<SessionManager>,
    session_id: String,
    request: RpcRequest,
    ctx: RequestContext,
) -> impl Stream<Item = EventResult> {
    let request_id = request_id_value(&request);

    let progress = event(
        events::PROGRESS,
        &json!({ "status": "processing", "request_id": request_id }),
    );
    let done = event(events::DONE, &json!({ "request_id": request_id }));

    let result = stream::once(async move {
        let initialize = request.method == methods::INITIALIZE;
        let client_info = if initialize {
            request
                .params
                .clone()
                .and_then(|params| serde_json::from_value::<InitializeParams>(params).ok())
                .and_then(|params| params.client_info)
        } else {
            None
        };

        let response = dispatcher.dispatch(request, &ctx).await;

        if initialize && response.as_ref().is_some_and(|r| !r.is_error()) {
            let update = SessionUpdate {
                initialized: Some(true),
                client_info,
                ..Default::default()
            };
            // The session may have been closed while the request ran.
            let _ = sessions.touch(&session_id, update);
        }

        let data = response
            .and_then(|response| serde_json::to_value(response).ok())
            .unwrap_or_else(|| json!({}));
        Ok(event(events::RESULT, &data))
    });

    stream::once(async move { Ok(progress) })
        .chain(result)
        .chain(stream::once(async move { Ok(done) }))
}

/// Single `message` event carrying a response, for clients that asked the
/// plain endpoint for an event stream.
pub fn message_stream(response: &RpcResponse) -> impl Stream<Item = EventResult> {
    let data = serde_json::to_value(response).unwrap_or_else(|_| json!({}));
    stream::once(async move { Ok(event(events::MESSAGE, &data)) })
}
