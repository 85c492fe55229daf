//! MCP Client Caller
//!
//! Calls a remote MCP endpoint's `tools/call`. Tries an event-stream response
//! first and falls back to one plain request/response POST. Like the backend
//! gateway, it never returns an error: every failure is a [`ToolCallResult`].

use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use super::protocol::{RpcRequest, ToolsCallResult};
use super::sse::SseLineBuffer;
use crate::backend::result::parse_body;
use crate::backend::{ToolCallResult, STATUS_INTERNAL_ERROR};

const ACCEPT_STREAM: &str = "application/json, text/event-stream";
const ACCEPT_JSON: &str = "application/json";

/// Outcome of the streaming attempt.
enum StreamAttempt {
    Done(ToolCallResult),
    Fallback(String),
}

pub struct McpClient {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
    try_stream: bool,
    timeout: Duration,
}

impl McpClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `endpoint` - Full URL of the JSON-RPC endpoint (e.g., "http://localhost:8080/mcp")
    /// * `timeout` - Deadline for each HTTP exchange, body included
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create MCP HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            bearer_token: None,
            try_stream: true,
            timeout,
        })
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Disables the streaming attempt; every call is a plain POST.
    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.try_stream = enabled;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Calls one tool. `data` of a successful result is the endpoint's
    /// JSON-RPC response (see [`unwrap_envelope`]).
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        self.call_tool_as(name, arguments, None).await
    }

    /// Like [`McpClient::call_tool`], with a caller token that takes
    /// precedence over the client's own.
    pub async fn call_tool_as(
        &self,
        name: &str,
        arguments: Value,
        token: Option<&str>,
    ) -> ToolCallResult {
        let request = RpcRequest::tools_call(uuid::Uuid::new_v4().to_string(), name, arguments);
        let token = token
            .filter(|t| !t.trim().is_empty())
            .or(self.bearer_token.as_deref());

        if self.try_stream {
            match self.call_streaming(&request, token).await {
                StreamAttempt::Done(result) => return result,
                StreamAttempt::Fallback(reason) => {
                    debug!(tool = %name, "Streaming attempt failed, falling back: {}", reason);
                }
            }
        }

        self.call_plain(&request, token).await
    }

    fn post(
        &self,
        request: &RpcRequest,
        accept: &str,
        token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, accept)
            .json(request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn call_streaming(&self, request: &RpcRequest, token: Option<&str>) -> StreamAttempt {
        let response = match self.post(request, ACCEPT_STREAM, token).send().await {
            Ok(response) => response,
            Err(e) => return StreamAttempt::Fallback(e.to_string()),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return StreamAttempt::Fallback(format!("status {}", status));
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));

        // The endpoint chose a plain answer. Posting again would run the tool twice.
        if !is_event_stream {
            return match response.text().await {
                Ok(text) => {
                    StreamAttempt::Done(ToolCallResult::ok(status.as_u16(), parse_body(text)))
                }
                Err(e) => StreamAttempt::Fallback(e.to_string()),
            };
        }

        let mut lines = SseLineBuffer::new();
        let mut collected: Vec<String> = Vec::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return StreamAttempt::Fallback(e.to_string()),
            };
            for payload in lines.push_chunk(&chunk) {
                if let Ok(value) = serde_json::from_str::<Value>(&payload) {
                    return StreamAttempt::Done(ToolCallResult::ok(status.as_u16(), value));
                }
                collected.push(payload);
            }
        }

        if let Some(payload) = lines.finish() {
            if let Ok(value) = serde_json::from_str::<Value>(&payload) {
                return StreamAttempt::Done(ToolCallResult::ok(status.as_u16(), value));
            }
            collected.push(payload);
        }

        if collected.is_empty() {
            return StreamAttempt::Fallback("event stream carried no data".to_string());
        }

        let joined = collected.join("\n");
        let data = serde_json::from_str::<Value>(&joined).unwrap_or(Value::String(joined));
        StreamAttempt::Done(ToolCallResult::ok(status.as_u16(), data))
    }

    async fn call_plain(&self, request: &RpcRequest, token: Option<&str>) -> ToolCallResult {
        let response = match self.post(request, ACCEPT_JSON, token).send().await {
            Ok(response) => response,
            Err(e) => return self.transport_failure(e),
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return self.transport_failure(e),
        };

        if status.is_success() {
            ToolCallResult::ok(status.as_u16(), parse_body(text))
        } else {
            ToolCallResult::http_error(status.as_u16(), &text)
        }
    }

    fn transport_failure(&self, e: reqwest::Error) -> ToolCallResult {
        if e.is_timeout() {
            warn!(endpoint = %self.endpoint, "MCP call timed out");
            ToolCallResult::timeout(format!(
                "Request to {} timed out after {}s",
                self.endpoint,
                self.timeout.as_secs()
            ))
        } else {
            warn!(endpoint = %self.endpoint, error = %e, "MCP call failed");
            ToolCallResult::internal(e.to_string())
        }
    }
}

/// Extracts the tool's own result from a [`McpClient::call_tool`] result.
///
/// A JSON-RPC error becomes a failed result, an envelope carrying a
/// serialized [`ToolCallResult`] yields that result. Anything else is
/// returned unchanged.
pub fn unwrap_envelope(outer: ToolCallResult) -> ToolCallResult {
    if !outer.success {
        return outer;
    }
    let Some(payload) = outer.data.as_ref() else {
        return outer;
    };

    if let Some(error) = payload.get("error").filter(|e| e.is_object()) {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return ToolCallResult::failed(
            STATUS_INTERNAL_ERROR,
            format!("JSON-RPC error {}: {}", code, message),
        );
    }

    let Some(envelope) = payload
        .get("result")
        .and_then(|result| serde_json::from_value::<ToolsCallResult>(result.clone()).ok())
    else {
        return outer;
    };
    let Some(text) = envelope.first_text() else {
        return outer;
    };

    match serde_json::from_str::<ToolCallResult>(text) {
        Ok(inner) => inner,
        Err(_) if envelope.is_error => {
            let message = serde_json::from_str::<Value>(text)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| text.to_string());
            ToolCallResult::failed(STATUS_INTERNAL_ERROR, message)
        }
        Err(_) => ToolCallResult::ok(outer.status_code, parse_body(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, HeaderMap, StatusCode as AxumStatus},
        response::{IntoResponse, Response},
        routing::post,
        Router,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://127.0.0.1:{}/mcp", port)
    }

    fn wants_stream(headers: &HeaderMap) -> bool {
        headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("text/event-stream"))
    }

    fn event_stream(body: &'static str) -> Response {
        ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
    }

    fn client(endpoint: &str) -> McpClient {
        McpClient::new(endpoint, Duration::from_secs(5)).unwrap()
    }

    const RPC_REPLY: &str = r#"{"jsonrpc":"2.0","id":"1","result":{"ok":true}}"#;

    #[tokio::test]
    async fn test_stream_and_plain_paths_agree() {
        let router = Router::new().route(
            "/mcp",
            post(|headers: HeaderMap| async move {
                if wants_stream(&headers) {
                    event_stream(concat!(
                        "event: message\n",
                        "data: {\"jsonrpc\":\"2.0\",\"id\":\"1\",\"result\":{\"ok\":true}}\n\n",
                    ))
                } else {
                    ([(header::CONTENT_TYPE, "application/json")], RPC_REPLY).into_response()
                }
            }),
        );
        let endpoint = spawn(router).await;

        let streamed = client(&endpoint).call_tool("t", json!({})).await;
        let plain = client(&endpoint)
            .with_streaming(false)
            .call_tool("t", json!({}))
            .await;

        assert_eq!(streamed, plain);
        assert_eq!(streamed, ToolCallResult::ok(200, serde_json::from_str(RPC_REPLY).unwrap()));
    }

    #[tokio::test]
    async fn test_stream_returns_first_parseable_line() {
        let router = Router::new().route(
            "/mcp",
            post(|| async {
                event_stream("data: not json\n\ndata: {\"n\":1}\n\ndata: {\"n\":2}\n\n")
            }),
        );
        let endpoint = spawn(router).await;

        let result = client(&endpoint).call_tool("t", json!({})).await;
        assert_eq!(result, ToolCallResult::ok(200, json!({"n": 1})));
    }

    #[tokio::test]
    async fn test_stream_joins_split_payload() {
        let router = Router::new().route(
            "/mcp",
            post(|| async { event_stream("data: {\"a\":\ndata: 1}\n\n") }),
        );
        let endpoint = spawn(router).await;

        let result = client(&endpoint).call_tool("t", json!({})).await;
        assert_eq!(result, ToolCallResult::ok(200, json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_stream_unparseable_is_text_success() {
        let router = Router::new().route(
            "/mcp",
            post(|| async { event_stream("data: hello\n\ndata: world\n\n") }),
        );
        let endpoint = spawn(router).await;

        let result = client(&endpoint).call_tool("t", json!({})).await;
        assert_eq!(result, ToolCallResult::ok(200, json!("hello\nworld")));
    }

    #[tokio::test]
    async fn test_non_200_stream_falls_back_to_plain_post() {
        let accepts = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen = accepts.clone();
        let router = Router::new().route(
            "/mcp",
            post(move |headers: HeaderMap| {
                let seen = seen.clone();
                async move {
                    let accept = headers
                        .get(header::ACCEPT)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    seen.lock().unwrap().push(accept);
                    if wants_stream(&headers) {
                        AxumStatus::NOT_ACCEPTABLE.into_response()
                    } else {
                        ([(header::CONTENT_TYPE, "application/json")], RPC_REPLY).into_response()
                    }
                }
            }),
        );
        let endpoint = spawn(router).await;

        let result = client(&endpoint).call_tool("t", json!({})).await;

        assert!(result.success);
        assert_eq!(
            *accepts.lock().unwrap(),
            vec![ACCEPT_STREAM.to_string(), ACCEPT_JSON.to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_stream_falls_back() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/mcp",
            post(move |headers: HeaderMap| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if wants_stream(&headers) {
                        event_stream(": comment only\n\n")
                    } else {
                        ([(header::CONTENT_TYPE, "application/json")], RPC_REPLY).into_response()
                    }
                }
            }),
        );
        let endpoint = spawn(router).await;

        let result = client(&endpoint).call_tool("t", json!({})).await;

        assert!(result.success);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_plain_json_answer_to_stream_attempt_is_not_repeated() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/mcp",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { ([(header::CONTENT_TYPE, "application/json")], RPC_REPLY).into_response() }
            }),
        );
        let endpoint = spawn(router).await;

        let result = client(&endpoint).call_tool("t", json!({})).await;

        assert!(result.success);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_plain_http_error() {
        let router = Router::new().route(
            "/mcp",
            post(|| async { (AxumStatus::BAD_GATEWAY, "upstream down") }),
        );
        let endpoint = spawn(router).await;

        let result = client(&endpoint).call_tool("t", json!({})).await;

        assert!(!result.success);
        assert_eq!(result.status_code, 502);
        assert!(result.error.unwrap().contains("upstream down"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_500() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = client(&format!("http://127.0.0.1:{}/mcp", port))
            .call_tool("t", json!({}))
            .await;

        assert!(!result.success);
        assert_eq!(result.status_code, 500);
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let seen = Arc::new(Mutex::new(None::<String>));
        let sink = seen.clone();
        let router = Router::new().route(
            "/mcp",
            post(move |headers: HeaderMap| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    ([(header::CONTENT_TYPE, "application/json")], RPC_REPLY).into_response()
                }
            }),
        );
        let endpoint = spawn(router).await;

        client(&endpoint)
            .with_bearer_token(Some("secret".to_string()))
            .with_streaming(false)
            .call_tool("t", json!({}))
            .await;

        assert_eq!(seen.lock().unwrap().as_deref(), Some("Bearer secret"));
    }

    fn envelope_response(inner: &ToolCallResult) -> ToolCallResult {
        let envelope = ToolsCallResult::from_tool_result(inner).unwrap();
        ToolCallResult::ok(
            200,
            json!({"jsonrpc": "2.0", "id": "1", "result": serde_json::to_value(envelope).unwrap()}),
        )
    }

    #[test]
    fn test_unwrap_envelope_returns_inner_result() {
        let inner = ToolCallResult::http_error(404, "missing");
        assert_eq!(unwrap_envelope(envelope_response(&inner)), inner);

        let inner = ToolCallResult::ok(200, json!({"x": 1}));
        assert_eq!(unwrap_envelope(envelope_response(&inner)), inner);
    }

    #[test]
    fn test_unwrap_envelope_rpc_error() {
        let outer = ToolCallResult::ok(
            200,
            json!({
                "jsonrpc": "2.0",
                "id": "1",
                "error": {"code": -32602, "message": "Invalid params: Unknown tool: x"}
            }),
        );
        let result = unwrap_envelope(outer);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("-32602"));
    }

    #[test]
    fn test_unwrap_envelope_tool_failure_message() {
        let envelope = ToolsCallResult::failure("Invalid arguments: missing field `x`");
        let outer = ToolCallResult::ok(
            200,
            json!({"jsonrpc": "2.0", "id": "1", "result": serde_json::to_value(envelope).unwrap()}),
        );
        let result = unwrap_envelope(outer);
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Invalid arguments: missing field `x`")
        );
    }

    #[test]
    fn test_unwrap_envelope_passes_through_failures_and_text() {
        let failed = ToolCallResult::timeout("slow");
        assert_eq!(unwrap_envelope(failed.clone()), failed);

        let text = ToolCallResult::ok(200, json!("hello"));
        assert_eq!(unwrap_envelope(text.clone()), text);
    }
}
