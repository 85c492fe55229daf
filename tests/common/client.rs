//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint. When routes or
//! request formats change, update only this file.

#![allow(dead_code)]

use super::constants::*;
use admin_mcp_server::mcp::sse::SseLineBuffer;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
    token: Option<String>,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// A client that sends `Authorization: Bearer <token>` on every request
    pub fn with_token(base_url: String, token: &str) -> Self {
        let mut client = Self::new(base_url);
        client.token = Some(token.to_string());
        client
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // ========================================================================
    // JSON-RPC
    // ========================================================================

    pub async fn rpc(&self, body: Value) -> Response {
        self.rpc_raw(body.to_string()).await
    }

    pub async fn rpc_raw(&self, body: String) -> Response {
        self.authorize(self.client.post(format!("{}/mcp", self.base_url)))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("POST /mcp failed")
    }

    /// Sends `tools/call` and returns the parsed JSON-RPC response
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Value {
        let response = self
            .rpc(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": {"name": name, "arguments": arguments}
            }))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("Invalid JSON-RPC response")
    }

    // ========================================================================
    // Streaming sessions
    // ========================================================================

    /// Opens an idle channel and returns the open response
    pub async fn open_idle_channel(&self) -> Response {
        self.authorize(self.client.get(format!("{}/mcp/sse", self.base_url)))
            .send()
            .await
            .expect("GET /mcp/sse failed")
    }

    pub async fn post_session_request(&self, session_id: &str, body: Value) -> Response {
        self.authorize(
            self.client
                .post(format!("{}/mcp/sse/{}", self.base_url, session_id)),
        )
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("POST /mcp/sse/{id} failed")
    }

    pub async fn delete_session(&self, session_id: &str) -> Response {
        self.client
            .delete(format!("{}/mcp/sse/{}", self.base_url, session_id))
            .send()
            .await
            .expect("DELETE /mcp/sse/{id} failed")
    }

    // ========================================================================
    // Plain tool endpoints
    // ========================================================================

    pub async fn get_tools(&self) -> Response {
        self.client
            .get(format!("{}/api/tools", self.base_url))
            .send()
            .await
            .expect("GET /api/tools failed")
    }

    pub async fn post_tool(&self, name: &str, body: &str) -> Response {
        self.authorize(
            self.client
                .post(format!("{}/api/tools/{}", self.base_url, name)),
        )
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("POST /api/tools/{name} failed")
    }

    pub async fn get_json(&self, path: &str) -> Value {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET failed")
            .json()
            .await
            .expect("Invalid JSON body")
    }
}

/// Reads `data:` payloads from an event stream until `count` are collected
/// or the stream ends.
pub async fn read_events(response: &mut Response, count: usize) -> Vec<Value> {
    let mut buffer = SseLineBuffer::new();
    let mut events = Vec::new();
    while events.len() < count {
        let timeout = Duration::from_secs(REQUEST_TIMEOUT_SECS);
        let chunk = tokio::time::timeout(timeout, response.chunk())
            .await
            .expect("Timed out waiting for events")
            .expect("Event stream failed");
        let Some(chunk) = chunk else {
            break;
        };
        for payload in buffer.push_chunk(&chunk) {
            events.push(serde_json::from_str(&payload).expect("Event data is not JSON"));
        }
    }
    events
}
