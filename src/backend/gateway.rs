//! HTTP gateway to the backend REST API.

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::result::{parse_body, ToolCallResult};

/// Per-call context threaded from the inbound request down to the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Bearer token supplied by the caller, if any.
    pub token: Option<String>,
}

impl RequestContext {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Key used to bucket callers, e.g. for rate limiting.
    pub fn caller_key(&self) -> &str {
        self.token.as_deref().unwrap_or("anonymous")
    }
}

/// One outbound call: method, path relative to the base URL, optional JSON
/// body and query pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl BackendRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Appends a query pair. `None` values are skipped.
    pub fn with_query(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.query.push((key.to_string(), value.to_string()));
        }
        self
    }
}

/// Gateway to the backend REST API.
///
/// Never returns an error: HTTP failures, timeouts and transport errors all
/// come back as a failed [`ToolCallResult`].
pub struct BackendGateway {
    client: reqwest::Client,
    base_url: String,
    default_token: Option<String>,
    timeout: Duration,
}

impl BackendGateway {
    /// Create a new gateway.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the backend (e.g., "https://backend.example.com")
    /// * `default_token` - Process-wide token used when a call carries none
    /// * `timeout` - Deadline applied to every call
    pub fn new(
        base_url: impl Into<String>,
        default_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        // No idle pooling: a connection lives exactly as long as its call.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .context("Failed to create backend HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            default_token: default_token.filter(|t| !t.trim().is_empty()),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// The caller's token wins over the process-wide default.
    fn resolve_token<'a>(&'a self, ctx: &'a RequestContext) -> Option<&'a str> {
        ctx.token.as_deref().or(self.default_token.as_deref())
    }

    pub async fn call(&self, ctx: &RequestContext, request: BackendRequest) -> ToolCallResult {
        let url = self.url_for(&request.path);
        debug!(method = %request.method, url = %url, "Backend call");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(token) = self.resolve_token(ctx) {
            builder = builder.bearer_auth(token);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return self.transport_failure(&request.method, &url, e),
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return self.transport_failure(&request.method, &url, e),
        };

        if status.is_success() {
            ToolCallResult::ok(status.as_u16(), parse_body(text))
        } else {
            warn!(
                method = %request.method,
                url = %url,
                status = status.as_u16(),
                "Backend returned an error status"
            );
            ToolCallResult::http_error(status.as_u16(), &text)
        }
    }

    fn transport_failure(&self, method: &Method, url: &str, e: reqwest::Error) -> ToolCallResult {
        if e.is_timeout() {
            warn!(method = %method, url = %url, "Backend call timed out");
            ToolCallResult::timeout(format!(
                "Request to {} timed out after {}s",
                url,
                self.timeout.as_secs()
            ))
        } else {
            warn!(method = %method, url = %url, error = %e, "Backend call failed");
            ToolCallResult::internal(e.to_string())
        }
    }
}
