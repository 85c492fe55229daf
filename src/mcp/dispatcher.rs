//! MCP Protocol Dispatcher
//!
//! Routes JSON-RPC requests by method name to the tool registry. Holds no
//! per-connection state; sessions are handled by the transport.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::protocol::{
    methods, InitializeResult, McpError, PingResult, RequestId, RpcRequest, RpcResponse,
    ServerInfo, ToolsCallParams, ToolsCallResult, ToolsListResult,
};
use super::rate_limit::McpRateLimiter;
use crate::backend::{BackendGateway, RequestContext};
use crate::tools::{ToolContext, ToolError, ToolRegistry};

/// What an inbound body produced.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Single(RpcResponse),
    Batch(Vec<RpcResponse>),
    /// Only notifications were received.
    NoResponse,
    /// The body was not JSON at all.
    ParseError(RpcResponse),
}

pub struct McpDispatcher {
    registry: Arc<ToolRegistry>,
    gateway: Arc<BackendGateway>,
    rate_limiter: Arc<McpRateLimiter>,
    server_info: ServerInfo,
}

impl McpDispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        gateway: Arc<BackendGateway>,
        rate_limiter: Arc<McpRateLimiter>,
        server_info: ServerInfo,
    ) -> Self {
        Self {
            registry,
            gateway,
            rate_limiter,
            server_info,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn gateway(&self) -> &Arc<BackendGateway> {
        &self.gateway
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Handles a raw request body: one request or a batch.
    pub async fn dispatch_body(&self, body: &[u8], ctx: &RequestContext) -> DispatchOutcome {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                debug!("Unparseable JSON-RPC body: {}", e);
                return DispatchOutcome::ParseError(RpcResponse::error(
                    None,
                    McpError::ParseError(e.to_string()),
                ));
            }
        };

        match value {
            Value::Array(items) if items.is_empty() => DispatchOutcome::Single(
                RpcResponse::error(None, McpError::InvalidRequest("empty batch".to_string())),
            ),
            Value::Array(items) => {
                let mut responses = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(response) = self.dispatch_value(item, ctx).await {
                        responses.push(response);
                    }
                }
                if responses.is_empty() {
                    DispatchOutcome::NoResponse
                } else {
                    DispatchOutcome::Batch(responses)
                }
            }
            single => match self.dispatch_value(single, ctx).await {
                Some(response) => DispatchOutcome::Single(response),
                None => DispatchOutcome::NoResponse,
            },
        }
    }

    /// Handles one JSON value that should be a request. Values that are not
    /// requests get an invalid-request error in their place.
    pub async fn dispatch_value(&self, item: Value, ctx: &RequestContext) -> Option<RpcResponse> {
        match serde_json::from_value::<RpcRequest>(item.clone()) {
            Ok(request) => self.dispatch(request, ctx).await,
            Err(e) => {
                let id = item
                    .get("id")
                    .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());
                Some(RpcResponse::error(
                    id,
                    McpError::InvalidRequest(e.to_string()),
                ))
            }
        }
    }

    /// Handles one request. Returns `None` for notifications.
    pub async fn dispatch(&self, request: RpcRequest, ctx: &RequestContext) -> Option<RpcResponse> {
        let notification = request.is_notification();
        let request_id = request.id.clone();
        debug!(method = %request.method, id = ?request_id, "Dispatching request");

        let result = match AssertUnwindSafe(self.handle(&request, ctx))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(method = %request.method, "Request handler panicked: {}", message);
                Err(McpError::InternalError(message))
            }
        };

        if notification {
            if let Err(e) = result {
                debug!(method = %request.method, "Notification failed: {}", e);
            }
            return None;
        }

        Some(match result {
            Ok(value) => RpcResponse::success(request_id, value),
            Err(error) => RpcResponse::error(request_id, error),
        })
    }

    async fn handle(&self, request: &RpcRequest, ctx: &RequestContext) -> Result<Value, McpError> {
        match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(),
            methods::INITIALIZED | methods::NOTIFICATIONS_INITIALIZED => Ok(Value::Null),
            methods::PING => to_result(PingResult {}),
            methods::TOOLS_LIST => self.handle_tools_list(),
            methods::TOOLS_CALL => self.handle_tools_call(request, ctx).await,
            methods::RESOURCES_LIST => Ok(serde_json::json!({ "resources": [] })),
            methods::PROMPTS_LIST => Ok(serde_json::json!({ "prompts": [] })),
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn handle_initialize(&self) -> Result<Value, McpError> {
        to_result(InitializeResult::new(self.server_info.clone()))
    }

    fn handle_tools_list(&self) -> Result<Value, McpError> {
        to_result(ToolsListResult {
            tools: self.registry.list(),
        })
    }

    async fn handle_tools_call(
        &self,
        request: &RpcRequest,
        ctx: &RequestContext,
    ) -> Result<Value, McpError> {
        let params: ToolsCallParams = request
            .params
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Missing params".to_string()))?;

        let tool = self
            .registry
            .resolve(&params.name)
            .map_err(|_| McpError::InvalidParams(format!("Unknown tool: {}", params.name)))?;

        if let Err(retry_after) = self
            .rate_limiter
            .check_and_record(ctx.caller_key(), tool.category)
        {
            warn!(tool = %tool.name, category = ?tool.category, "Rate limit exceeded");
            return Err(McpError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let arguments = params
            .arguments
            .unwrap_or_else(|| Value::Object(Default::default()));
        let tool_ctx = ToolContext::new(self.gateway.clone(), ctx.clone());

        let outcome = AssertUnwindSafe(tool.invoke(tool_ctx, arguments))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ToolError::ExecutionFailed(panic_message(panic.as_ref()))));

        let envelope = match outcome {
            Ok(result) => {
                info!(
                    tool = %tool.name,
                    success = result.success,
                    status = result.status_code,
                    "Tool call finished"
                );
                ToolsCallResult::from_tool_result(&result)
                    .map_err(|e| McpError::InternalError(e.to_string()))?
            }
            Err(e) => {
                warn!(tool = %tool.name, "Tool call failed: {}", e);
                ToolsCallResult::failure(e.to_string())
            }
        };

        to_result(envelope)
    }
}

fn to_result<T: serde::Serialize>(value: T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
