//! Plain tool endpoints that bypass JSON-RPC.

use std::panic::AssertUnwindSafe;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::auth::Caller;
use super::state::{GuardedGateway, GuardedToolRegistry, ServerState};
use crate::agent::ToolDefinition;
use crate::tools::{ToolContext, ToolError};

#[derive(Serialize)]
struct ToolsListing {
    tools: Vec<ToolDefinition>,
}

async fn get_tools(State(registry): State<GuardedToolRegistry>) -> Json<ToolsListing> {
    let tools = registry
        .names()
        .iter()
        .filter_map(|name| registry.resolve(name).ok())
        .map(|tool| ToolDefinition::from(tool.as_ref()))
        .collect();
    Json(ToolsListing { tools })
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// `POST /api/tools/{tool_name}`: invokes a tool and returns its raw
/// `ToolCallResult`, whatever the backend said.
async fn post_tool(
    State(registry): State<GuardedToolRegistry>,
    State(gateway): State<GuardedGateway>,
    Path(tool_name): Path<String>,
    caller: Caller,
    body: Bytes,
) -> Response {
    let tool = match registry.resolve(&tool_name) {
        Ok(tool) => tool,
        Err(e) => return error_response(StatusCode::NOT_FOUND, e.to_string()),
    };

    let arguments: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
    info!(tool = %tool_name, "Direct tool invocation");

    let ctx = ToolContext::new(gateway, caller.context());
    match AssertUnwindSafe(tool.invoke(ctx, arguments))
        .catch_unwind()
        .await
    {
        Ok(Ok(result)) => Json(result).into_response(),
        Ok(Err(e @ ToolError::InvalidArguments(_))) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        Ok(Err(e @ ToolError::NotFound(_))) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Ok(Err(e)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        Err(_) => {
            error!(tool = %tool_name, "Tool handler panicked");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Tool {} failed unexpectedly", tool_name),
            )
        }
    }
}

pub fn make_tool_routes(state: ServerState) -> Router {
    Router::new()
        .route("/api/tools", get(get_tools))
        .route("/api/tools/{tool_name}", post(post_tool))
        .with_state(state)
}
