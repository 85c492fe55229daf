//! Logging Tools
//!
//! Log-shipping configuration: onboard, list and deboard log groups.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::registry::{
    RegisteredTool, ToolBuilder, ToolCategory, ToolContext, ToolRegistry, ToolResult,
};
use super::{parse_args, path_segment, to_body};
use crate::backend::BackendRequest;

/// Register logging tools with the registry
pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(onboard_logging_config_tool());
    registry.register_tool(get_logging_configs_tool());
    registry.register_tool(delete_logging_config_tool());
}

/// Arguments shared by onboard and deboard; also the outbound payload.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct LogGroupParams {
    client_id: String,
    aws_account_id: String,
    source: String,
    log_selector: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingConfigsParams {
    client_id: String,
    aws_account_id: String,
}

fn log_group_schema(selector_description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "client_id": {"type": "string", "description": "The client identifier"},
            "aws_account_id": {"type": "string", "description": "AWS account ID"},
            "source": {"type": "string", "description": "Source of the logs"},
            "log_selector": {
                "type": "array",
                "items": {"type": "string"},
                "description": selector_description
            }
        },
        "required": ["client_id", "aws_account_id", "source", "log_selector"]
    })
}

// ============================================================================
// onboard_logging_config
// ============================================================================

fn onboard_logging_config_tool() -> RegisteredTool {
    ToolBuilder::new("onboard_logging_config")
        .description(
            "Onboard a new logging configuration for a specific client and AWS account. \
             Use when setting up or configuring logging.",
        )
        .input_schema(log_group_schema("List of log selectors"))
        .category(ToolCategory::Write)
        .build(onboard_logging_config_handler)
}

async fn onboard_logging_config_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let params: LogGroupParams = parse_args(args)?;
    let request = BackendRequest::post("/api/v1/logging/onboard")
        .with_body(to_body(&params)?);
    Ok(ctx.gateway.call(&ctx.request, request).await)
}

// ============================================================================
// get_logging_configs
// ============================================================================

fn get_logging_configs_tool() -> RegisteredTool {
    ToolBuilder::new("get_logging_configs")
        .description(
            "Retrieve all logging configurations for a specific client and AWS account. \
             Use when asking about logging setup.",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "client_id": {"type": "string", "description": "The client identifier"},
                "aws_account_id": {"type": "string", "description": "AWS account ID"}
            },
            "required": ["client_id", "aws_account_id"]
        }))
        .category(ToolCategory::Read)
        .build(get_logging_configs_handler)
}

async fn get_logging_configs_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let params: LoggingConfigsParams = parse_args(args)?;
    let path = format!(
        "/api/v1/logging/configs/{}/awsid-{}",
        path_segment(&params.client_id),
        path_segment(&params.aws_account_id)
    );
    Ok(ctx.gateway.call(&ctx.request, BackendRequest::get(path)).await)
}

// ============================================================================
// delete_logging_config
// ============================================================================

fn delete_logging_config_tool() -> RegisteredTool {
    ToolBuilder::new("delete_logging_config")
        .description(
            "Delete logging configurations and deboard a log group. \
             Use when removing or disabling logging.",
        )
        .input_schema(log_group_schema("List of log selectors to remove"))
        .category(ToolCategory::Write)
        .build(delete_logging_config_handler)
}

async fn delete_logging_config_handler(ctx: ToolContext, args: Value) -> ToolResult {
    let params: LogGroupParams = parse_args(args)?;
    // DELETE with a JSON body is the canonical deboard contract.
    let request = BackendRequest::delete("/api/v1/logging/deboard")
        .with_body(to_body(&params)?);
    Ok(ctx.gateway.call(&ctx.request, request).await)
}
