//! Backend Tools
//!
//! Tool implementations for logging configuration, alert rules and metrics.
//! Every tool maps its arguments to exactly one backend call.

pub mod alerts;
pub mod logging;
pub mod metrics;
pub mod registry;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use registry::{
    RegisteredTool, ToolBuilder, ToolCategory, ToolContext, ToolDescriptor, ToolRegistry,
    ToolResult,
};

/// Errors that can occur when resolving or running a tool.
///
/// These are distinct from a backend failure, which is a normal
/// [`crate::backend::ToolCallResult`] with `success == false`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Register all tools with the registry
pub fn register_all_tools(registry: &mut ToolRegistry) {
    logging::register_tools(registry);
    alerts::register_tools(registry);
    metrics::register_tools(registry);
}

/// Decode tool arguments. A missing/null argument object counts as `{}`.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = match args {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Split an identifier field off the arguments and decode the rest as `T`.
///
/// Used by update tools, whose remaining fields are all optional changes.
pub(crate) fn split_id<T: DeserializeOwned>(
    args: Value,
    id_field: &str,
) -> Result<(String, T), ToolError> {
    let mut map = match args {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(ToolError::InvalidArguments(format!(
                "expected an object, got {}",
                other
            )))
        }
    };

    let id = match map.remove(id_field) {
        Some(Value::String(id)) => id,
        Some(other) => {
            return Err(ToolError::InvalidArguments(format!(
                "{} must be a string, got {}",
                id_field, other
            )))
        }
        None => {
            return Err(ToolError::InvalidArguments(format!(
                "missing field `{}`",
                id_field
            )))
        }
    };

    let rest = parse_args(Value::Object(map))?;
    Ok((id, rest))
}

/// Serialize a request payload for the backend.
pub(crate) fn to_body<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
}

/// Percent-encode a value interpolated into a backend URL path.
pub(crate) fn path_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
