//! Agent-side access to the tool catalogue.

pub mod tools;

pub use tools::{
    AgentTool, AgentToolContext, AgentToolRegistry, DirectTool, McpProxyTool, ToolDefinition,
};
