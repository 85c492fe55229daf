//! Tool registry for agent capabilities.
//!
//! The agent loop (which tool to call, and when) lives outside this crate.
//! This module gives it the catalogue as [`AgentTool`]s over one of two
//! transports: in-process through the backend gateway, or through a remote
//! MCP endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{BackendGateway, RequestContext};
use crate::mcp::{unwrap_envelope, McpClient};
use crate::tools::{RegisteredTool, ToolContext, ToolError, ToolRegistry};

/// Definition of a tool that an agent can use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name of the tool (must be unique within a registry).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's parameters.
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

impl From<&RegisteredTool> for ToolDefinition {
    fn from(tool: &RegisteredTool) -> Self {
        Self::new(
            tool.name.clone(),
            tool.description.clone(),
            tool.input_schema.clone(),
        )
    }
}

/// Context provided to tools when they are executed.
#[derive(Debug, Clone, Default)]
pub struct AgentToolContext {
    /// Bearer token of the user the agent acts for.
    pub token: Option<String>,
}

impl AgentToolContext {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    fn request_context(&self) -> RequestContext {
        RequestContext::new(self.token.clone())
    }
}

/// Trait for tools that agents can use.
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Get the tool's definition (name, description, parameters).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given arguments.
    ///
    /// # Returns
    /// The serialized `ToolCallResult` of the backend call.
    async fn execute(&self, args: Value, ctx: &AgentToolContext) -> Result<Value, ToolError>;
}

/// Runs a catalogue tool in-process.
pub struct DirectTool {
    tool: Arc<RegisteredTool>,
    gateway: Arc<BackendGateway>,
}

impl DirectTool {
    pub fn new(tool: Arc<RegisteredTool>, gateway: Arc<BackendGateway>) -> Self {
        Self { tool, gateway }
    }
}

#[async_trait]
impl AgentTool for DirectTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from(self.tool.as_ref())
    }

    async fn execute(&self, args: Value, ctx: &AgentToolContext) -> Result<Value, ToolError> {
        let tool_ctx = ToolContext::new(self.gateway.clone(), ctx.request_context());
        let result = self.tool.invoke(tool_ctx, args).await?;
        Ok(result.to_json())
    }
}

/// Forwards a catalogue tool to a remote MCP endpoint.
pub struct McpProxyTool {
    definition: ToolDefinition,
    client: Arc<McpClient>,
}

impl McpProxyTool {
    pub fn new(definition: ToolDefinition, client: Arc<McpClient>) -> Self {
        Self { definition, client }
    }
}

#[async_trait]
impl AgentTool for McpProxyTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, args: Value, ctx: &AgentToolContext) -> Result<Value, ToolError> {
        let outer = self
            .client
            .call_tool_as(&self.definition.name, args, ctx.token.as_deref())
            .await;
        Ok(unwrap_envelope(outer).to_json())
    }
}

/// Registry for managing agent tools.
pub struct AgentToolRegistry {
    tools: HashMap<String, Arc<dyn AgentTool>>,
}

impl AgentToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Every catalogue tool, executed in-process against the backend.
    pub fn direct(registry: &ToolRegistry, gateway: Arc<BackendGateway>) -> Self {
        let mut agent_registry = Self::new();
        for name in registry.names() {
            if let Ok(tool) = registry.resolve(&name) {
                agent_registry.register(DirectTool::new(tool, gateway.clone()));
            }
        }
        agent_registry
    }

    /// Every catalogue tool, executed through a remote MCP endpoint.
    pub fn via_mcp(registry: &ToolRegistry, client: Arc<McpClient>) -> Self {
        let mut agent_registry = Self::new();
        for name in registry.names() {
            if let Ok(tool) = registry.resolve(&name) {
                let definition = ToolDefinition::from(tool.as_ref());
                agent_registry.register(McpProxyTool::new(definition, client.clone()));
            }
        }
        agent_registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: impl AgentTool + 'static) {
        let def = tool.definition();
        self.tools.insert(def.name.clone(), Arc::new(tool));
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools.get(name).cloned()
    }

    /// All tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        ctx: &AgentToolContext,
    ) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(args, ctx).await
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for AgentToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
