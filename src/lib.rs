//! Admin MCP Server Library
//!
//! Exposes backend logging, alerting and metrics operations as MCP tools.
//! The modules are public for the binaries, the integration tests and agent
//! integrations.

pub mod agent;
pub mod backend;
pub mod config;
pub mod mcp;
pub mod server;
pub mod tools;

// Re-export commonly used types for convenience
pub use backend::{BackendGateway, RequestContext, ToolCallResult};
pub use config::{AppConfig, CliConfig, FileConfig};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerState};
pub use tools::ToolRegistry;
