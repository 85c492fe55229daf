//! MCP (Model Context Protocol) front-end
//!
//! JSON-RPC dispatch over the tool registry, streaming sessions, and the
//! client used to call a remote MCP endpoint.

pub mod client;
pub mod dispatcher;
pub mod protocol;
pub mod rate_limit;
pub mod session;
pub mod sse;
pub mod streaming;

pub use client::{unwrap_envelope, McpClient};
pub use dispatcher::{DispatchOutcome, McpDispatcher};
pub use protocol::{McpError, RequestId, RpcRequest, RpcResponse, ServerInfo, MCP_PROTOCOL_VERSION};
pub use rate_limit::{McpRateLimiter, RateLimitConfig};
pub use session::{Session, SessionError, SessionGuard, SessionManager, SessionUpdate};
