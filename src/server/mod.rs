pub mod auth;
mod http_layers;
mod mcp_routes;
mod server;
pub mod state;
mod tool_routes;

pub use auth::Caller;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use state::ServerState;
