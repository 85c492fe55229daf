use axum::extract::FromRef;
use std::sync::Arc;

use anyhow::Result;

use crate::backend::BackendGateway;
use crate::config::AppConfig;
use crate::mcp::{McpDispatcher, McpRateLimiter, SessionManager};
use crate::tools::ToolRegistry;

pub type GuardedConfig = Arc<AppConfig>;
pub type GuardedDispatcher = Arc<McpDispatcher>;
pub type GuardedSessionManager = Arc<SessionManager>;
pub type GuardedToolRegistry = Arc<ToolRegistry>;
pub type GuardedGateway = Arc<BackendGateway>;
pub type GuardedRateLimiter = Arc<McpRateLimiter>;

#[derive(Clone)]
pub struct ServerState {
    pub config: GuardedConfig,
    pub dispatcher: GuardedDispatcher,
    pub sessions: GuardedSessionManager,
    pub registry: GuardedToolRegistry,
    pub gateway: GuardedGateway,
    pub rate_limiter: GuardedRateLimiter,
}

impl ServerState {
    /// Builds the shared components from a resolved configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        let gateway = Arc::new(BackendGateway::new(
            config.backend_api_url.clone(),
            config.bearer_token.clone(),
            config.api_timeout(),
        )?);
        let registry = Arc::new(ToolRegistry::with_default_tools());
        let rate_limiter = Arc::new(McpRateLimiter::new(config.rate_limit()));
        let dispatcher = Arc::new(McpDispatcher::new(
            registry.clone(),
            gateway.clone(),
            rate_limiter.clone(),
            config.server_info(),
        ));

        Ok(Self {
            config: Arc::new(config),
            dispatcher,
            sessions: Arc::new(SessionManager::new()),
            registry,
            gateway,
            rate_limiter,
        })
    }
}

impl FromRef<ServerState> for GuardedConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedDispatcher {
    fn from_ref(input: &ServerState) -> Self {
        input.dispatcher.clone()
    }
}

impl FromRef<ServerState> for GuardedSessionManager {
    fn from_ref(input: &ServerState) -> Self {
        input.sessions.clone()
    }
}

impl FromRef<ServerState> for GuardedToolRegistry {
    fn from_ref(input: &ServerState) -> Self {
        input.registry.clone()
    }
}

impl FromRef<ServerState> for GuardedGateway {
    fn from_ref(input: &ServerState) -> Self {
        input.gateway.clone()
    }
}
