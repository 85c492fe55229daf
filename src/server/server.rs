use anyhow::{Context, Result};
use std::time::Duration;

use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use super::mcp_routes::make_mcp_routes;
use super::state::{GuardedConfig, GuardedToolRegistry, ServerState};
use super::tool_routes::make_tool_routes;
use super::log_requests;
use crate::config::AppConfig;
use crate::mcp::MCP_PROTOCOL_VERSION;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server: String,
    version: String,
    timestamp: String,
}

#[derive(Serialize)]
struct InfoResponse {
    name: String,
    version: String,
    #[serde(rename = "protocolVersion")]
    protocol_version: &'static str,
    tools_count: usize,
    tools: Vec<String>,
}

async fn get_health(State(config): State<GuardedConfig>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        server: config.server_name.clone(),
        version: config.server_version.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn get_info(
    State(config): State<GuardedConfig>,
    State(registry): State<GuardedToolRegistry>,
) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: config.server_name.clone(),
        version: config.server_version.clone(),
        protocol_version: MCP_PROTOCOL_VERSION,
        tools_count: registry.tool_count(),
        tools: registry.names(),
    })
}

pub fn make_app(state: ServerState) -> Router {
    let home_routes: Router = Router::new()
        .route("/health", get(get_health))
        .route("/info", get(get_info))
        .with_state(state.clone());

    home_routes
        .merge(make_mcp_routes(state.clone()))
        .merge(make_tool_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            log_requests,
        ))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, shutting down");
    }
}

pub async fn run_server(config: AppConfig) -> Result<()> {
    let address = config.bind_address();
    let state = ServerState::new(config)?;

    if state.rate_limiter.is_enabled() {
        let rate_limiter = state.rate_limiter.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
            // Skip the first immediate tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                rate_limiter.cleanup_stale_entries();
                debug!("Cleaned up stale rate limit windows");
            }
        });
    }

    info!(
        "{} v{} serving {} tools, backend at {}",
        state.config.server_name,
        state.config.server_version,
        state.registry.tool_count(),
        state.gateway.base_url()
    );

    let app = make_app(state);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
