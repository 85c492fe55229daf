use admin_mcp_server::config::{AppConfig, CliConfig, FileConfig, DEFAULT_BACKEND_API_URL};
use admin_mcp_server::{run_server, RequestsLoggingLevel};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(version, about = "MCP server exposing backend administration tools")]
struct CliArgs {
    /// Path to an optional TOML config file. Its values override CLI flags.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Name reported by `initialize`, `/health` and `/info`.
    #[clap(long, default_value = admin_mcp_server::config::DEFAULT_SERVER_NAME)]
    pub server_name: String,

    /// The address to bind to.
    #[clap(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// The port to listen on.
    #[clap(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Base URL of the backend REST API.
    #[clap(long, env = "BACKEND_API_URL", default_value = DEFAULT_BACKEND_API_URL)]
    pub backend_api_url: String,

    /// Token used for backend calls when the caller sends none.
    #[clap(long, env = "BEARER_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,

    /// Timeout in seconds for each backend call.
    #[clap(long, env = "API_TIMEOUT", default_value_t = 30)]
    pub api_timeout_sec: u64,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Seconds between heartbeats on idle event streams.
    #[clap(long, default_value_t = 30)]
    pub heartbeat_interval_sec: u64,

    /// Read tool calls allowed per caller and window. Set to 0 for no limit.
    #[clap(long, default_value_t = 100)]
    pub rate_limit_read_requests: u32,

    /// Write tool calls allowed per caller and window. Set to 0 for no limit.
    #[clap(long, default_value_t = 30)]
    pub rate_limit_write_requests: u32,

    /// Length of the rate limit window in seconds.
    #[clap(long, default_value_t = 60)]
    pub rate_limit_window_sec: u64,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            server_name: self.server_name.clone(),
            host: self.host.clone(),
            port: self.port,
            backend_api_url: self.backend_api_url.clone(),
            bearer_token: self.bearer_token.clone(),
            api_timeout_sec: self.api_timeout_sec,
            logging_level: self.logging_level.clone(),
            heartbeat_interval_sec: self.heartbeat_interval_sec,
            rate_limit_read_requests: self.rate_limit_read_requests,
            rate_limit_write_requests: self.rate_limit_write_requests,
            rate_limit_window_sec: self.rate_limit_window_sec,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };

    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    info!(
        "Requests logging level: {}, rate limit: {} reads and {} writes per {}s",
        app_config.logging_level,
        app_config.rate_limit_read_requests,
        app_config.rate_limit_write_requests,
        app_config.rate_limit_window_sec
    );

    run_server(app_config).await
}
