mod file_config;

pub use file_config::{FileConfig, RateLimitFileConfig};

use crate::mcp::{RateLimitConfig, ServerInfo};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::time::Duration;

pub const DEFAULT_SERVER_NAME: &str = "clairai-admin-mcp";
pub const DEFAULT_BACKEND_API_URL: &str = "https://backend.clairai.cloud";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub server_name: String,
    pub host: String,
    pub port: u16,
    pub backend_api_url: String,
    pub bearer_token: Option<String>,
    pub api_timeout_sec: u64,
    pub logging_level: RequestsLoggingLevel,
    pub heartbeat_interval_sec: u64,
    pub rate_limit_read_requests: u32,
    pub rate_limit_write_requests: u32,
    pub rate_limit_window_sec: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            backend_api_url: DEFAULT_BACKEND_API_URL.to_string(),
            bearer_token: None,
            api_timeout_sec: 30,
            logging_level: RequestsLoggingLevel::Path,
            heartbeat_interval_sec: 30,
            rate_limit_read_requests: 100,
            rate_limit_write_requests: 30,
            rate_limit_window_sec: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_name: String,
    pub server_version: String,
    pub host: String,
    pub port: u16,
    /// Base URL of the backend REST API, without trailing slash.
    pub backend_api_url: String,
    /// Process-wide token used when a caller sends none.
    pub bearer_token: Option<String>,
    pub api_timeout_sec: u64,
    pub logging_level: RequestsLoggingLevel,
    pub heartbeat_interval_sec: u64,
    pub rate_limit_read_requests: u32,
    pub rate_limit_write_requests: u32,
    pub rate_limit_window_sec: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let server_name = file
            .server_name
            .unwrap_or_else(|| cli.server_name.clone());
        let host = file.host.unwrap_or_else(|| cli.host.clone());
        let port = file.port.unwrap_or(cli.port);
        if port == 0 {
            bail!("port must be non-zero");
        }

        let backend_api_url = file
            .backend_api_url
            .unwrap_or_else(|| cli.backend_api_url.clone());
        let backend_api_url = validate_backend_url(&backend_api_url)?;

        let bearer_token = file
            .bearer_token
            .or_else(|| cli.bearer_token.clone())
            .filter(|token| !token.trim().is_empty());

        let api_timeout_sec = file.api_timeout_sec.unwrap_or(cli.api_timeout_sec);
        if api_timeout_sec == 0 {
            bail!("api_timeout_sec must be non-zero");
        }

        let logging_level = match file.logging_level {
            Some(s) => parse_logging_level(&s)
                .with_context(|| format!("Invalid logging_level in config file: {}", s))?,
            None => cli.logging_level.clone(),
        };

        let heartbeat_interval_sec = file
            .heartbeat_interval_sec
            .unwrap_or(cli.heartbeat_interval_sec);
        if heartbeat_interval_sec == 0 {
            bail!("heartbeat_interval_sec must be non-zero");
        }

        let rate_limit_file = file.rate_limit.unwrap_or_default();
        let rate_limit_read_requests = rate_limit_file
            .read_requests
            .unwrap_or(cli.rate_limit_read_requests);
        let rate_limit_write_requests = rate_limit_file
            .write_requests
            .unwrap_or(cli.rate_limit_write_requests);
        let rate_limit_window_sec = rate_limit_file
            .window_sec
            .unwrap_or(cli.rate_limit_window_sec);
        let rate_limit_enabled = rate_limit_read_requests > 0 || rate_limit_write_requests > 0;
        if rate_limit_enabled && rate_limit_window_sec == 0 {
            bail!("rate_limit_window_sec must be non-zero when rate limiting is enabled");
        }

        Ok(Self {
            server_name,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            host,
            port,
            backend_api_url,
            bearer_token,
            api_timeout_sec,
            logging_level,
            heartbeat_interval_sec,
            rate_limit_read_requests,
            rate_limit_write_requests,
            rate_limit_window_sec,
        })
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_sec)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_sec)
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            read_requests: self.rate_limit_read_requests,
            write_requests: self.rate_limit_write_requests,
            window: Duration::from_secs(self.rate_limit_window_sec),
        }
    }

    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.server_name.clone(),
            version: self.server_version.clone(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let cli = CliConfig::default();
        Self {
            server_name: cli.server_name,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            host: cli.host,
            port: cli.port,
            backend_api_url: cli.backend_api_url,
            bearer_token: None,
            api_timeout_sec: cli.api_timeout_sec,
            logging_level: cli.logging_level,
            heartbeat_interval_sec: cli.heartbeat_interval_sec,
            rate_limit_read_requests: cli.rate_limit_read_requests,
            rate_limit_write_requests: cli.rate_limit_write_requests,
            rate_limit_window_sec: cli.rate_limit_window_sec,
        }
    }
}

/// Checks the scheme and strips a trailing slash.
fn validate_backend_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed)
        .with_context(|| format!("backend_api_url is not a valid URL: {}", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => bail!(
            "backend_api_url must use http or https, got {}: {}",
            other,
            raw
        ),
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
