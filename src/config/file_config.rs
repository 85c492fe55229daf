use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Values read from the optional TOML file. Anything set here overrides the
/// matching CLI flag.
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server_name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub backend_api_url: Option<String>,
    pub bearer_token: Option<String>,
    pub api_timeout_sec: Option<u64>,
    pub logging_level: Option<String>,
    pub heartbeat_interval_sec: Option<u64>,

    pub rate_limit: Option<RateLimitFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitFileConfig {
    /// Read tool calls per caller and window; 0 leaves reads unlimited.
    pub read_requests: Option<u32>,
    /// Write tool calls per caller and window; 0 leaves writes unlimited.
    pub write_requests: Option<u32>,
    pub window_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
