//! Shared constants for end-to-end tests

#![allow(dead_code)]

/// How long to wait for a spawned server before giving up
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness probes
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Timeout applied by the test HTTP client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Heartbeat interval configured on test servers
pub const TEST_HEARTBEAT_SECS: u64 = 1;

/// Token sent by callers in auth tests
pub const CALLER_TOKEN: &str = "caller-token-123";

/// Process-wide token configured on servers that need one
pub const SERVER_TOKEN: &str = "server-token-abc";

/// Alert identifier used across alert tests
pub const ALERT_ID: &str = "alert-42";

/// Number of tools in the default catalogue
pub const TOOL_COUNT: usize = 17;
