//! MCP Rate Limiting
//!
//! Per-caller fixed-window limiting of `tools/call`, with separate budgets
//! for read and write tools.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::tools::ToolCategory;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Read tool calls allowed per window. Zero leaves reads unlimited.
    pub read_requests: u32,
    /// Write tool calls allowed per window. Zero leaves writes unlimited.
    pub write_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    fn budget(&self, category: ToolCategory) -> u32 {
        match category {
            ToolCategory::Read => self.read_requests,
            ToolCategory::Write => self.write_requests,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            read_requests: 100,
            write_requests: 30,
            window: Duration::from_secs(60),
        }
    }
}

/// Tracks rate limit state for a single caller
#[derive(Debug)]
struct CallerWindow {
    read_count: u32,
    write_count: u32,
    window_start: Instant,
}

impl CallerWindow {
    fn new() -> Self {
        Self {
            read_count: 0,
            write_count: 0,
            window_start: Instant::now(),
        }
    }

    fn reset_if_expired(&mut self, window: Duration) {
        if self.window_start.elapsed() >= window {
            self.read_count = 0;
            self.write_count = 0;
            self.window_start = Instant::now();
        }
    }

    fn count_mut(&mut self, category: ToolCategory) -> &mut u32 {
        match category {
            ToolCategory::Read => &mut self.read_count,
            ToolCategory::Write => &mut self.write_count,
        }
    }
}

/// Rate limiter for MCP tool calls
pub struct McpRateLimiter {
    config: RateLimitConfig,
    states: Mutex<HashMap<String, CallerWindow>>,
}

impl McpRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.read_requests > 0 || self.config.write_requests > 0
    }

    /// Check if a call is allowed and record it if so.
    /// Returns Ok(()) if allowed, Err(retry_after_secs) if rate limited.
    pub fn check_and_record(&self, caller: &str, category: ToolCategory) -> Result<(), u64> {
        let budget = self.config.budget(category);
        if budget == 0 {
            return Ok(());
        }

        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let state = states
            .entry(caller.to_string())
            .or_insert_with(CallerWindow::new);

        state.reset_if_expired(self.config.window);

        let window_start = state.window_start;
        let count = state.count_mut(category);
        if *count >= budget {
            let remaining = self.config.window.saturating_sub(window_start.elapsed());
            return Err(remaining.as_secs().max(1));
        }

        *count += 1;
        Ok(())
    }

    /// Drop windows that expired long ago
    pub fn cleanup_stale_entries(&self) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let threshold = self.config.window * 5;
        states.retain(|_, state| state.window_start.elapsed() < threshold);
    }
}

impl Default for McpRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
