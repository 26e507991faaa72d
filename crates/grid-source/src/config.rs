//! HTTP client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts and retry policy for remote requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Whole-request timeout, including reading the body
    pub request_timeout_ms: u64,

    pub connect_timeout_ms: u64,

    /// Retries after the first attempt, transient failures only
    pub max_retries: u32,

    /// First retry delay; doubles on each retry
    pub initial_retry_delay_ms: u64,

    pub max_retry_delay_ms: u64,

    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            max_retries: 3,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 8_000,
            user_agent: concat!("site-data/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SourceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SOURCE_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                config.request_timeout_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("SOURCE_CONNECT_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                config.connect_timeout_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("SOURCE_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                config.max_retries = retries;
            }
        }

        if let Ok(val) = std::env::var("SOURCE_RETRY_DELAY_MS") {
            if let Ok(ms) = val.parse() {
                config.initial_retry_delay_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("SOURCE_USER_AGENT") {
            config.user_agent = val;
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms must be > 0".to_string());
        }

        if self.connect_timeout_ms == 0 {
            return Err("connect_timeout_ms must be > 0".to_string());
        }

        if self.initial_retry_delay_ms > self.max_retry_delay_ms {
            return Err(format!(
                "initial_retry_delay_ms ({}) exceeds max_retry_delay_ms ({})",
                self.initial_retry_delay_ms, self.max_retry_delay_ms
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }
}
