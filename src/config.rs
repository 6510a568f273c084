//! Configuration for the chat core.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Path to the sqlite datastore.
    pub db_path: PathBuf,

    /// Content and session thresholds.
    pub limits: ChatLimits,

    /// Per-adapter local rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Vendor endpoints; overridable for self-hosted gateways and tests.
    pub openai: VendorEndpoint,
    pub anthropic: VendorEndpoint,
}

/// Cost-control thresholds. Defaults preserve the production constants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChatLimits {
    /// Hard cap on messages stored per session.
    pub max_session_messages: usize,

    /// Maximum characters in one outbound message.
    pub max_message_chars: usize,

    /// History window handed to the vendor per request.
    pub history_limit: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window, per adapter instance.
    pub max_requests: usize,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorEndpoint {
    /// API base URL, no trailing slash.
    pub base_url: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("slipspace-chat.db"),
            limits: ChatLimits::default(),
            rate_limit: RateLimitConfig::default(),
            openai: VendorEndpoint {
                base_url: "https://api.openai.com/v1".to_string(),
            },
            anthropic: VendorEndpoint {
                base_url: "https://api.anthropic.com".to_string(),
            },
        }
    }
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            max_session_messages: 50,
            max_message_chars: 500,
            history_limit: 10,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 50,
            window_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_constants() {
        let config = ChatConfig::default();
        assert_eq!(config.limits.max_session_messages, 50);
        assert_eq!(config.limits.max_message_chars, 500);
        assert_eq!(config.rate_limit.max_requests, 50);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = ChatConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ChatConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.limits.history_limit, config.limits.history_limit);
        assert_eq!(parsed.openai.base_url, config.openai.base_url);
    }
}
