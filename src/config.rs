use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bridge timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// How long to wait for the embedded document to finish loading (ms)
    pub load_timeout_ms: u64,
    /// How long the injected provider waits for a reply to one request (ms)
    pub request_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl BridgeConfig {
    /// Load bridge configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            load_timeout_ms: std::env::var("BRIDGE_LOAD_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.load_timeout_ms),
            request_timeout_ms: std::env::var("BRIDGE_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_ms),
        }
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.load_timeout(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
