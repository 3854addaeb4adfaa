//! Core configuration

use std::time::Duration;

/// Subscription core configuration
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL of the VPN provisioning server
    pub gateway_base_url: String,
    /// API key sent in the `x-api-key` header
    pub gateway_api_key: String,
    /// Server pool tag passed to the provisioning API
    pub server_tag: String,
    /// Timeout for a single gateway call; there are no automatic retries
    pub gateway_timeout: Duration,
    /// Reactivation keeps the old expiry when it lapsed at most this many
    /// days ago
    pub grace_window_days: i64,
    /// Fresh window handed out when reactivating a long-lapsed subscription
    pub reactivation_days: u32,
    /// One-time trial length
    pub trial_days: u32,
    /// Delay between notification sweep passes
    pub sweep_interval: Duration,
}

impl CoreConfig {
    /// Create a new core config with default durations
    pub fn new(gateway_base_url: impl Into<String>, gateway_api_key: impl Into<String>) -> Self {
        Self {
            gateway_base_url: gateway_base_url.into(),
            gateway_api_key: gateway_api_key.into(),
            server_tag: "nl".to_string(),
            gateway_timeout: Duration::from_secs(10),
            grace_window_days: 30,
            reactivation_days: 7,
            trial_days: 14,
            sweep_interval: Duration::from_secs(60 * 60),
        }
    }

    /// Set the server pool tag
    pub fn with_server_tag(mut self, tag: impl Into<String>) -> Self {
        self.server_tag = tag.into();
        self
    }

    /// Set the gateway call timeout
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Set the sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
