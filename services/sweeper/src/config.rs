//! Configuration for the sweeper service.

use std::time::Duration;

use shard_subscription_core::CoreConfig;

/// Sweeper service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL
    pub database_url: String,
    /// Bot API token used to deliver notifications
    pub bot_token: String,
    /// Subscription core configuration
    pub core: CoreConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let bot_token =
            std::env::var("BOT_TOKEN").map_err(|_| ConfigError::Missing("BOT_TOKEN"))?;

        let gateway_url =
            std::env::var("VPN_GATEWAY_URL").map_err(|_| ConfigError::Missing("VPN_GATEWAY_URL"))?;

        let gateway_api_key = std::env::var("VPN_GATEWAY_API_KEY")
            .map_err(|_| ConfigError::Missing("VPN_GATEWAY_API_KEY"))?;

        let server_tag = std::env::var("VPN_SERVER_TAG").unwrap_or_else(|_| "nl".to_string());

        let sweep_interval_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("SWEEP_INTERVAL_SECS"))?;

        let core = CoreConfig::new(&gateway_url, &gateway_api_key)
            .with_server_tag(&server_tag)
            .with_sweep_interval(Duration::from_secs(sweep_interval_secs));

        Ok(Self {
            database_url,
            bot_token,
            core,
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
