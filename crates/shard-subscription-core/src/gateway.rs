//! VPN provisioning gateway
//!
//! The remote config server issues and extends opaque VPN config handles.
//! It offers no transactionality against our store and no idempotency
//! promises; every call is a single attempt with a bounded timeout.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use shard_types::UserId;
use tracing::{debug, error, instrument};

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};

/// Provisioning gateway trait
///
/// Abstracts the remote VPN config server so the lifecycle logic can be
/// exercised against a scripted implementation in tests.
#[async_trait]
pub trait ProvisioningGateway: Send + Sync {
    /// Issue a new config handle valid for `days` days
    async fn create_config(&self, user_id: UserId, days: i64) -> CoreResult<String>;

    /// Extend an existing handle by `days` days
    async fn extend_config(&self, handle: &str, days: i64) -> CoreResult<()>;
}

/// HTTP provisioning gateway against the remote config server
#[derive(Clone)]
pub struct HttpProvisioningGateway {
    client: Client,
    config: CoreConfig,
}

impl HttpProvisioningGateway {
    /// Create a new gateway client.
    ///
    /// Fails when the HTTP client cannot be built; a client without the
    /// bounded timeout is never handed out.
    pub fn new(config: CoreConfig) -> CoreResult<Self> {
        let client = Client::builder()
            .timeout(config.gateway_timeout)
            .build()
            .map_err(|e| CoreError::Internal(format!("http client init failed: {e}")))?;
        Ok(Self { client, config })
    }

    async fn post(&self, endpoint: &str, body: serde_json::Value) -> CoreResult<String> {
        let url = format!("{}{endpoint}", self.config.gateway_base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.gateway_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint, "provisioning request failed");
                CoreError::Provisioning(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, endpoint, "provisioning server error");
            return Err(CoreError::Provisioning(format!(
                "provisioning server error: {status}"
            )));
        }

        response.text().await.map_err(|e| {
            error!(error = %e, "failed to read provisioning response");
            CoreError::Provisioning(e.to_string())
        })
    }
}

#[async_trait]
impl ProvisioningGateway for HttpProvisioningGateway {
    #[instrument(skip(self))]
    async fn create_config(&self, user_id: UserId, days: i64) -> CoreResult<String> {
        debug!(user_id = %user_id, days, "requesting new VPN config");

        let handle = self
            .post(
                "/giveconfig",
                json!({
                    "time": days,
                    "id": user_id.to_string(),
                    "server": self.config.server_tag,
                }),
            )
            .await?;

        // The server wraps the handle in quotes on some deployments.
        let handle = handle.trim().trim_matches(['"', '\'']).to_string();
        if handle.is_empty() {
            return Err(CoreError::Provisioning("empty config handle".to_string()));
        }
        Ok(handle)
    }

    #[instrument(skip(self, handle))]
    async fn extend_config(&self, handle: &str, days: i64) -> CoreResult<()> {
        debug!(days, "extending VPN config");

        self.post(
            "/extendconfig",
            json!({
                "time": days,
                "uid": handle,
                "server": self.config.server_tag,
            }),
        )
        .await?;

        Ok(())
    }
}
