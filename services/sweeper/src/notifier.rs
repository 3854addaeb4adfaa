//! Bot API notification channel

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use shard_subscription_core::{CoreError, CoreResult, Notifier};
use shard_types::{NotifyThreshold, UserId};
use tracing::debug;

const BOT_API_BASE: &str = "https://api.telegram.org";

/// Sends threshold messages through the bot chat
pub struct TelegramNotifier {
    client: Client,
    token: String,
}

impl TelegramNotifier {
    /// Create a new notifier
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
        }
    }

    fn message_for(threshold: NotifyThreshold, expiry: &str) -> String {
        match threshold {
            NotifyThreshold::ThreeDays => {
                format!("Your VPN subscription expires in 3 days, on {expiry}. Renew now to stay connected.")
            }
            NotifyThreshold::OneDay => {
                format!("Your VPN subscription expires tomorrow, on {expiry}. Renew now to stay connected.")
            }
            NotifyThreshold::LegacyTwoDays => {
                format!("Your VPN subscription expires soon, on {expiry}. Renew now to stay connected.")
            }
            NotifyThreshold::Expired => {
                "Your VPN subscription has expired. Renew to restore access.".to_string()
            }
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(
        &self,
        user_id: UserId,
        threshold: NotifyThreshold,
        expiry: &str,
    ) -> CoreResult<()> {
        let url = format!("{BOT_API_BASE}/bot{}/sendMessage", self.token);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": user_id.0,
                "text": Self::message_for(threshold, expiry),
            }))
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("bot api request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::Internal(format!(
                "bot api returned {}",
                response.status()
            )));
        }
        debug!(user_id = %user_id, ?threshold, "notification delivered");
        Ok(())
    }
}
