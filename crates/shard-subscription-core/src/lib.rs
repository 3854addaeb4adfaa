//! Shard Subscription Core - Subscription lifecycle and referral engine
//!
//! Core business logic for the Shard VPN bot:
//! - subscription grants, renewals, trials and admin actions, with VPN
//!   provisioning side effects against the remote config server
//! - the multi-level referral graph and commission ledger
//! - idempotent expiry-notification sweeps
//!
//! # Example
//!
//! ```rust,ignore
//! use shard_subscription_core::{CoreConfig, HttpProvisioningGateway, SubscriptionService};
//! use shard_db::Repositories;
//!
//! let config = CoreConfig::new("https://vpn.example.com", "api-key");
//! let gateway = HttpProvisioningGateway::new(config.clone())?;
//! let subs = SubscriptionService::new(
//!     config,
//!     repos.subscribers.clone(),
//!     repos.bot_users.clone(),
//!     repos.payments.clone(),
//!     gateway,
//! );
//!
//! subs.grant(user_id, DurationSpec::Months(1), PaymentMethod::Card, 99.0, None).await?;
//! ```

pub mod config;
pub mod confirm;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod notify;
pub mod referral;
pub mod timefmt;

pub use config::CoreConfig;
pub use confirm::{PaymentConfirmer, PaymentEvent};
pub use error::{CoreError, CoreResult};
pub use gateway::{HttpProvisioningGateway, ProvisioningGateway};
pub use lifecycle::SubscriptionService;
pub use notify::{NotificationSweeper, Notifier, SweepReport};
pub use referral::ReferralService;
