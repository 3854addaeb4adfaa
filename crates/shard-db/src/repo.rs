//! Repository traits
//!
//! Define async repository interfaces for database operations. Write
//! operations that touch multiple tables under one invariant (grant commit,
//! referrer attach, commission accrual) are single methods so implementations
//! can run them as one transaction.

use async_trait::async_trait;
use shard_types::NotifyThreshold;

use crate::error::DbResult;
use crate::models::*;

/// Subscriber repository trait (the `users` table)
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Find a subscriber by user id
    async fn find(&self, user_id: i64) -> DbResult<Option<SubscriberRow>>;

    /// Commit a grant: upsert the subscriber row (entitled, new expiry, VPN
    /// handle, all notification flags cleared) and append the payment ledger
    /// row, atomically. A duplicate payment reference fails the whole commit
    /// with `DbError::Duplicate`.
    async fn commit_grant(&self, grant: GrantRecord) -> DbResult<()>;

    /// Flip the entitlement flag only (block/unblock, grace reactivation)
    async fn set_subscribed(&self, user_id: i64, subscribed: bool) -> DbResult<()>;

    /// Force the expiry date and entitlement flag, clearing all notification
    /// flags (deactivation marker, fresh reactivation window)
    async fn force_expiry(&self, user_id: i64, expiry: &str, subscribed: bool) -> DbResult<()>;

    /// All rows with the entitlement flag set (sweep candidates)
    async fn list_subscribed(&self) -> DbResult<Vec<SubscriberRow>>;

    /// Set the notification flag for one threshold
    async fn mark_notified(&self, user_id: i64, threshold: NotifyThreshold) -> DbResult<()>;

    /// Remove the subscriber row
    async fn delete(&self, user_id: i64) -> DbResult<()>;
}

/// Grant commit input
#[derive(Debug, Clone)]
pub struct GrantRecord {
    pub user_id: i64,
    /// `%d.%m.%Y %H:%M`
    pub payment_date: String,
    pub expiry_date: String,
    pub config: String,
    pub amount: f64,
    pub period: i32,
    pub method: String,
    pub reference: Option<String>,
}

/// Bot user repository trait (the `bot_users` table)
#[async_trait]
pub trait BotUserRepository: Send + Sync {
    /// Find a bot user by id
    async fn find(&self, user_id: i64) -> DbResult<Option<BotUserRow>>;

    /// Upsert on interaction: create with first/last interaction stamps, or
    /// refresh last interaction and display names. Returns true when the row
    /// was newly created.
    async fn touch(&self, user: TouchBotUser) -> DbResult<bool>;

    /// Create a bare record if absent, without overwriting display names.
    /// Returns true when the row was newly created.
    async fn ensure_exists(&self, user_id: i64, now: &str) -> DbResult<bool>;

    /// Mark the one-time trial as consumed
    async fn set_trial_used(&self, user_id: i64) -> DbResult<()>;

    /// First-interaction stamps for a set of users
    async fn first_interactions(&self, user_ids: &[i64]) -> DbResult<Vec<(i64, Option<String>)>>;

    /// Remove the bot user row
    async fn delete(&self, user_id: i64) -> DbResult<()>;
}

/// Bot user upsert input
#[derive(Debug, Clone)]
pub struct TouchBotUser {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `%d.%m.%Y %H:%M`
    pub now: String,
}

/// Payment ledger repository trait
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Whether any non-trial payment exists for the user
    async fn has_paid(&self, user_id: i64) -> DbResult<bool>;

    /// Billing history, newest first
    async fn history(&self, user_id: i64, limit: i64) -> DbResult<Vec<PaymentRow>>;

    /// Remove all ledger rows for a user (admin purge only)
    async fn delete_for_user(&self, user_id: i64) -> DbResult<()>;
}

/// Referral graph and commission ledger repository trait
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Record a referrer->referred edge, set the referred user's
    /// `referrer_id` and bump the referrer's counter, atomically. The caller
    /// has already validated the first-contact preconditions.
    async fn attach(&self, referrer_id: i64, referred_id: i64, date: &str) -> DbResult<()>;

    /// The user's direct referrer, if any
    async fn referrer_of(&self, user_id: i64) -> DbResult<Option<i64>>;

    /// Users directly referred by this user
    async fn direct_referrals(&self, user_id: i64) -> DbResult<Vec<i64>>;

    /// Whether a referral edge already exists for this referred user
    async fn has_edge(&self, referred_id: i64) -> DbResult<bool>;

    /// Accrue one commission: bump the beneficiary's balance and append the
    /// reward ledger row, atomically
    async fn accrue(&self, reward: CreateReward) -> DbResult<()>;

    /// Current commission balance
    async fn balance(&self, user_id: i64) -> DbResult<f64>;

    /// Reward ledger rows for a beneficiary, newest first
    async fn rewards_for(&self, beneficiary_id: i64) -> DbResult<Vec<ReferralRewardRow>>;

    /// Global `(referred_total, referred_with_paid_subscription)` counts
    async fn conversion_counts(&self) -> DbResult<(i64, i64)>;

    /// Leaderboard by total referral count with paid-conversion counts
    async fn top_referrers(&self, limit: i64) -> DbResult<Vec<TopReferrerRow>>;
}

/// Commission accrual input
#[derive(Debug, Clone)]
pub struct CreateReward {
    pub payer_id: i64,
    pub beneficiary_id: i64,
    pub level: i32,
    pub amount: f64,
    /// `%d.%m.%Y %H:%M`
    pub created_at: String,
    pub method: String,
}
