//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.
//!
//! Subscription timestamps are stored as TEXT in the formats the system has
//! accumulated over time; all read paths parse them through the ordered
//! format list in the core crate rather than assuming a single layout.

use shard_types::{NotifyThreshold, UserId};
use sqlx::FromRow;

/// Subscriber row from the `users` table
#[derive(Debug, Clone, FromRow)]
pub struct SubscriberRow {
    pub user_id: i64,
    /// Explicit entitlement flag; active-check is `subscribed AND now < expiry`
    pub subscribed: bool,
    pub payment_date: Option<String>,
    pub expiry_date: Option<String>,
    /// Opaque VPN config handle issued by the provisioning gateway
    pub config: Option<String>,
    pub last_update: Option<String>,
    pub notified_expiring_2d: bool,
    pub notified_3d: bool,
    pub notified_1d: bool,
    pub notified_expired: bool,
}

impl SubscriberRow {
    /// Convert to domain UserId
    pub fn user_id(&self) -> UserId {
        UserId(self.user_id)
    }

    /// Whether the flag for a threshold is already set
    pub fn is_notified(&self, threshold: NotifyThreshold) -> bool {
        match threshold {
            NotifyThreshold::ThreeDays => self.notified_3d,
            NotifyThreshold::OneDay => self.notified_1d,
            NotifyThreshold::Expired => self.notified_expired,
            NotifyThreshold::LegacyTwoDays => self.notified_expiring_2d,
        }
    }
}

/// Bot user row from the `bot_users` table (superset of subscribers)
#[derive(Debug, Clone, FromRow)]
pub struct BotUserRow {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub first_interaction: Option<String>,
    pub last_interaction: Option<String>,
    /// Set at most once, on first-ever contact
    pub referrer_id: Option<i64>,
    pub trial_used: bool,
    pub referral_balance: f64,
    pub total_referrals: i64,
}

impl BotUserRow {
    /// Convert to domain UserId
    pub fn user_id(&self) -> UserId {
        UserId(self.user_id)
    }
}

/// Payment ledger row (append-only)
#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    /// Months for calendar grants, 0 for fixed-day special/trial grants
    pub period: i32,
    pub payment_date: Option<String>,
    pub payment_method: String,
    /// External payment reference; unique when present
    pub reference: Option<String>,
}

/// Referral edge row (at most one per referred user, ever)
#[derive(Debug, Clone, FromRow)]
pub struct ReferralEdgeRow {
    pub id: i64,
    pub referrer_id: i64,
    pub referred_id: i64,
    pub referral_date: Option<String>,
}

/// Commission ledger row (append-only audit trail behind referral balances)
#[derive(Debug, Clone, FromRow)]
pub struct ReferralRewardRow {
    pub id: i64,
    pub payer_id: i64,
    pub beneficiary_id: i64,
    pub level: i32,
    pub amount: f64,
    pub created_at: String,
    pub method: String,
}

/// Leaderboard row for the global referral report
#[derive(Debug, Clone, FromRow)]
pub struct TopReferrerRow {
    pub referrer_id: i64,
    pub total_refs: i64,
    pub paid_refs: i64,
}
