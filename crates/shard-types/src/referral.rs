//! Referral program types

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Resolved referral ancestors of a payer, up to three hops.
///
/// A missing link nulls its level and every deeper one: there is no skipping
/// over a broken chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uplines {
    pub level1: Option<UserId>,
    pub level2: Option<UserId>,
    pub level3: Option<UserId>,
}

impl Uplines {
    /// Iterate `(level, upline)` pairs with 1-based levels
    pub fn iter(&self) -> impl Iterator<Item = (u8, Option<UserId>)> {
        [(1, self.level1), (2, self.level2), (3, self.level3)].into_iter()
    }
}

/// Per-referrer overview shown in the partner dashboard.
///
/// `today_first_line` is the historical name for today's new first
/// interactions counted across all three tracked levels combined, not only
/// the first line. The observed behavior is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferralOverview {
    /// Accumulated commission balance
    pub balance: f64,
    /// Direct referrals
    pub level1: u64,
    /// Referrals of referrals
    pub level2: u64,
    /// Third-line referrals
    pub level3: u64,
    /// New first interactions today across all three levels
    pub today_first_line: u64,
}

/// One leaderboard row in the global referral report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopReferrer {
    pub referrer_id: UserId,
    /// Total referred users
    pub total_referrals: u64,
    /// Referred users holding a paid (non-trial) active subscription
    pub paid_referrals: u64,
}

/// Global referral conversion report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Referred users with a paid (non-trial) active subscription
    pub subscribed_referrals: u64,
    /// Referred users without one (never paid, trial-only, or lapsed)
    pub unsubscribed_referrals: u64,
    /// Top referrers by total referral count
    pub top_referrers: Vec<TopReferrer>,
}
