//! Subscription types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// How a payment or grant was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment through the external payment gateway
    Card,
    /// In-chat digital currency payment
    Stars,
    /// Subscription given by an administrator
    AdminGift,
    /// One-time trial grant
    Trial,
}

impl PaymentMethod {
    /// Storage tag for the payments ledger
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Stars => "stars",
            Self::AdminGift => "admin_gift",
            Self::Trial => "trial",
        }
    }

    /// Whether payments with this method count toward referral commissions
    /// and paid-conversion reporting
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Card | Self::Stars)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "stars" => Ok(Self::Stars),
            "admin_gift" => Ok(Self::AdminGift),
            "trial" => Ok(Self::Trial),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Duration of a subscription grant.
///
/// Regular paid periods use calendar months (month-rollover arithmetic, not a
/// 30-day approximation). Trials and short admin grants use fixed days so the
/// local expiry stays in lockstep with the day-based provisioning server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSpec {
    /// N calendar months
    Months(u32),
    /// N fixed days
    Days(u32),
}

impl DurationSpec {
    /// Ledger `period` value: months for calendar grants, 0 for fixed-day
    /// special/trial grants
    pub fn period_months(&self) -> i32 {
        match self {
            Self::Months(n) => *n as i32,
            Self::Days(_) => 0,
        }
    }
}

impl std::fmt::Display for DurationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Months(n) => write!(f, "{n} mo"),
            Self::Days(n) => write!(f, "{n} d"),
        }
    }
}

/// Notification thresholds tracked per subscriber.
///
/// Each threshold has its own persisted flag so a sweep fires at most once
/// per threshold per expiry. `LegacyTwoDays` belongs to an older independent
/// sweep and shares no state with the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyThreshold {
    /// Three days before expiry
    ThreeDays,
    /// One day before expiry
    OneDay,
    /// Expiry date is strictly in the past
    Expired,
    /// Legacy two-days-before sweep
    LegacyTwoDays,
}

impl NotifyThreshold {
    /// Days-until-expiry value this threshold matches, if it is an exact-day
    /// threshold
    pub fn days(&self) -> Option<i64> {
        match self {
            Self::ThreeDays => Some(3),
            Self::OneDay => Some(1),
            Self::LegacyTwoDays => Some(2),
            Self::Expired => None,
        }
    }
}

/// Outcome of a successful grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantOutcome {
    /// New expiry timestamp after the grant
    pub expiry: NaiveDateTime,
    /// Whether the subscriber already had an active subscription before
    pub was_active: bool,
}
