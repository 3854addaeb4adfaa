//! Referral graph and commission engine
//!
//! Three tracked levels with fixed commission shares. Attachment is
//! first-contact-only: a user who has ever interacted with the bot can never
//! be attached to a referrer retroactively.

use std::sync::Arc;

use chrono::NaiveDateTime;
use shard_db::{BotUserRepository, CreateReward, ReferralRepository};
use shard_types::{ConversionStats, PaymentMethod, ReferralOverview, TopReferrer, Uplines, UserId};
use tracing::{debug, info, instrument};

use crate::error::CoreResult;
use crate::timefmt;

/// Commission share per upline level, level 1 first
const COMMISSION_SHARES: [f64; 3] = [0.35, 0.10, 0.05];

const LEADERBOARD_SIZE: i64 = 10;

fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Referral program service
pub struct ReferralService<R, B> {
    referrals: Arc<R>,
    bot_users: Arc<B>,
}

impl<R, B> ReferralService<R, B>
where
    R: ReferralRepository,
    B: BotUserRepository,
{
    /// Create a new referral service
    pub fn new(referrals: Arc<R>, bot_users: Arc<B>) -> Self {
        Self {
            referrals,
            bot_users,
        }
    }

    /// Attach a referrer to a brand-new user.
    ///
    /// Returns false without writing anything when the user refers
    /// themselves, already has any bot-user record, or already carries a
    /// referral edge.
    pub async fn attach_referrer(&self, referred: UserId, referrer: UserId) -> CoreResult<bool> {
        self.attach_referrer_at(referred, referrer, local_now())
            .await
    }

    #[instrument(skip(self), fields(referred = %referred, referrer = %referrer))]
    pub async fn attach_referrer_at(
        &self,
        referred: UserId,
        referrer: UserId,
        now: NaiveDateTime,
    ) -> CoreResult<bool> {
        if referred == referrer {
            return Ok(false);
        }
        if self.bot_users.find(referred.0).await?.is_some() {
            debug!("user already known, referral link ignored");
            return Ok(false);
        }
        if self.referrals.has_edge(referred.0).await? {
            return Ok(false);
        }

        let stamp = timefmt::format_stamp(now);
        self.bot_users.ensure_exists(referrer.0, &stamp).await?;
        self.bot_users.ensure_exists(referred.0, &stamp).await?;
        self.referrals
            .attach(referrer.0, referred.0, &stamp)
            .await?;
        info!("referral attached");
        Ok(true)
    }

    /// Walk the referrer chain up to three hops. A broken link nulls its
    /// level and everything deeper.
    pub async fn resolve_uplines(&self, payer: UserId) -> CoreResult<Uplines> {
        let mut uplines = Uplines::default();
        let Some(l1) = self.referrals.referrer_of(payer.0).await? else {
            return Ok(uplines);
        };
        uplines.level1 = Some(UserId(l1));
        let Some(l2) = self.referrals.referrer_of(l1).await? else {
            return Ok(uplines);
        };
        uplines.level2 = Some(UserId(l2));
        if let Some(l3) = self.referrals.referrer_of(l2).await? {
            uplines.level3 = Some(UserId(l3));
        }
        Ok(uplines)
    }

    /// Accrue commissions for one qualifying payment.
    ///
    /// Each resolvable upline gets its fixed share of `amount`, rounded to
    /// two decimals; null uplines, self-referrals and non-positive rounded
    /// shares are skipped. Returns the total accrued. Must run once per
    /// payment event; the payment confirmation path owns that guarantee.
    pub async fn accrue_commissions(
        &self,
        payer: UserId,
        amount: f64,
        method: PaymentMethod,
    ) -> CoreResult<f64> {
        self.accrue_commissions_at(payer, amount, method, local_now())
            .await
    }

    #[instrument(skip(self), fields(payer = %payer))]
    pub async fn accrue_commissions_at(
        &self,
        payer: UserId,
        amount: f64,
        method: PaymentMethod,
        now: NaiveDateTime,
    ) -> CoreResult<f64> {
        let uplines = self.resolve_uplines(payer).await?;
        let stamp = timefmt::format_stamp(now);
        let mut total = 0.0;

        for (level, upline) in uplines.iter() {
            let Some(beneficiary) = upline else { continue };
            if beneficiary == payer {
                continue;
            }
            let share = round2(amount * COMMISSION_SHARES[level as usize - 1]);
            if share <= 0.0 {
                continue;
            }
            self.referrals
                .accrue(CreateReward {
                    payer_id: payer.0,
                    beneficiary_id: beneficiary.0,
                    level: level as i32,
                    amount: share,
                    created_at: stamp.clone(),
                    method: method.as_str().to_string(),
                })
                .await?;
            info!(beneficiary = %beneficiary, level, share, "commission accrued");
            total += share;
        }
        Ok(total)
    }

    /// Partner dashboard overview: balance, per-level counts and today's new
    /// first interactions across all tracked levels
    pub async fn overview(&self, user_id: UserId) -> CoreResult<ReferralOverview> {
        self.overview_at(user_id, local_now()).await
    }

    pub async fn overview_at(
        &self,
        user_id: UserId,
        now: NaiveDateTime,
    ) -> CoreResult<ReferralOverview> {
        let level1 = self.referrals.direct_referrals(user_id.0).await?;
        let mut level2 = Vec::new();
        for id in &level1 {
            level2.extend(self.referrals.direct_referrals(*id).await?);
        }
        let mut level3 = Vec::new();
        for id in &level2 {
            level3.extend(self.referrals.direct_referrals(*id).await?);
        }

        let mut all: Vec<i64> = Vec::with_capacity(level1.len() + level2.len() + level3.len());
        all.extend_from_slice(&level1);
        all.extend_from_slice(&level2);
        all.extend_from_slice(&level3);

        let today = now.date();
        let today_first_line = self
            .bot_users
            .first_interactions(&all)
            .await?
            .into_iter()
            .filter(|(_, first)| {
                first
                    .as_deref()
                    .and_then(timefmt::parse_stamp)
                    .map(|dt| dt.date() == today)
                    .unwrap_or(false)
            })
            .count() as u64;

        Ok(ReferralOverview {
            balance: self.referrals.balance(user_id.0).await?,
            level1: level1.len() as u64,
            level2: level2.len() as u64,
            level3: level3.len() as u64,
            today_first_line,
        })
    }

    /// Global conversion report with a top-10 leaderboard
    pub async fn conversion_stats(&self) -> CoreResult<ConversionStats> {
        let (total, subscribed) = self.referrals.conversion_counts().await?;
        let top_referrers = self
            .referrals
            .top_referrers(LEADERBOARD_SIZE)
            .await?
            .into_iter()
            .map(|row| TopReferrer {
                referrer_id: UserId(row.referrer_id),
                total_referrals: row.total_refs as u64,
                paid_referrals: row.paid_refs as u64,
            })
            .collect();

        Ok(ConversionStats {
            subscribed_referrals: subscribed as u64,
            unsubscribed_referrals: (total - subscribed).max(0) as u64,
            top_referrers,
        })
    }
}
