//! Subscription lifecycle manager
//!
//! Orchestrates grants, trials, admin actions and blocking against the store
//! and the provisioning gateway. Every operation takes an explicit `now` in
//! its `*_at` form; the plain forms use the wall clock.
//!
//! Gateway failure handling is asymmetric on purpose: a grant that needs a
//! brand-new VPN handle aborts when the gateway refuses (no entitlement
//! without a usable handle), while extending an existing handle degrades to
//! a warning and the local state still advances.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use shard_db::{
    BotUserRepository, GrantRecord, PaymentRepository, SubscriberRepository, SubscriberRow,
};
use shard_types::{DurationSpec, GrantOutcome, PaymentMethod, UserId};
use tracing::{info, instrument, warn};

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::gateway::ProvisioningGateway;
use crate::timefmt;

/// Subscription lifecycle service
pub struct SubscriptionService<S, B, P, G> {
    config: CoreConfig,
    subscribers: Arc<S>,
    bot_users: Arc<B>,
    payments: Arc<P>,
    gateway: Arc<G>,
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

impl<S, B, P, G> SubscriptionService<S, B, P, G>
where
    S: SubscriberRepository,
    B: BotUserRepository,
    P: PaymentRepository,
    G: ProvisioningGateway,
{
    /// Create a new lifecycle service
    pub fn new(
        config: CoreConfig,
        subscribers: Arc<S>,
        bot_users: Arc<B>,
        payments: Arc<P>,
        gateway: Arc<G>,
    ) -> Self {
        Self {
            config,
            subscribers,
            bot_users,
            payments,
            gateway,
        }
    }

    /// Grant subscription time, stacking onto a still-future expiry.
    ///
    /// The sole entry point for entitlement: paid confirmations, admin gifts
    /// and trials all commit through here. A duplicate payment `reference`
    /// fails with [`CoreError::DuplicatePayment`] and changes nothing.
    pub async fn grant(
        &self,
        user_id: UserId,
        spec: DurationSpec,
        method: PaymentMethod,
        amount: f64,
        reference: Option<String>,
    ) -> CoreResult<GrantOutcome> {
        self.grant_at(user_id, spec, method, amount, reference, local_now())
            .await
    }

    #[instrument(skip(self, reference), fields(user_id = %user_id))]
    pub async fn grant_at(
        &self,
        user_id: UserId,
        spec: DurationSpec,
        method: PaymentMethod,
        amount: f64,
        reference: Option<String>,
        now: NaiveDateTime,
    ) -> CoreResult<GrantOutcome> {
        let existing = self.subscribers.find(user_id.0).await?;

        let prior_expiry = existing
            .as_ref()
            .and_then(|row| row.expiry_date.as_deref())
            .and_then(timefmt::parse_stamp);
        let was_active = existing
            .as_ref()
            .map(|row| row.subscribed && timefmt::is_active(row.expiry_date.as_deref(), now))
            .unwrap_or(false);

        // Stack onto a future expiry; a lapsed or missing one restarts at now.
        let base = match prior_expiry {
            Some(exp) if exp > now => exp,
            _ => now,
        };
        let (new_expiry, added_days) = match spec {
            DurationSpec::Months(n) => {
                (timefmt::add_months(base, n), timefmt::months_as_days(base, n))
            }
            DurationSpec::Days(n) => (base + Duration::days(n as i64), n as i64),
        };

        let handle = match existing.as_ref().and_then(|row| row.config.as_deref()) {
            Some(handle) if !handle.is_empty() => {
                if let Err(e) = self.gateway.extend_config(handle, added_days).await {
                    warn!(user_id = %user_id, error = %e, "gateway extend failed, granting locally anyway");
                }
                handle.to_string()
            }
            _ => {
                let total_days = (new_expiry - now).num_days();
                self.gateway.create_config(user_id, total_days).await?
            }
        };

        self.subscribers
            .commit_grant(GrantRecord {
                user_id: user_id.0,
                payment_date: timefmt::format_stamp(now),
                expiry_date: timefmt::format_stamp(new_expiry),
                config: handle,
                amount,
                period: spec.period_months(),
                method: method.as_str().to_string(),
                reference,
            })
            .await
            .map_err(|e| match e {
                shard_db::DbError::Duplicate => CoreError::DuplicatePayment,
                other => CoreError::Database(other),
            })?;

        info!(
            user_id = %user_id,
            method = %method,
            spec = %spec,
            expiry = %timefmt::format_stamp(new_expiry),
            "subscription granted"
        );
        Ok(GrantOutcome {
            expiry: new_expiry,
            was_active,
        })
    }

    /// Admin deactivation: entitlement off, expiry forced to yesterday as an
    /// explicit already-expired marker. The VPN handle and the payment ledger
    /// are untouched. Returns false when there is no subscriber record.
    pub async fn deactivate(&self, user_id: UserId) -> CoreResult<bool> {
        self.deactivate_at(user_id, local_now()).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn deactivate_at(&self, user_id: UserId, now: NaiveDateTime) -> CoreResult<bool> {
        if self.subscribers.find(user_id.0).await?.is_none() {
            return Ok(false);
        }
        let yesterday = timefmt::format_stamp(now - Duration::days(1));
        self.subscribers
            .force_expiry(user_id.0, &yesterday, false)
            .await?;
        info!(user_id = %user_id, "subscription deactivated");
        Ok(true)
    }

    /// Admin reactivation. Lapsed at most the grace window ago keeps the old
    /// expiry; lapsed longer gets a fresh short window from now. Returns
    /// false when there is no expiry on record.
    pub async fn activate(&self, user_id: UserId) -> CoreResult<bool> {
        self.activate_at(user_id, local_now()).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn activate_at(&self, user_id: UserId, now: NaiveDateTime) -> CoreResult<bool> {
        let Some(row) = self.subscribers.find(user_id.0).await? else {
            return Ok(false);
        };
        let Some(expiry_text) = row.expiry_date.as_deref() else {
            return Ok(false);
        };
        let Some(days_left) = timefmt::days_until(expiry_text, now) else {
            return Ok(false);
        };

        if -days_left <= self.config.grace_window_days {
            // Grace reactivation: the old expiry stands untouched.
            self.subscribers.set_subscribed(user_id.0, true).await?;
            self.extend_best_effort(&row, days_left.max(1)).await;
            info!(user_id = %user_id, expiry = expiry_text, "subscription reactivated within grace");
        } else {
            let fresh = now + Duration::days(self.config.reactivation_days as i64);
            self.subscribers
                .force_expiry(user_id.0, &timefmt::format_stamp(fresh), true)
                .await?;
            self.extend_best_effort(&row, self.config.reactivation_days as i64)
                .await;
            info!(
                user_id = %user_id,
                expiry = %timefmt::format_stamp(fresh),
                "subscription reactivated with a fresh window"
            );
        }
        Ok(true)
    }

    async fn extend_best_effort(&self, row: &SubscriberRow, days: i64) {
        match row.config.as_deref() {
            Some(handle) if !handle.is_empty() => {
                if let Err(e) = self.gateway.extend_config(handle, days).await {
                    warn!(user_id = row.user_id, error = %e, "gateway extend failed during reactivation");
                }
            }
            _ => {
                warn!(user_id = row.user_id, "no VPN handle on record, skipping gateway extend");
            }
        }
    }

    /// One-time trial grant. Returns false when the trial was already
    /// consumed; the expiry is untouched in that case.
    pub async fn grant_trial(&self, user_id: UserId) -> CoreResult<bool> {
        self.grant_trial_at(user_id, local_now()).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn grant_trial_at(&self, user_id: UserId, now: NaiveDateTime) -> CoreResult<bool> {
        match self.bot_users.find(user_id.0).await? {
            Some(user) if user.trial_used => return Ok(false),
            Some(_) => {}
            None => {
                self.bot_users
                    .ensure_exists(user_id.0, &timefmt::format_stamp(now))
                    .await?;
            }
        }

        self.grant_at(
            user_id,
            DurationSpec::Days(self.config.trial_days),
            PaymentMethod::Trial,
            0.0,
            None,
            now,
        )
        .await?;
        self.bot_users.set_trial_used(user_id.0).await?;
        Ok(true)
    }

    /// Current entitlement: the explicit flag and a still-future expiry,
    /// both required
    pub async fn is_active(&self, user_id: UserId) -> CoreResult<bool> {
        self.is_active_at(user_id, local_now()).await
    }

    pub async fn is_active_at(&self, user_id: UserId, now: NaiveDateTime) -> CoreResult<bool> {
        Ok(match self.subscribers.find(user_id.0).await? {
            Some(row) => row.subscribed && timefmt::is_active(row.expiry_date.as_deref(), now),
            None => false,
        })
    }

    /// Whether the user ever made a real (non-trial) payment
    pub async fn has_ever_paid(&self, user_id: UserId) -> CoreResult<bool> {
        Ok(self.payments.has_paid(user_id.0).await?)
    }

    /// Admin extension by a fixed day count, zero amount
    pub async fn admin_extend(&self, user_id: UserId, days: u32) -> CoreResult<GrantOutcome> {
        self.grant(
            user_id,
            DurationSpec::Days(days),
            PaymentMethod::AdminGift,
            0.0,
            None,
        )
        .await
    }

    /// Admin gift through the regular grant path, zero amount
    pub async fn give_subscription(
        &self,
        user_id: UserId,
        spec: DurationSpec,
    ) -> CoreResult<GrantOutcome> {
        self.grant(user_id, spec, PaymentMethod::AdminGift, 0.0, None)
            .await
    }

    /// Block: entitlement off, expiry and handle untouched
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn block(&self, user_id: UserId) -> CoreResult<bool> {
        if self.subscribers.find(user_id.0).await?.is_none() {
            return Ok(false);
        }
        self.subscribers.set_subscribed(user_id.0, false).await?;
        info!(user_id = %user_id, "subscriber blocked");
        Ok(true)
    }

    /// Unblock: entitlement back on, but only while the expiry is still in
    /// the future. A lapsed subscriber goes through [`Self::activate`].
    pub async fn unblock(&self, user_id: UserId) -> CoreResult<bool> {
        self.unblock_at(user_id, local_now()).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn unblock_at(&self, user_id: UserId, now: NaiveDateTime) -> CoreResult<bool> {
        let Some(row) = self.subscribers.find(user_id.0).await? else {
            return Ok(false);
        };
        if !timefmt::is_active(row.expiry_date.as_deref(), now) {
            return Ok(false);
        }
        self.subscribers.set_subscribed(user_id.0, true).await?;
        info!(user_id = %user_id, "subscriber unblocked");
        Ok(true)
    }

    /// Admin purge: subscriber state, payment history and the bot-user
    /// record all removed
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete(&self, user_id: UserId) -> CoreResult<()> {
        self.subscribers.delete(user_id.0).await?;
        self.payments.delete_for_user(user_id.0).await?;
        self.bot_users.delete(user_id.0).await?;
        info!(user_id = %user_id, "subscriber purged");
        Ok(())
    }
}
