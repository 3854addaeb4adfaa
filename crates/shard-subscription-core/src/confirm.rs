//! Payment confirmation path
//!
//! One confirmed external payment event drives exactly one grant and, for
//! paid methods, exactly one commission accrual. Duplicate deliveries of the
//! same event are rejected by the payment reference before anything commits.

use std::sync::Arc;

use chrono::NaiveDateTime;
use shard_db::{BotUserRepository, PaymentRepository, ReferralRepository, SubscriberRepository};
use shard_types::{DurationSpec, GrantOutcome, PaymentMethod, UserId};
use tracing::{error, info, instrument};

use crate::error::CoreResult;
use crate::gateway::ProvisioningGateway;
use crate::lifecycle::SubscriptionService;
use crate::referral::ReferralService;

/// A confirmed external payment
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub user_id: UserId,
    pub spec: DurationSpec,
    pub method: PaymentMethod,
    pub amount: f64,
    /// External payment reference; unique per real-world payment
    pub reference: Option<String>,
}

/// Applies confirmed payments: grant first, then commissions
pub struct PaymentConfirmer<S, B, P, G, R> {
    subscriptions: Arc<SubscriptionService<S, B, P, G>>,
    referrals: Arc<ReferralService<R, B>>,
}

impl<S, B, P, G, R> PaymentConfirmer<S, B, P, G, R>
where
    S: SubscriberRepository,
    B: BotUserRepository,
    P: PaymentRepository,
    G: ProvisioningGateway,
    R: ReferralRepository,
{
    /// Create a new confirmer
    pub fn new(
        subscriptions: Arc<SubscriptionService<S, B, P, G>>,
        referrals: Arc<ReferralService<R, B>>,
    ) -> Self {
        Self {
            subscriptions,
            referrals,
        }
    }

    /// Apply one confirmed payment
    pub async fn confirm(&self, event: PaymentEvent) -> CoreResult<GrantOutcome> {
        self.confirm_at(event, chrono::Local::now().naive_local())
            .await
    }

    #[instrument(skip(self, event), fields(user_id = %event.user_id, method = %event.method))]
    pub async fn confirm_at(
        &self,
        event: PaymentEvent,
        now: NaiveDateTime,
    ) -> CoreResult<GrantOutcome> {
        let outcome = self
            .subscriptions
            .grant_at(
                event.user_id,
                event.spec,
                event.method,
                event.amount,
                event.reference,
                now,
            )
            .await?;

        if event.method.is_paid() && event.amount > 0.0 {
            // The grant is already committed; a failed accrual must not
            // undo it, only get flagged for reconciliation.
            match self
                .referrals
                .accrue_commissions_at(event.user_id, event.amount, event.method, now)
                .await
            {
                Ok(total) if total > 0.0 => {
                    info!(total, "commissions accrued for payment");
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "commission accrual failed after committed grant");
                }
            }
        }
        Ok(outcome)
    }
}
