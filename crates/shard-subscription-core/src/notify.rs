//! Expiry notification sweeps
//!
//! A recurring sweep catches subscriptions crossing the 3-day, 1-day and
//! expired thresholds, plus an older independent 2-day sweep with its own
//! flag. Thresholds match on the exact calendar day: a sweep delayed past a
//! threshold's day permanently skips that message for the cycle. This is a
//! known limitation, kept as-is.
//!
//! Flags are marked even when dispatch fails, so a subscriber is messaged at
//! most once per threshold per expiry.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use shard_db::{SubscriberRepository, SubscriberRow};
use shard_types::{NotifyThreshold, UserId};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::timefmt;

/// Outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one threshold message; a failure here does not stop the sweep
    async fn notify(
        &self,
        user_id: UserId,
        threshold: NotifyThreshold,
        expiry: &str,
    ) -> CoreResult<()>;
}

/// Counters from one sweep pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Threshold crossings found
    pub matched: usize,
    /// Messages delivered
    pub dispatched: usize,
    /// Deliveries that failed; the flag is marked regardless
    pub dispatch_failures: usize,
}

/// Periodic expiry notification sweeper
pub struct NotificationSweeper<S, N> {
    config: CoreConfig,
    subscribers: Arc<S>,
    notifier: Arc<N>,
}

impl<S, N> NotificationSweeper<S, N>
where
    S: SubscriberRepository,
    N: Notifier,
{
    /// Create a new sweeper
    pub fn new(config: CoreConfig, subscribers: Arc<S>, notifier: Arc<N>) -> Self {
        Self {
            config,
            subscribers,
            notifier,
        }
    }

    fn qualifies(row: &SubscriberRow, threshold: NotifyThreshold, now: NaiveDateTime) -> bool {
        if row.is_notified(threshold) {
            return false;
        }
        let Some(expiry) = row.expiry_date.as_deref() else {
            return false;
        };
        let Some(days_left) = timefmt::days_until(expiry, now) else {
            return false;
        };
        match threshold.days() {
            Some(days) => days_left == days,
            // Expired means strictly past, not "expires today".
            None => days_left < 0,
        }
    }

    async fn sweep_threshold(
        &self,
        rows: &[SubscriberRow],
        threshold: NotifyThreshold,
        now: NaiveDateTime,
        report: &mut SweepReport,
    ) -> CoreResult<()> {
        for row in rows {
            if !Self::qualifies(row, threshold, now) {
                continue;
            }
            report.matched += 1;
            let expiry = row.expiry_date.as_deref().unwrap_or_default();
            match self.notifier.notify(row.user_id(), threshold, expiry).await {
                Ok(()) => report.dispatched += 1,
                Err(e) => {
                    warn!(user_id = row.user_id, ?threshold, error = %e, "notification dispatch failed");
                    report.dispatch_failures += 1;
                }
            }
            self.subscribers.mark_notified(row.user_id, threshold).await?;
        }
        Ok(())
    }

    /// One pass over the 3-day, 1-day and expired thresholds
    pub async fn sweep(&self) -> CoreResult<SweepReport> {
        self.sweep_at(chrono::Local::now().naive_local()).await
    }

    #[instrument(skip(self))]
    pub async fn sweep_at(&self, now: NaiveDateTime) -> CoreResult<SweepReport> {
        let rows = self.subscribers.list_subscribed().await?;
        let mut report = SweepReport::default();
        for threshold in [
            NotifyThreshold::ThreeDays,
            NotifyThreshold::OneDay,
            NotifyThreshold::Expired,
        ] {
            self.sweep_threshold(&rows, threshold, now, &mut report)
                .await?;
        }
        if report.matched > 0 {
            info!(
                matched = report.matched,
                dispatched = report.dispatched,
                failures = report.dispatch_failures,
                "expiry sweep finished"
            );
        }
        Ok(report)
    }

    /// One pass of the independent legacy 2-day sweep
    pub async fn sweep_legacy(&self) -> CoreResult<SweepReport> {
        self.sweep_legacy_at(chrono::Local::now().naive_local())
            .await
    }

    #[instrument(skip(self))]
    pub async fn sweep_legacy_at(&self, now: NaiveDateTime) -> CoreResult<SweepReport> {
        let rows = self.subscribers.list_subscribed().await?;
        let mut report = SweepReport::default();
        self.sweep_threshold(&rows, NotifyThreshold::LegacyTwoDays, now, &mut report)
            .await?;
        Ok(report)
    }

    /// Run both sweeps on the configured interval until cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(interval = ?self.config.sweep_interval, "notification sweeper started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("notification sweeper shutting down");
                    return;
                }
                _ = tokio::time::sleep(self.config.sweep_interval) => {}
            }
            if let Err(e) = self.sweep().await {
                error!(error = %e, "expiry sweep failed");
            }
            if let Err(e) = self.sweep_legacy().await {
                error!(error = %e, "legacy sweep failed");
            }
        }
    }
}
