//! PostgreSQL referral graph and commission ledger implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{DbError, DbResult};
use crate::models::{ReferralRewardRow, TopReferrerRow};
use crate::repo::{CreateReward, ReferralRepository};

/// PostgreSQL referral repository
#[derive(Clone)]
pub struct PgReferralRepository {
    pool: PgPool,
}

impl PgReferralRepository {
    /// Create a new referral repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferralRepository for PgReferralRepository {
    async fn attach(&self, referrer_id: i64, referred_id: i64, date: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO referrals (referrer_id, referred_id, referral_date)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(referrer_id)
        .bind(referred_id)
        .bind(date)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from_sqlx)?;

        sqlx::query("UPDATE bot_users SET referrer_id = $1 WHERE user_id = $2")
            .bind(referrer_id)
            .bind(referred_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE bot_users SET total_referrals = total_referrals + 1 WHERE user_id = $1",
        )
        .bind(referrer_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn referrer_of(&self, user_id: i64) -> DbResult<Option<i64>> {
        let referrer = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT referrer_id FROM bot_users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(referrer.flatten())
    }

    async fn direct_referrals(&self, user_id: i64) -> DbResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT referred_id FROM referrals WHERE referrer_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn has_edge(&self, referred_id: i64) -> DbResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM referrals WHERE referred_id = $1)",
        )
        .bind(referred_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn accrue(&self, reward: CreateReward) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE bot_users SET referral_balance = referral_balance + $1 WHERE user_id = $2",
        )
        .bind(reward.amount)
        .bind(reward.beneficiary_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO referral_rewards (payer_id, beneficiary_id, level, amount,
                                          created_at, method)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(reward.payer_id)
        .bind(reward.beneficiary_id)
        .bind(reward.level)
        .bind(reward.amount)
        .bind(&reward.created_at)
        .bind(&reward.method)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn balance(&self, user_id: i64) -> DbResult<f64> {
        let balance = sqlx::query_scalar::<_, f64>(
            "SELECT referral_balance FROM bot_users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance.unwrap_or(0.0))
    }

    async fn rewards_for(&self, beneficiary_id: i64) -> DbResult<Vec<ReferralRewardRow>> {
        let rows = sqlx::query_as::<_, ReferralRewardRow>(
            r#"
            SELECT id, payer_id, beneficiary_id, level, amount, created_at, method
            FROM referral_rewards
            WHERE beneficiary_id = $1
            ORDER BY id DESC
            "#,
        )
        .bind(beneficiary_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn conversion_counts(&self) -> DbResult<(i64, i64)> {
        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM referrals")
                .fetch_one(&self.pool)
                .await?;

        // "Paid" means the entitlement flag is on and a non-trial ledger row
        // exists; expiry staleness is not re-checked here, matching how the
        // report has always counted.
        let subscribed = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM referrals r
            JOIN users u ON u.user_id = r.referred_id
            WHERE u.subscribed
              AND EXISTS (
                  SELECT 1 FROM payments p
                  WHERE p.user_id = r.referred_id AND p.payment_method <> 'trial'
              )
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((total, subscribed))
    }

    async fn top_referrers(&self, limit: i64) -> DbResult<Vec<TopReferrerRow>> {
        let rows = sqlx::query_as::<_, TopReferrerRow>(
            r#"
            SELECT r.referrer_id,
                   COUNT(r.referred_id) AS total_refs,
                   COUNT(r.referred_id) FILTER (
                       WHERE u.subscribed
                         AND EXISTS (
                             SELECT 1 FROM payments p
                             WHERE p.user_id = r.referred_id
                               AND p.payment_method <> 'trial'
                         )
                   ) AS paid_refs
            FROM referrals r
            LEFT JOIN users u ON u.user_id = r.referred_id
            GROUP BY r.referrer_id
            ORDER BY total_refs DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
