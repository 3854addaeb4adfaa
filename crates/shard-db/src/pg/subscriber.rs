//! PostgreSQL subscriber repository implementation

use async_trait::async_trait;
use shard_types::NotifyThreshold;
use sqlx::PgPool;

use crate::error::{DbError, DbResult};
use crate::models::SubscriberRow;
use crate::repo::{GrantRecord, SubscriberRepository};

const SUBSCRIBER_COLUMNS: &str = "user_id, subscribed, payment_date, expiry_date, config, \
     last_update, notified_expiring_2d, notified_3d, notified_1d, notified_expired";

/// PostgreSQL subscriber repository
#[derive(Clone)]
pub struct PgSubscriberRepository {
    pool: PgPool,
}

impl PgSubscriberRepository {
    /// Create a new subscriber repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberRepository for PgSubscriberRepository {
    async fn find(&self, user_id: i64) -> DbResult<Option<SubscriberRow>> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn commit_grant(&self, grant: GrantRecord) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (user_id, subscribed, payment_date, expiry_date, config,
                               last_update, notified_expiring_2d, notified_3d,
                               notified_1d, notified_expired)
            VALUES ($1, TRUE, $2, $3, $4, $2, FALSE, FALSE, FALSE, FALSE)
            ON CONFLICT (user_id) DO UPDATE SET
                subscribed = TRUE,
                payment_date = EXCLUDED.payment_date,
                expiry_date = EXCLUDED.expiry_date,
                config = EXCLUDED.config,
                last_update = EXCLUDED.last_update,
                notified_expiring_2d = FALSE,
                notified_3d = FALSE,
                notified_1d = FALSE,
                notified_expired = FALSE
            "#,
        )
        .bind(grant.user_id)
        .bind(&grant.payment_date)
        .bind(&grant.expiry_date)
        .bind(&grant.config)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from_sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO payments (user_id, amount, period, payment_date, payment_method, reference)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(grant.user_id)
        .bind(grant.amount)
        .bind(grant.period)
        .bind(&grant.payment_date)
        .bind(&grant.method)
        .bind(&grant.reference)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from_sqlx)?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_subscribed(&self, user_id: i64, subscribed: bool) -> DbResult<()> {
        sqlx::query("UPDATE users SET subscribed = $1 WHERE user_id = $2")
            .bind(subscribed)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn force_expiry(&self, user_id: i64, expiry: &str, subscribed: bool) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                subscribed = $1,
                expiry_date = $2,
                notified_expiring_2d = FALSE,
                notified_3d = FALSE,
                notified_1d = FALSE,
                notified_expired = FALSE
            WHERE user_id = $3
            "#,
        )
        .bind(subscribed)
        .bind(expiry)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_subscribed(&self) -> DbResult<Vec<SubscriberRow>> {
        let rows = sqlx::query_as::<_, SubscriberRow>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM users WHERE subscribed ORDER BY user_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn mark_notified(&self, user_id: i64, threshold: NotifyThreshold) -> DbResult<()> {
        let column = match threshold {
            NotifyThreshold::ThreeDays => "notified_3d",
            NotifyThreshold::OneDay => "notified_1d",
            NotifyThreshold::Expired => "notified_expired",
            NotifyThreshold::LegacyTwoDays => "notified_expiring_2d",
        };

        sqlx::query(&format!("UPDATE users SET {column} = TRUE WHERE user_id = $1"))
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, user_id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
