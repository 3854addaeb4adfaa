//! PostgreSQL bot user repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::BotUserRow;
use crate::repo::{BotUserRepository, TouchBotUser};

const BOT_USER_COLUMNS: &str = "user_id, username, first_name, last_name, first_interaction, \
     last_interaction, referrer_id, trial_used, referral_balance, total_referrals";

/// PostgreSQL bot user repository
#[derive(Clone)]
pub struct PgBotUserRepository {
    pool: PgPool,
}

impl PgBotUserRepository {
    /// Create a new bot user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BotUserRepository for PgBotUserRepository {
    async fn find(&self, user_id: i64) -> DbResult<Option<BotUserRow>> {
        let row = sqlx::query_as::<_, BotUserRow>(&format!(
            "SELECT {BOT_USER_COLUMNS} FROM bot_users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn touch(&self, user: TouchBotUser) -> DbResult<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE bot_users
            SET last_interaction = $1, username = $2, first_name = $3, last_name = $4
            WHERE user_id = $5
            "#,
        )
        .bind(&user.now)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.user_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() > 0 {
            return Ok(false);
        }

        // First-ever contact; a concurrent insert loses the race harmlessly.
        let inserted = sqlx::query(
            r#"
            INSERT INTO bot_users (user_id, username, first_name, last_name,
                                   first_interaction, last_interaction)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.now)
        .execute(&self.pool)
        .await?;

        Ok(inserted.rows_affected() > 0)
    }

    async fn ensure_exists(&self, user_id: i64, now: &str) -> DbResult<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO bot_users (user_id, first_interaction, last_interaction)
            VALUES ($1, $2, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(inserted.rows_affected() > 0)
    }

    async fn set_trial_used(&self, user_id: i64) -> DbResult<()> {
        sqlx::query("UPDATE bot_users SET trial_used = TRUE WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn first_interactions(&self, user_ids: &[i64]) -> DbResult<Vec<(i64, Option<String>)>> {
        let rows = sqlx::query_as::<_, (i64, Option<String>)>(
            "SELECT user_id, first_interaction FROM bot_users WHERE user_id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn delete(&self, user_id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM bot_users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
