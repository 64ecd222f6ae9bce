//! 连续打卡仓储
//!
//! 并发级联下按最后写入为准

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::StreakRepositoryTrait;
use crate::error::Result;
use crate::models::StreakState;

pub struct StreakRepository {
    pool: PgPool,
}

impl StreakRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_streak(&self, user_id: &str) -> Result<Option<StreakState>> {
        let state = sqlx::query_as::<_, StreakState>(
            r#"
            SELECT user_id, current_streak, longest_streak, last_activity_date
            FROM streak_state
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }

    pub async fn save_streak(&self, state: &StreakState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO streak_state (user_id, current_streak, longest_streak, last_activity_date, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                current_streak = EXCLUDED.current_streak,
                longest_streak = EXCLUDED.longest_streak,
                last_activity_date = EXCLUDED.last_activity_date,
                updated_at = NOW()
            "#,
        )
        .bind(&state.user_id)
        .bind(state.current_streak)
        .bind(state.longest_streak)
        .bind(state.last_activity_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl StreakRepositoryTrait for StreakRepository {
    async fn get_streak(&self, user_id: &str) -> Result<Option<StreakState>> {
        self.get_streak(user_id).await
    }

    async fn save_streak(&self, state: &StreakState) -> Result<()> {
        self.save_streak(state).await
    }
}
