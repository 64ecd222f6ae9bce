//! 活动统计仓储
//!
//! 每次从持久化数据重新聚合，不做缓存

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::ActivityStatsRepositoryTrait;
use crate::error::Result;
use crate::models::ActivityStats;

pub struct ActivityStatsRepository {
    pool: PgPool,
}

impl ActivityStatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn load_stats(&self, user_id: &str) -> Result<ActivityStats> {
        let stats = sqlx::query_as::<_, ActivityStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM workout_logs
                  WHERE user_id = $1 AND completed_at IS NOT NULL) AS total_workouts,
                (SELECT COUNT(*) FROM reservations
                  WHERE owner_id = $1 AND status = 'attended') AS total_attendance,
                (SELECT COALESCE(MAX(s.weight), 0)::DOUBLE PRECISION
                   FROM exercise_sets s JOIN workout_logs w ON w.id = s.workout_log_id
                  WHERE w.user_id = $1) AS max_weight,
                (SELECT COALESCE(MAX(s.weight * s.reps), 0)::DOUBLE PRECISION
                   FROM exercise_sets s JOIN workout_logs w ON w.id = s.workout_log_id
                  WHERE w.user_id = $1) AS max_volume,
                (SELECT COALESCE(SUM(total), 0)::BIGINT FROM credit_lots
                  WHERE owner_id = $1 AND source_kind = 'purchase') AS purchased_credits,
                (SELECT COUNT(*) FROM reservations
                  WHERE owner_id = $1 AND status <> 'cancelled') AS bookings_count
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

#[async_trait]
impl ActivityStatsRepositoryTrait for ActivityStatsRepository {
    async fn load_stats(&self, user_id: &str) -> Result<ActivityStats> {
        self.load_stats(user_id).await
    }
}
