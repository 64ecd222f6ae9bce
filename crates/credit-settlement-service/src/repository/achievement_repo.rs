//! 成就仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::AchievementRepositoryTrait;
use crate::error::Result;
use crate::models::AchievementDefinition;

pub struct AchievementRepository {
    pool: PgPool,
}

impl AchievementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_active_definitions(&self) -> Result<Vec<AchievementDefinition>> {
        let definitions = sqlx::query_as::<_, AchievementDefinition>(
            r#"
            SELECT id, code, name, description, criteria_type, threshold
            FROM achievement_definitions
            WHERE is_active = TRUE
            ORDER BY criteria_type, threshold, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(definitions)
    }

    pub async fn list_awarded_ids(&self, user_id: &str) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT achievement_id FROM user_achievement_awards WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// 幂等插入：唯一键冲突时不返回行
    pub async fn insert_award(&self, user_id: &str, achievement_id: i64) -> Result<bool> {
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO user_achievement_awards (user_id, achievement_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, achievement_id) DO NOTHING
            RETURNING achievement_id
            "#,
        )
        .bind(user_id)
        .bind(achievement_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.is_some())
    }
}

#[async_trait]
impl AchievementRepositoryTrait for AchievementRepository {
    async fn list_active_definitions(&self) -> Result<Vec<AchievementDefinition>> {
        self.list_active_definitions().await
    }

    async fn list_awarded_ids(&self, user_id: &str) -> Result<Vec<i64>> {
        self.list_awarded_ids(user_id).await
    }

    async fn insert_award(&self, user_id: &str, achievement_id: i64) -> Result<bool> {
        self.insert_award(user_id, achievement_id).await
    }
}
