//! 课程目录的 Postgres 实现
//!
//! 只校验课程存在且处于上架状态，不做容量检查

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::ClassDirectory;
use crate::error::Result;

pub struct PgClassDirectory {
    pool: PgPool,
}

impl PgClassDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClassDirectory for PgClassDirectory {
    async fn is_bookable(&self, class_id: i64) -> Result<bool> {
        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM classes WHERE id = $1 AND is_active = TRUE)",
        )
        .bind(class_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(active)
    }
}
