//! 站内通知：写入 notifications 表，由客户端拉取

use async_trait::async_trait;
use sqlx::PgPool;

use super::Notifier;
use super::types::Notification;
use crate::error::Result;

pub struct InAppNotifier {
    pool: PgPool,
}

impl InAppNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for InAppNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, title, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&notification.user_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
