//! 通知发送器
//!
//! 业务侧只调用 `send_*`，发送在独立任务中执行，失败只记日志。

use std::sync::Arc;

use tracing::{error, info};

use super::Notifier;
use super::types::Notification;
use crate::models::AchievementDefinition;

#[derive(Clone)]
pub struct NotificationSender {
    notifier: Arc<dyn Notifier>,
}

impl NotificationSender {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// 成就获得通知
    pub fn send_achievement_earned(&self, user_id: &str, achievement: &AchievementDefinition) {
        self.send_async(Notification::achievement_earned(user_id, achievement));
    }

    fn send_async(&self, notification: Notification) {
        let notifier = self.notifier.clone();

        tokio::spawn(async move {
            match notifier.notify(&notification).await {
                Ok(()) => info!(
                    user_id = %notification.user_id,
                    kind = ?notification.kind,
                    "通知发送成功"
                ),
                Err(e) => error!(
                    user_id = %notification.user_id,
                    kind = ?notification.kind,
                    error = %e,
                    "通知发送失败"
                ),
            }
        });
    }
}
