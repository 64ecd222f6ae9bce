//! 通知模块
//!
//! - `Notifier` - 通知投递接口
//! - `InAppNotifier` - 站内信实现
//! - `NotificationSender` - 异步发送封装，失败不影响调用方

mod in_app;
mod sender;
mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use in_app::InAppNotifier;
pub use sender::NotificationSender;
pub use types::{Notification, NotificationKind};

/// 通知投递接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}
