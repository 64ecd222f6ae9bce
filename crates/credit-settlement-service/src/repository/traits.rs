//! 仓储 Trait 定义
//!
//! 级联评估和课程校验只依赖这些抽象，单元测试用 mockall 替换

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AchievementDefinition, ActivityStats, StreakState};

/// 成就仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AchievementRepositoryTrait: Send + Sync {
    async fn list_active_definitions(&self) -> Result<Vec<AchievementDefinition>>;
    async fn list_awarded_ids(&self, user_id: &str) -> Result<Vec<i64>>;
    /// 插入获奖记录；已存在时返回 false
    async fn insert_award(&self, user_id: &str, achievement_id: i64) -> Result<bool>;
}

/// 活动统计接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityStatsRepositoryTrait: Send + Sync {
    async fn load_stats(&self, user_id: &str) -> Result<ActivityStats>;
}

/// 连续打卡仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreakRepositoryTrait: Send + Sync {
    async fn get_streak(&self, user_id: &str) -> Result<Option<StreakState>>;
    async fn save_streak(&self, state: &StreakState) -> Result<()>;
}

/// 课程目录（外部协作方）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassDirectory: Send + Sync {
    /// 课程存在且可预约
    async fn is_bookable(&self, class_id: i64) -> Result<bool>;
}
