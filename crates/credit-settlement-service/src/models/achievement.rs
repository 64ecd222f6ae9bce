//! 成就、连续打卡与活动统计

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::CriteriaType;

/// 成就定义
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDefinition {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub criteria_type: CriteriaType,
    pub threshold: i64,
}

/// 用户获得的成就，(user_id, achievement_id) 唯一
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievementAward {
    pub user_id: String,
    pub achievement_id: i64,
    pub earned_at: DateTime<Utc>,
}

/// 连续打卡状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    pub user_id: String,
    pub current_streak: i32,
    pub longest_streak: i32,
    #[sqlx(default)]
    pub last_activity_date: Option<NaiveDate>,
}

impl StreakState {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}

/// 从持久化数据聚合出的活动指标
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub total_workouts: i64,
    pub total_attendance: i64,
    pub max_weight: f64,
    /// 单组最大容量（重量 × 次数）
    pub max_volume: f64,
    /// 购买批次的累计积分
    pub purchased_credits: i64,
    /// 未取消的预约数
    pub bookings_count: i64,
}

/// 成就评估的输入快照：活动统计加上打卡状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivitySnapshot {
    pub stats: ActivityStats,
    pub current_streak: i32,
    pub longest_streak: i32,
}
