//! 级联触发与结果

use serde::{Deserialize, Serialize};

use crate::models::{AchievementDefinition, StreakState};

/// 触发级联的事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerKind {
    WorkoutLogged,
    AttendanceMarked,
    BookingCreated,
    /// 一次支付发放的积分总数
    CreditsPurchased { credits: i64 },
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkoutLogged => "workout_logged",
            Self::AttendanceMarked => "attendance_marked",
            Self::BookingCreated => "booking_created",
            Self::CreditsPurchased { .. } => "credits_purchased",
        }
    }

    /// 只有训练和出勤算作当天活动，会推进连续打卡
    pub fn advances_streak(&self) -> bool {
        matches!(self, Self::WorkoutLogged | Self::AttendanceMarked)
    }

    pub fn purchased_credits(&self) -> Option<i64> {
        match self {
            Self::CreditsPurchased { credits } => Some(*credits),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeTrigger {
    pub user_id: String,
    pub kind: TriggerKind,
}

impl CascadeTrigger {
    pub fn new(user_id: impl Into<String>, kind: TriggerKind) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
        }
    }
}

/// 一次级联处理的结果
#[derive(Debug, Clone, Default)]
pub struct CascadeOutcome {
    pub streak: StreakState,
    /// 本次新插入的成就（已存在的不计入）
    pub newly_awarded: Vec<AchievementDefinition>,
}
