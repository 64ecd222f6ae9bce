//! 枚举类型定义
//!
//! 所有枚举同时支持 sqlx（varchar 存储）和 serde 序列化

use std::fmt;

use serde::{Deserialize, Serialize};

/// 积分批次来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum LotSource {
    /// 购买套餐
    Purchase,
    /// 取消预约退回
    Refund,
    /// 运营手动发放
    Grant,
}

impl LotSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Refund => "refund",
            Self::Grant => "grant",
        }
    }
}

/// 预约状态
///
/// 只有 confirmed 可以迁移，其余三个状态都是终态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum ReservationStatus {
    #[default]
    Confirmed,
    Cancelled,
    Attended,
    NoShow,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Attended => "attended",
            Self::NoShow => "no_show",
        }
    }

    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        matches!(
            (self, next),
            (
                Self::Confirmed,
                Self::Cancelled | Self::Attended | Self::NoShow
            )
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Confirmed)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 成就达成条件类型
///
/// 封闭枚举，数据库中未知的取值在解码时直接报错
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum CriteriaType {
    TotalWorkouts,
    TotalAttendance,
    MaxWeight,
    MaxVolume,
    DailyStreak,
    LongestStreak,
    PurchasedCredits,
    BookingsCount,
}

impl CriteriaType {
    pub const ALL: [CriteriaType; 8] = [
        Self::TotalWorkouts,
        Self::TotalAttendance,
        Self::MaxWeight,
        Self::MaxVolume,
        Self::DailyStreak,
        Self::LongestStreak,
        Self::PurchasedCredits,
        Self::BookingsCount,
    ];
}

/// 支付订单状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum PaymentOrderStatus {
    #[default]
    Pending,
    Completed,
}
