//! 课程预约

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::ReservationStatus;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: i64,
    pub class_id: i64,
    pub owner_id: String,
    pub target_date: NaiveDate,
    /// 扣减的积分数，与人数一致
    pub credits_used: i32,
    pub attendee_count: i32,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

/// 新预约参数
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub class_id: i64,
    pub owner_id: String,
    pub target_date: NaiveDate,
    pub credits_used: i32,
    pub attendee_count: i32,
}
