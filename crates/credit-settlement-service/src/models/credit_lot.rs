//! 积分批次
//!
//! 批次创建后只有 remaining 会变化；退款总是新建批次，不会复用已耗尽的批次。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::enums::LotSource;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CreditLot {
    pub id: i64,
    pub owner_id: String,
    pub source_kind: LotSource,
    /// 套餐引用或退款标记（如 `package:3`、`refund:reservation:42`）
    pub source_ref: String,
    pub total: i32,
    pub remaining: i32,
    pub issued_at: DateTime<Utc>,
    #[sqlx(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreditLot {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }

    /// 当前可用于扣减的数量
    pub fn available(&self, now: DateTime<Utc>) -> i32 {
        if self.is_expired(now) { 0 } else { self.remaining }
    }
}

/// 新批次参数
#[derive(Debug, Clone)]
pub struct NewCreditLot {
    pub owner_id: String,
    pub source_kind: LotSource,
    pub source_ref: String,
    pub amount: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewCreditLot {
    pub fn new(
        owner_id: impl Into<String>,
        source_kind: LotSource,
        source_ref: impl Into<String>,
        amount: i32,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            source_kind,
            source_ref: source_ref.into(),
            amount,
            expires_at: None,
        }
    }

    /// 从 `now` 起算的有效天数，None 表示永不过期
    pub fn expiring_in(mut self, now: DateTime<Utc>, duration_days: Option<i32>) -> Self {
        self.expires_at = duration_days.map(|d| now + Duration::days(i64::from(d)));
        self
    }
}

/// 批次引用格式
pub fn package_source_ref(package_id: i64) -> String {
    format!("package:{}", package_id)
}

pub fn refund_source_ref(reservation_id: i64) -> String {
    format!("refund:reservation:{}", reservation_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(remaining: i32, expires_at: Option<DateTime<Utc>>) -> CreditLot {
        CreditLot {
            id: 1,
            owner_id: "user-1".to_string(),
            source_kind: LotSource::Purchase,
            source_ref: package_source_ref(1),
            total: 10,
            remaining,
            issued_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn test_expired_lot_has_nothing_available() {
        let now = Utc::now();
        assert_eq!(lot(5, Some(now - Duration::seconds(1))).available(now), 0);
        assert_eq!(lot(5, Some(now + Duration::days(1))).available(now), 5);
        assert_eq!(lot(5, None).available(now), 5);
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = Utc::now();
        assert!(lot(1, Some(now)).is_expired(now));
    }

    #[test]
    fn test_expiring_in() {
        let now = Utc::now();
        let new_lot = NewCreditLot::new("u", LotSource::Refund, refund_source_ref(42), 2)
            .expiring_in(now, Some(30));
        assert_eq!(new_lot.expires_at, Some(now + Duration::days(30)));
        assert_eq!(new_lot.source_ref, "refund:reservation:42");

        let forever = NewCreditLot::new("u", LotSource::Purchase, "package:1", 5).expiring_in(now, None);
        assert!(forever.expires_at.is_none());
    }
}
