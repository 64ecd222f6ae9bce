//! 积分套餐、购物车与支付订单

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::PaymentOrderStatus;

/// 积分套餐
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CreditPackage {
    pub id: i64,
    pub name: String,
    pub credit_count: i32,
    /// 批次有效天数，None 表示永久
    #[sqlx(default)]
    pub duration_days: Option<i32>,
    pub price_cents: i64,
}

/// 购物车条目（已关联套餐信息）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub package_id: i64,
    pub package_name: String,
    pub credit_count: i32,
    #[sqlx(default)]
    pub duration_days: Option<i32>,
    pub price_cents: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub order_id: String,
    pub user_id: String,
    #[sqlx(default)]
    pub package_id: Option<i64>,
    #[sqlx(default)]
    pub cart_id: Option<i64>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentOrderStatus,
    #[sqlx(default)]
    pub checkout_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 支付订单指向的购买内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTarget {
    /// 单个套餐
    Package { package_id: i64 },
    /// 购物车内全部条目
    Cart { cart_id: i64 },
}

/// 回调解析出的订单元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMetadata {
    pub order_id: String,
    pub user_id: String,
    pub target: OrderTarget,
}

impl PaymentOrder {
    pub fn metadata(&self) -> Option<OrderMetadata> {
        let target = match (self.package_id, self.cart_id) {
            (Some(package_id), _) => OrderTarget::Package { package_id },
            (None, Some(cart_id)) => OrderTarget::Cart { cart_id },
            (None, None) => return None,
        };
        Some(OrderMetadata {
            order_id: self.order_id.clone(),
            user_id: self.user_id.clone(),
            target,
        })
    }
}

/// 一次购买中需要发放的一行：某个套餐乘以数量
///
/// 结账时写入 payment_order_lines，回调按快照发放
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PurchaseLine {
    pub package_id: i64,
    pub credit_count: i32,
    #[sqlx(default)]
    pub duration_days: Option<i32>,
    pub quantity: i32,
}

impl PurchaseLine {
    pub fn credits(&self) -> i32 {
        self.credit_count.saturating_mul(self.quantity)
    }
}

impl From<&CreditPackage> for PurchaseLine {
    fn from(package: &CreditPackage) -> Self {
        Self {
            package_id: package.id,
            credit_count: package.credit_count,
            duration_days: package.duration_days,
            quantity: 1,
        }
    }
}

impl From<&CartLine> for PurchaseLine {
    fn from(line: &CartLine) -> Self {
        Self {
            package_id: line.package_id,
            credit_count: line.credit_count,
            duration_days: line.duration_days,
            quantity: line.quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(package_id: Option<i64>, cart_id: Option<i64>) -> PaymentOrder {
        PaymentOrder {
            order_id: "ord-1".to_string(),
            user_id: "user-1".to_string(),
            package_id,
            cart_id,
            amount_cents: 1000,
            currency: "USD".to_string(),
            status: PaymentOrderStatus::Pending,
            checkout_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_metadata_target() {
        assert_eq!(
            order(Some(3), None).metadata().unwrap().target,
            OrderTarget::Package { package_id: 3 }
        );
        assert_eq!(
            order(None, Some(8)).metadata().unwrap().target,
            OrderTarget::Cart { cart_id: 8 }
        );
        assert!(order(None, None).metadata().is_none());
    }

    #[test]
    fn test_cart_line_totals() {
        let line = CartLine {
            package_id: 1,
            package_name: "10 节课".to_string(),
            credit_count: 10,
            duration_days: Some(90),
            price_cents: 12_000,
            quantity: 3,
        };
        assert_eq!(PurchaseLine::from(&line).credits(), 30);
    }
}
