//! 支付订单与回调去重仓储

use sqlx::{PgConnection, PgPool};

use crate::error::Result;
use crate::models::{OrderMetadata, OrderTarget, PaymentOrder, PaymentOrderStatus, PurchaseLine};

const ORDER_COLUMNS: &str = "order_id, user_id, package_id, cart_id, amount_cents, currency, \
     status, checkout_url, created_at";

/// 待写入的支付订单
#[derive(Debug, Clone)]
pub struct NewPaymentOrder {
    pub order_id: String,
    pub user_id: String,
    pub package_id: Option<i64>,
    pub cart_id: Option<i64>,
    pub amount_cents: i64,
    pub currency: String,
    pub checkout_url: String,
    /// 结账时的购买内容快照
    pub lines: Vec<PurchaseLine>,
}

pub struct PaymentOrderRepository {
    pool: PgPool,
}

impl PaymentOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 订单与订单行在同一事务中写入
    pub async fn create(&self, order: &NewPaymentOrder) -> Result<PaymentOrder> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, PaymentOrder>(&format!(
            r#"
            INSERT INTO payment_orders
                (order_id, user_id, package_id, cart_id, amount_cents, currency, status, checkout_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(&order.order_id)
        .bind(&order.user_id)
        .bind(order.package_id)
        .bind(order.cart_id)
        .bind(order.amount_cents)
        .bind(&order.currency)
        .bind(PaymentOrderStatus::Pending)
        .bind(&order.checkout_url)
        .fetch_one(&mut *tx)
        .await?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO payment_order_lines
                    (order_id, package_id, credit_count, duration_days, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&order.order_id)
            .bind(line.package_id)
            .bind(line.credit_count)
            .bind(line.duration_days)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    pub async fn get(&self, order_id: &str) -> Result<Option<PaymentOrder>> {
        let order = sqlx::query_as::<_, PaymentOrder>(&format!(
            "SELECT {ORDER_COLUMNS} FROM payment_orders WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    pub async fn list_lines(&self, order_id: &str) -> Result<Vec<PurchaseLine>> {
        let lines = sqlx::query_as::<_, PurchaseLine>(
            r#"
            SELECT package_id, credit_count, duration_days, quantity
            FROM payment_order_lines
            WHERE order_id = $1
            ORDER BY package_id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    // ==================== 事务操作 ====================

    /// 在事务中占用回调事件 ID
    ///
    /// 返回 false 表示该事件已被处理（或正被另一事务处理并已提交）
    pub async fn claim_event_in_tx(
        tx: &mut PgConnection,
        event_id: &str,
        order_id: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_payment_events (event_id, order_id, credits_issued)
            VALUES ($1, $2, 0)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(order_id)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn record_event_credits_in_tx(
        tx: &mut PgConnection,
        event_id: &str,
        credits_issued: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE processed_payment_events SET credits_issued = $2 WHERE event_id = $1")
            .bind(event_id)
            .bind(credits_issued)
            .execute(tx)
            .await?;

        Ok(())
    }

    /// 在事务中将待支付订单置为完成
    ///
    /// 条件更新会锁住订单行；同一订单的并发回调排队，后到者看到 completed 后返回 false
    pub async fn complete_pending_in_tx(tx: &mut PgConnection, order_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payment_orders
            SET status = $2, updated_at = NOW()
            WHERE order_id = $1 AND status = $3
            "#,
        )
        .bind(order_id)
        .bind(PaymentOrderStatus::Completed)
        .bind(PaymentOrderStatus::Pending)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// 本地无记录的订单（仅存在于网关侧）按网关元数据补记为已完成
    ///
    /// 订单号冲突说明已经结算过，返回 false
    pub async fn record_gateway_order_in_tx(
        tx: &mut PgConnection,
        metadata: &OrderMetadata,
        currency: &str,
    ) -> Result<bool> {
        let (package_id, cart_id) = match metadata.target {
            OrderTarget::Package { package_id } => (Some(package_id), None),
            OrderTarget::Cart { cart_id } => (None, Some(cart_id)),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO payment_orders
                (order_id, user_id, package_id, cart_id, amount_cents, currency, status)
            VALUES ($1, $2, $3, $4, 0, $5, $6)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(&metadata.order_id)
        .bind(&metadata.user_id)
        .bind(package_id)
        .bind(cart_id)
        .bind(currency)
        .bind(PaymentOrderStatus::Completed)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
