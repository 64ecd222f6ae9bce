//! 套餐与购物车仓储

use sqlx::{PgConnection, PgPool};

use crate::error::Result;
use crate::models::{CartLine, CreditPackage};

const PACKAGE_COLUMNS: &str = "id, name, credit_count, duration_days, price_cents";

const CART_LINES_SQL: &str = r#"
    SELECT ci.package_id, p.name AS package_name, p.credit_count, p.duration_days,
           p.price_cents, ci.quantity
    FROM cart_items ci
    JOIN credit_packages p ON p.id = ci.package_id
    WHERE ci.cart_id = $1
    ORDER BY ci.package_id
"#;

pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    /// 获取上架中的套餐
    pub async fn get_active_package(&self, id: i64) -> Result<Option<CreditPackage>> {
        let package = sqlx::query_as::<_, CreditPackage>(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM credit_packages WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(package)
    }

    pub async fn find_cart_id(&self, user_id: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }

    pub async fn list_cart_lines(&self, cart_id: i64) -> Result<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(CART_LINES_SQL)
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }

    // ==================== 事务操作 ====================

    /// 在事务中读取套餐（已支付的订单不再校验上下架状态）
    pub async fn get_package_in_tx(
        tx: &mut PgConnection,
        id: i64,
    ) -> Result<Option<CreditPackage>> {
        let package = sqlx::query_as::<_, CreditPackage>(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM credit_packages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(package)
    }

    /// 在事务中读取购物车条目并锁定购物车行
    pub async fn lock_cart_lines_in_tx(
        tx: &mut PgConnection,
        cart_id: i64,
    ) -> Result<Vec<CartLine>> {
        sqlx::query("SELECT id FROM carts WHERE id = $1 FOR UPDATE")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        let lines = sqlx::query_as::<_, CartLine>(CART_LINES_SQL)
            .bind(cart_id)
            .fetch_all(&mut *tx)
            .await?;

        Ok(lines)
    }

    /// 在事务中清空购物车，返回删除的条目数
    pub async fn clear_cart_in_tx(tx: &mut PgConnection, cart_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(tx)
            .await?;

        Ok(result.rows_affected())
    }
}
