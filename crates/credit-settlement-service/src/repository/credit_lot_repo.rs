//! 积分批次仓储
//!
//! 扣减相关的读写都在调用方传入的事务连接上执行

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::error::Result;
use crate::models::{CreditLot, NewCreditLot};

const LOT_COLUMNS: &str =
    "id, owner_id, source_kind, source_ref, total, remaining, issued_at, expires_at";

pub struct CreditLotRepository {
    pool: PgPool,
}

impl CreditLotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    /// 未过期批次的剩余积分之和
    pub async fn sum_available(&self, owner_id: &str, now: DateTime<Utc>) -> Result<i64> {
        let balance: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(remaining), 0)::BIGINT
            FROM credit_lots
            WHERE owner_id = $1
              AND (expires_at IS NULL OR expires_at > $2)
            "#,
        )
        .bind(owner_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(balance)
    }

    /// 用户全部批次，最新的在前
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<CreditLot>> {
        let lots = sqlx::query_as::<_, CreditLot>(&format!(
            "SELECT {LOT_COLUMNS} FROM credit_lots WHERE owner_id = $1 ORDER BY issued_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lots)
    }

    // ==================== 事务操作 ====================

    /// 在事务中插入新批次
    pub async fn insert_in_tx(tx: &mut PgConnection, lot: &NewCreditLot) -> Result<CreditLot> {
        let created = sqlx::query_as::<_, CreditLot>(&format!(
            r#"
            INSERT INTO credit_lots (owner_id, source_kind, source_ref, total, remaining, expires_at)
            VALUES ($1, $2, $3, $4, $4, $5)
            RETURNING {LOT_COLUMNS}
            "#
        ))
        .bind(&lot.owner_id)
        .bind(lot.source_kind)
        .bind(&lot.source_ref)
        .bind(lot.amount)
        .bind(lot.expires_at)
        .fetch_one(tx)
        .await?;

        Ok(created)
    }

    /// 在事务中锁定用户可扣减的批次（带行级锁）
    ///
    /// 固定按 expires_at 升序（NULL 在后）、id 升序加锁，
    /// 并发的多批次扣减以相同顺序获取锁，不会互相死锁。
    pub async fn lock_available_in_tx(
        tx: &mut PgConnection,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<CreditLot>> {
        let lots = sqlx::query_as::<_, CreditLot>(&format!(
            r#"
            SELECT {LOT_COLUMNS}
            FROM credit_lots
            WHERE owner_id = $1
              AND remaining > 0
              AND (expires_at IS NULL OR expires_at > $2)
            ORDER BY expires_at ASC NULLS LAST, id ASC
            FOR UPDATE
            "#
        ))
        .bind(owner_id)
        .bind(now)
        .fetch_all(tx)
        .await?;

        Ok(lots)
    }

    /// 在事务中从单个批次扣减
    ///
    /// 条件 `remaining >= amount` 兜底，返回受影响行数
    pub async fn consume_in_tx(tx: &mut PgConnection, lot_id: i64, amount: i32) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE credit_lots
            SET remaining = remaining - $2
            WHERE id = $1 AND remaining >= $2
            "#,
        )
        .bind(lot_id)
        .bind(amount)
        .execute(tx)
        .await?;

        Ok(result.rows_affected())
    }
}
