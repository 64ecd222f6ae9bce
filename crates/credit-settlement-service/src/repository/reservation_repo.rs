//! 预约仓储
//!
//! 状态迁移统一走带 `WHERE status = 'confirmed'` 的条件更新

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

use crate::error::{Result, SettlementError};
use crate::models::{NewReservation, Reservation, ReservationStatus};

const RESERVATION_COLUMNS: &str = "id, class_id, owner_id, target_date, credits_used, \
     attendee_count, status, created_at, updated_at";

/// 有效预约唯一索引名
const CONFIRMED_SLOT_INDEX: &str = "uq_reservations_confirmed_slot";

pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    pub async fn get(&self, id: i64) -> Result<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reservation)
    }

    // ==================== 事务操作 ====================

    /// 在事务中查找同一时段的有效预约
    pub async fn find_confirmed_slot_in_tx(
        tx: &mut PgConnection,
        class_id: i64,
        owner_id: &str,
        target_date: NaiveDate,
    ) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM reservations
            WHERE class_id = $1 AND owner_id = $2 AND target_date = $3 AND status = 'confirmed'
            "#,
        )
        .bind(class_id)
        .bind(owner_id)
        .bind(target_date)
        .fetch_optional(tx)
        .await?;

        Ok(id)
    }

    /// 在事务中创建预约
    ///
    /// 并发插入同一时段时由唯一索引拦截，转换为 DuplicateBooking
    pub async fn insert_in_tx(
        tx: &mut PgConnection,
        reservation: &NewReservation,
    ) -> Result<Reservation> {
        let created = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            INSERT INTO reservations (class_id, owner_id, target_date, credits_used, attendee_count, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(reservation.class_id)
        .bind(&reservation.owner_id)
        .bind(reservation.target_date)
        .bind(reservation.credits_used)
        .bind(reservation.attendee_count)
        .bind(ReservationStatus::Confirmed)
        .fetch_one(tx)
        .await
        .map_err(|e| {
            let slot_taken = matches!(
                &e,
                sqlx::Error::Database(db) if db.constraint() == Some(CONFIRMED_SLOT_INDEX)
            );
            if slot_taken {
                SettlementError::DuplicateBooking {
                    class_id: reservation.class_id,
                    target_date: reservation.target_date,
                }
            } else {
                SettlementError::from(e)
            }
        })?;

        Ok(created)
    }

    /// 在事务中执行 confirmed -> `next` 的条件迁移
    ///
    /// 返回 None 表示预约不存在或已不是 confirmed
    pub async fn transition_from_confirmed_in_tx(
        tx: &mut PgConnection,
        id: i64,
        next: ReservationStatus,
    ) -> Result<Option<Reservation>> {
        let updated = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            UPDATE reservations
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'confirmed'
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(next)
        .fetch_optional(tx)
        .await?;

        Ok(updated)
    }

    /// 在事务中读取当前状态（迁移失败后用于区分错误类型）
    pub async fn get_status_in_tx(
        tx: &mut PgConnection,
        id: i64,
    ) -> Result<Option<ReservationStatus>> {
        let status = sqlx::query_scalar::<_, ReservationStatus>(
            "SELECT status FROM reservations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(status)
    }
}
