//! 预约结算服务
//!
//! 预约的创建、取消和出勤标记。每个操作都是一个独立事务：
//!
//! ## 创建流程
//!
//! 1. 参数校验 -> 2. 课程可预约 -> 3. 重复预约检查
//!    -> 4. 扣减积分 -> 5. 写入预约 -> 6. 提交
//!    -> 7. 级联触发（入队，失败不影响预约）
//!
//! ## 取消流程
//!
//! 1. 加载预约并鉴权 -> 2. confirmed -> cancelled 条件更新
//!    -> 3. 退款新批次 -> 4. 提交
//!
//! 并发重复取消时只有一个条件更新命中，另一个返回 `AlreadyCancelled`，不会重复退款。

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use validator::Validate;

use studio_shared::config::SettlementConfig;
use studio_shared::observability::metrics;

use crate::cascade::{CascadeQueue, CascadeTrigger, TriggerKind};
use crate::dto::{CancellationOutcome, CreateBookingRequest};
use crate::error::{Result, SettlementError};
use crate::ledger::CreditLedger;
use crate::models::{Actor, NewReservation, Reservation, ReservationStatus, refund_source_ref};
use crate::repository::{ClassDirectory, ReservationRepository};

pub struct BookingSettlement {
    pool: PgPool,
    reservation_repo: ReservationRepository,
    classes: Arc<dyn ClassDirectory>,
    cascade: CascadeQueue,
    settings: SettlementConfig,
}

impl BookingSettlement {
    pub fn new(
        pool: PgPool,
        classes: Arc<dyn ClassDirectory>,
        cascade: CascadeQueue,
        settings: SettlementConfig,
    ) -> Self {
        Self {
            reservation_repo: ReservationRepository::new(pool.clone()),
            pool,
            classes,
            cascade,
            settings,
        }
    }

    /// 创建预约：扣减与写入在同一事务中，任何一步失败都不会留下预约
    #[instrument(skip(self, request), fields(class_id = request.class_id, target_date = %request.target_date))]
    pub async fn create_booking(
        &self,
        owner_id: &str,
        request: &CreateBookingRequest,
    ) -> Result<Reservation> {
        let start = Instant::now();

        let result = self.create_booking_inner(owner_id, request).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(SettlementError::InsufficientCredit { .. }) => "insufficient_credit",
            Err(SettlementError::DuplicateBooking { .. }) => "duplicate",
            Err(e) if e.is_business_error() => "rejected",
            Err(_) => "error",
        };
        metrics::record_booking(outcome, start.elapsed().as_secs_f64());

        let reservation = result?;

        // 7. 提交后触发级联
        self.cascade
            .enqueue(CascadeTrigger::new(owner_id, TriggerKind::BookingCreated));

        Ok(reservation)
    }

    async fn create_booking_inner(
        &self,
        owner_id: &str,
        request: &CreateBookingRequest,
    ) -> Result<Reservation> {
        // 1. 参数校验
        request.validate()?;

        // 2. 课程可预约
        if !self.classes.is_bookable(request.class_id).await? {
            return Err(SettlementError::ClassNotFound(request.class_id));
        }

        let mut tx = self.pool.begin().await?;

        // 3. 重复预约检查（唯一部分索引兜底）
        if let Some(existing_id) = ReservationRepository::find_confirmed_slot_in_tx(
            &mut tx,
            request.class_id,
            owner_id,
            request.target_date,
        )
        .await?
        {
            warn!(
                owner_id = %owner_id,
                existing_reservation_id = existing_id,
                "同一课程同一天已有有效预约"
            );
            return Err(SettlementError::DuplicateBooking {
                class_id: request.class_id,
                target_date: request.target_date,
            });
        }

        // 4. 扣减积分，每位参与者一个积分
        let receipt =
            CreditLedger::deduct_in_tx(&mut tx, owner_id, request.attendee_count, Utc::now())
                .await?;

        // 5. 写入预约
        let reservation = ReservationRepository::insert_in_tx(
            &mut tx,
            &NewReservation {
                class_id: request.class_id,
                owner_id: owner_id.to_string(),
                target_date: request.target_date,
                credits_used: receipt.amount,
                attendee_count: request.attendee_count,
            },
        )
        .await?;

        // 6. 提交
        tx.commit().await?;

        info!(
            owner_id = %owner_id,
            reservation_id = reservation.id,
            credits_used = reservation.credits_used,
            "预约创建成功"
        );

        Ok(reservation)
    }

    /// 取消预约并退回积分
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn cancel_booking(
        &self,
        reservation_id: i64,
        actor: &Actor,
    ) -> Result<CancellationOutcome> {
        let result = self.cancel_booking_inner(reservation_id, actor).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(SettlementError::AlreadyCancelled(_)) => "already_cancelled",
            Err(e) if e.is_business_error() => "rejected",
            Err(_) => "error",
        };
        metrics::record_booking_cancellation(outcome);

        result
    }

    async fn cancel_booking_inner(
        &self,
        reservation_id: i64,
        actor: &Actor,
    ) -> Result<CancellationOutcome> {
        // 1. 加载并鉴权
        let reservation = self
            .reservation_repo
            .get(reservation_id)
            .await?
            .ok_or(SettlementError::ReservationNotFound(reservation_id))?;
        self.authorize(&reservation, actor)?;

        let mut tx = self.pool.begin().await?;

        // 2. 条件更新，只有 confirmed 能被取消
        let cancelled = match ReservationRepository::transition_from_confirmed_in_tx(
            &mut tx,
            reservation_id,
            ReservationStatus::Cancelled,
        )
        .await?
        {
            Some(updated) => updated,
            None => {
                return Err(Self::rejected_transition(&mut tx, reservation_id).await);
            }
        };

        // 3. 退款为新批次
        CreditLedger::refund_in_tx(
            &mut tx,
            &cancelled.owner_id,
            cancelled.credits_used,
            self.settings.refund_grace_days,
            &refund_source_ref(reservation_id),
            Utc::now(),
        )
        .await?;

        // 4. 提交
        tx.commit().await?;

        info!(
            reservation_id,
            owner_id = %cancelled.owner_id,
            credits_refunded = cancelled.credits_used,
            "预约已取消"
        );

        Ok(CancellationOutcome {
            reservation_id,
            credits_refunded: cancelled.credits_used,
        })
    }

    /// 标记出勤：confirmed -> attended | no_show，仅限特权角色
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn mark_attendance(
        &self,
        reservation_id: i64,
        actor: &Actor,
        attended: bool,
    ) -> Result<Reservation> {
        if !self.settings.is_privileged(actor.role()) {
            return Err(SettlementError::Forbidden(
                "只有教练或管理员可以标记出勤".to_string(),
            ));
        }

        let next = if attended {
            ReservationStatus::Attended
        } else {
            ReservationStatus::NoShow
        };

        let mut tx = self.pool.begin().await?;

        let updated = match ReservationRepository::transition_from_confirmed_in_tx(
            &mut tx,
            reservation_id,
            next,
        )
        .await?
        {
            Some(updated) => updated,
            None => {
                return Err(Self::rejected_transition(&mut tx, reservation_id).await);
            }
        };

        tx.commit().await?;

        info!(
            reservation_id,
            owner_id = %updated.owner_id,
            status = %updated.status,
            "出勤已标记"
        );

        if attended {
            self.cascade.enqueue(CascadeTrigger::new(
                updated.owner_id.clone(),
                TriggerKind::AttendanceMarked,
            ));
        }

        Ok(updated)
    }

    // ==================== 私有方法 ====================

    /// 预约本人或特权角色可以取消
    fn authorize(&self, reservation: &Reservation, actor: &Actor) -> Result<()> {
        if reservation.is_owned_by(&actor.user_id) || self.settings.is_privileged(actor.role()) {
            Ok(())
        } else {
            Err(SettlementError::Forbidden(format!(
                "无权操作预约 {}",
                reservation.id
            )))
        }
    }

    /// 条件更新未命中时，按当前状态给出具体错误
    async fn rejected_transition(
        tx: &mut sqlx::PgConnection,
        reservation_id: i64,
    ) -> SettlementError {
        match ReservationRepository::get_status_in_tx(tx, reservation_id).await {
            Ok(Some(ReservationStatus::Cancelled)) => {
                SettlementError::AlreadyCancelled(reservation_id)
            }
            Ok(Some(current)) => SettlementError::InvalidReservationStatus {
                reservation_id,
                current: current.to_string(),
            },
            Ok(None) => SettlementError::ReservationNotFound(reservation_id),
            Err(e) => e,
        }
    }
}
