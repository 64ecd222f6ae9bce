//! 积分账本
//!
//! 发放、余额、扣减、退款四个操作。涉及多行写入的操作都提供 `*_in_tx` 版本，
//! 由预约结算和支付对账在自己的事务里组合调用。
//!
//! ## 扣减流程
//!
//! 1. 按固定顺序锁定可用批次（FOR UPDATE）
//! 2. 规划每个批次的扣减量，不足则整体放弃
//! 3. 逐批次条件更新 remaining
//!
//! 余额不做缓存，每次读取都查询批次表。

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, instrument, warn};

use studio_shared::observability::metrics;

use super::allocation::{DeductionPlan, plan_deduction};
use crate::error::{Result, SettlementError};
use crate::models::{CreditLot, LotSource, NewCreditLot};
use crate::repository::CreditLotRepository;

/// 一次成功扣减的明细
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeductionReceipt {
    pub owner_id: String,
    pub amount: i32,
    pub plan: DeductionPlan,
}

pub struct CreditLedger {
    pool: PgPool,
    lot_repo: CreditLotRepository,
}

impl CreditLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            lot_repo: CreditLotRepository::new(pool.clone()),
            pool,
        }
    }

    /// 发放新批次，`duration_days` 为 None 时永不过期
    #[instrument(skip(self))]
    pub async fn issue(
        &self,
        owner_id: &str,
        source_kind: LotSource,
        source_ref: &str,
        amount: i32,
        duration_days: Option<i32>,
    ) -> Result<CreditLot> {
        let mut conn = self.pool.acquire().await?;
        Self::issue_in_tx(
            &mut conn,
            owner_id,
            source_kind,
            source_ref,
            amount,
            duration_days,
            Utc::now(),
        )
        .await
    }

    /// 当前可用余额：未过期批次的 remaining 之和
    pub async fn balance(&self, owner_id: &str) -> Result<i64> {
        self.lot_repo.sum_available(owner_id, Utc::now()).await
    }

    /// 用户的批次流水（最新在前）
    pub async fn list_lots(&self, owner_id: &str) -> Result<Vec<CreditLot>> {
        self.lot_repo.list_by_owner(owner_id).await
    }

    /// 独立事务中的扣减
    #[instrument(skip(self))]
    pub async fn deduct(&self, owner_id: &str, amount: i32) -> Result<DeductionReceipt> {
        let mut tx = self.pool.begin().await?;
        let receipt = Self::deduct_in_tx(&mut tx, owner_id, amount, Utc::now()).await?;
        tx.commit().await?;
        Ok(receipt)
    }

    /// 独立事务中的退款
    #[instrument(skip(self))]
    pub async fn refund(
        &self,
        owner_id: &str,
        amount: i32,
        grace_days: i64,
        source_ref: &str,
    ) -> Result<CreditLot> {
        let mut conn = self.pool.acquire().await?;
        Self::refund_in_tx(&mut conn, owner_id, amount, grace_days, source_ref, Utc::now()).await
    }

    // ==================== 事务操作 ====================

    /// 在事务中发放批次
    pub async fn issue_in_tx(
        tx: &mut PgConnection,
        owner_id: &str,
        source_kind: LotSource,
        source_ref: &str,
        amount: i32,
        duration_days: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<CreditLot> {
        if amount <= 0 {
            return Err(SettlementError::Validation(format!(
                "发放数量必须为正数: {}",
                amount
            )));
        }
        if duration_days.is_some_and(|d| d <= 0) {
            return Err(SettlementError::Validation(format!(
                "有效天数必须为正数: {:?}",
                duration_days
            )));
        }

        let new_lot = NewCreditLot::new(owner_id, source_kind, source_ref, amount)
            .expiring_in(now, duration_days);
        let lot = CreditLotRepository::insert_in_tx(tx, &new_lot).await?;

        metrics::record_credit_issuance(source_kind.as_str(), amount);
        info!(
            owner_id = %owner_id,
            lot_id = lot.id,
            amount,
            source = source_kind.as_str(),
            expires_at = ?lot.expires_at,
            "积分批次已发放"
        );

        Ok(lot)
    }

    /// 在事务中扣减
    ///
    /// 失败时不做任何写入；调用方回滚事务即可。
    /// 锁在事务提交或回滚时释放。
    pub async fn deduct_in_tx(
        tx: &mut PgConnection,
        owner_id: &str,
        amount: i32,
        now: DateTime<Utc>,
    ) -> Result<DeductionReceipt> {
        let start = Instant::now();

        // 1. 锁定可用批次
        let lots = CreditLotRepository::lock_available_in_tx(tx, owner_id, now).await?;

        // 2. 规划扣减
        let plan = match plan_deduction(&lots, amount, now) {
            Ok(plan) => plan,
            Err(e) => {
                let outcome = if matches!(e, SettlementError::InsufficientCredit { .. }) {
                    "insufficient"
                } else {
                    "invalid"
                };
                metrics::record_credit_deduction(outcome, start.elapsed().as_secs_f64());
                warn!(owner_id = %owner_id, amount, error = %e, "积分扣减被拒绝");
                return Err(e);
            }
        };

        // 3. 逐批次扣减
        for draw in &plan.draws {
            let affected = CreditLotRepository::consume_in_tx(tx, draw.lot_id, draw.amount).await?;
            if affected != 1 {
                // 行已被锁定，走到这里说明数据被绕过锁修改过
                metrics::record_credit_deduction("error", start.elapsed().as_secs_f64());
                warn!(owner_id = %owner_id, lot_id = draw.lot_id, "批次扣减未命中");
                return Err(SettlementError::ConcurrencyConflict);
            }
            debug!(lot_id = draw.lot_id, amount = draw.amount, "批次已扣减");
        }

        metrics::record_credit_deduction("success", start.elapsed().as_secs_f64());
        info!(
            owner_id = %owner_id,
            amount,
            lots_touched = plan.draws.len(),
            available_before = plan.available,
            "积分扣减完成"
        );

        Ok(DeductionReceipt {
            owner_id: owner_id.to_string(),
            amount,
            plan,
        })
    }

    /// 在事务中退款：总是新建批次，有效期为固定宽限天数
    ///
    /// 不沿用原批次的剩余有效期。
    pub async fn refund_in_tx(
        tx: &mut PgConnection,
        owner_id: &str,
        amount: i32,
        grace_days: i64,
        source_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<CreditLot> {
        if amount <= 0 {
            return Err(SettlementError::Validation(format!(
                "退款数量必须为正数: {}",
                amount
            )));
        }

        let mut new_lot = NewCreditLot::new(owner_id, LotSource::Refund, source_ref, amount);
        new_lot.expires_at = Some(now + Duration::days(grace_days.max(1)));

        let lot = CreditLotRepository::insert_in_tx(tx, &new_lot).await?;

        metrics::record_credit_issuance(LotSource::Refund.as_str(), amount);
        metrics::record_credit_refund();
        info!(
            owner_id = %owner_id,
            lot_id = lot.id,
            amount,
            grace_days,
            "退款批次已创建"
        );

        Ok(lot)
    }
}
