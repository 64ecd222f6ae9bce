//! 扣减分配规划
//!
//! 纯函数：给定已按锁定顺序排好的批次，决定每个批次扣多少。
//! 可用总量不足时返回 InsufficientCredit，调用方不做任何写入。

use chrono::{DateTime, Utc};

use crate::error::{Result, SettlementError};
use crate::models::CreditLot;

/// 单个批次上的扣减
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotDraw {
    pub lot_id: i64,
    pub amount: i32,
}

/// 扣减计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeductionPlan {
    pub draws: Vec<LotDraw>,
    /// 扣减前的可用总量
    pub available: i64,
}

/// 按批次顺序依次消耗，直到满足 `amount`
///
/// `lots` 的顺序即消耗顺序（先到期的在前，永久批次在后）。
/// 过期或已耗尽的批次会被跳过。
pub fn plan_deduction(lots: &[CreditLot], amount: i32, now: DateTime<Utc>) -> Result<DeductionPlan> {
    if amount <= 0 {
        return Err(SettlementError::Validation(format!(
            "扣减数量必须为正数: {}",
            amount
        )));
    }

    let available: i64 = lots.iter().map(|l| i64::from(l.available(now))).sum();
    if available < i64::from(amount) {
        return Err(SettlementError::InsufficientCredit {
            required: amount,
            available,
        });
    }

    let mut outstanding = amount;
    let mut draws = Vec::new();
    for lot in lots {
        if outstanding == 0 {
            break;
        }
        let take = lot.available(now).min(outstanding);
        if take > 0 {
            draws.push(LotDraw {
                lot_id: lot.id,
                amount: take,
            });
            outstanding -= take;
        }
    }

    Ok(DeductionPlan { draws, available })
}
