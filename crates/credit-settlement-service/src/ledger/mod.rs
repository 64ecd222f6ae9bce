//! 积分账本模块
//!
//! - `CreditLedger` - 发放、余额、扣减、退款
//! - `plan_deduction` - 扣减分配规划（纯函数）

mod allocation;
mod service;

pub use allocation::{DeductionPlan, LotDraw, plan_deduction};
pub use service::{CreditLedger, DeductionReceipt};
