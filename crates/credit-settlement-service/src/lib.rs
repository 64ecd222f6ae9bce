//! 积分账本与预约结算服务
//!
//! 管理可过期的预付课时积分，处理预约的扣减与取消退款、
//! 支付回调的幂等发放，以及提交后异步执行的成就级联。
//!
//! - `ledger` - 积分批次的发放、余额、扣减、退款
//! - `service` - 预约结算与支付对账
//! - `payment` - 回调签名、事件解析、网关客户端
//! - `cascade` - 连续打卡与成就评估队列
//! - `notification` - 成就通知

pub mod cascade;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod notification;
pub mod payment;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

pub use cascade::{AchievementCascade, CascadeDispatcher, CascadeQueue, CascadeTrigger, TriggerKind};
pub use error::{Result, SettlementError};
pub use ledger::CreditLedger;
pub use service::{BookingSettlement, PaymentReconciliation};
