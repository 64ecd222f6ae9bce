//! 业务服务层
//!
//! - `BookingSettlement` - 预约创建、取消、出勤
//! - `PaymentReconciliation` - 支付回调对账、支付链接创建

mod booking_service;
mod payment_service;

pub use booking_service::BookingSettlement;
pub use payment_service::PaymentReconciliation;
