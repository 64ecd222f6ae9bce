//! 支付对接
//!
//! - `signature` - 回调签名校验
//! - `webhook` - 回调事件解析
//! - `gateway` - 出站网关调用（创建支付链接、查询订单）

mod gateway;
mod signature;
mod webhook;

pub use gateway::{
    CheckoutLineItem, CheckoutLink, CheckoutLinkRequest, PaymentGateway, SquareGateway,
    metadata_from_map,
};
#[cfg(test)]
pub use gateway::MockPaymentGateway;
pub use signature::{WebhookVerifier, sign, verify_signature};
pub use webhook::{PAYMENT_COMPLETED, PaymentWebhookEvent};
