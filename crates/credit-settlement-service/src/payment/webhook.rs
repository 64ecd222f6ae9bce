//! 支付网关回调事件
//!
//! 只解析对账需要的字段，其余字段忽略。

use serde::Deserialize;

use crate::error::{Result, SettlementError};

/// 网关表示支付完成的状态值
pub const PAYMENT_COMPLETED: &str = "COMPLETED";

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentWebhookEvent {
    /// 网关事件 ID，重复投递时保持不变
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub object: Option<WebhookObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookObject {
    #[serde(default)]
    pub payment: Option<WebhookPayment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayment {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl PaymentWebhookEvent {
    pub fn parse(raw_body: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw_body)
            .map_err(|e| SettlementError::Validation(format!("回调内容无法解析: {}", e)))
    }

    pub fn payment(&self) -> Option<&WebhookPayment> {
        self.data.as_ref()?.object.as_ref()?.payment.as_ref()
    }

    pub fn is_payment_completed(&self) -> bool {
        self.payment()
            .and_then(|p| p.status.as_deref())
            .is_some_and(|status| status.eq_ignore_ascii_case(PAYMENT_COMPLETED))
    }

    pub fn order_id(&self) -> Option<&str> {
        self.payment()
            .and_then(|p| p.order_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completed_payment() {
        let body = br#"{
            "merchant_id": "M1",
            "type": "payment.updated",
            "event_id": "evt-42",
            "data": {
                "type": "payment",
                "id": "pay-1",
                "object": {
                    "payment": { "id": "pay-1", "order_id": "ord-9", "status": "COMPLETED" }
                }
            }
        }"#;

        let event = PaymentWebhookEvent::parse(body).unwrap();
        assert_eq!(event.event_id(), Some("evt-42"));
        assert_eq!(event.order_id(), Some("ord-9"));
        assert!(event.is_payment_completed());
    }

    #[test]
    fn test_non_completed_status() {
        let body = br#"{"type":"payment.updated","data":{"object":{"payment":{"order_id":"o","status":"APPROVED"}}}}"#;
        let event = PaymentWebhookEvent::parse(body).unwrap();
        assert!(!event.is_payment_completed());
        assert_eq!(event.event_id(), None);
    }

    #[test]
    fn test_event_without_payment_object() {
        let event = PaymentWebhookEvent::parse(br#"{"type":"refund.created"}"#).unwrap();
        assert!(event.payment().is_none());
        assert!(!event.is_payment_completed());
        assert!(event.order_id().is_none());
    }

    #[test]
    fn test_malformed_body() {
        let err = PaymentWebhookEvent::parse(b"not json").unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));
    }
}
