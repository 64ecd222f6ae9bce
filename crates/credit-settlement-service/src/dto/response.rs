//! 响应 DTO

use serde::{Deserialize, Serialize};

/// 统一 API 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub owner_id: String,
    pub balance: i64,
}

/// 取消预约结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationOutcome {
    pub reservation_id: i64,
    pub credits_refunded: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: String,
    pub url: String,
}

/// 回调处理结果
///
/// 回调方是自动化系统，HTTP 层只返回确认，不带业务内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookAck {
    Processed { credits_issued: i64 },
    /// 同一事件重复投递
    Duplicate,
    /// 非支付完成事件
    Ignored,
}

impl WebhookAck {
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Processed { .. } => "processed",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_serialization() {
        let body = serde_json::to_value(ApiResponse::success(BalanceResponse {
            owner_id: "u1".to_string(),
            balance: 12,
        }))
        .unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["code"], "SUCCESS");
        assert_eq!(body["data"]["ownerId"], "u1");
        assert_eq!(body["data"]["balance"], 12);
    }

    #[test]
    fn test_cancellation_outcome_is_camel_case() {
        let body = serde_json::to_value(CancellationOutcome {
            reservation_id: 5,
            credits_refunded: 2,
        })
        .unwrap();
        assert_eq!(body["reservationId"], 5);
        assert_eq!(body["creditsRefunded"], 2);
    }
}
