//! 积分结算服务错误类型
//!
//! 业务错误携带可供用户处理的原因；系统错误只记录日志，对外返回通用提示。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettlementError {
    // === 输入与权限 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("回调签名校验失败: {0}")]
    Authentication(String),

    #[error("无权操作: {0}")]
    Forbidden(String),

    // === 积分 ===
    #[error("积分不足: 需要 {required}, 可用 {available}")]
    InsufficientCredit { required: i32, available: i64 },

    // === 预约状态 ===
    #[error("重复预约: class_id={class_id}, target_date={target_date}")]
    DuplicateBooking { class_id: i64, target_date: NaiveDate },

    #[error("预约已取消: reservation_id={0}")]
    AlreadyCancelled(i64),

    #[error("预约状态不允许此操作: reservation_id={reservation_id}, current={current}")]
    InvalidReservationStatus { reservation_id: i64, current: String },

    // === 资源不存在 ===
    #[error("预约不存在: {0}")]
    ReservationNotFound(i64),

    #[error("课程不存在或已下线: {0}")]
    ClassNotFound(i64),

    #[error("积分套餐不存在: {0}")]
    PackageNotFound(i64),

    #[error("购物车为空或不存在: user_id={0}")]
    CartNotFound(String),

    #[error("支付订单不存在: {0}")]
    PaymentOrderNotFound(String),

    // === 系统错误 ===
    #[error("数据库连接池耗尽，请稍后重试")]
    ResourceExhausted,

    #[error("并发冲突，请重试")]
    ConcurrencyConflict,

    #[error("数据库错误: {0}")]
    Database(sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("支付网关错误: {0}")]
    Gateway(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SettlementError>;

/// 连接获取超时单独归类为资源耗尽，调用方可据此退避重试
impl From<sqlx::Error> for SettlementError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::ResourceExhausted,
            other => Self::Database(other),
        }
    }
}

impl From<validator::ValidationErrors> for SettlementError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<reqwest::Error> for SettlementError {
    fn from(err: reqwest::Error) -> Self {
        Self::Gateway(err.to_string())
    }
}

impl SettlementError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ResourceExhausted | Self::ConcurrencyConflict => true,
            Self::Database(e) => is_transient_db_error(e),
            _ => false,
        }
    }

    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::ResourceExhausted
                | Self::ConcurrencyConflict
                | Self::Database(_)
                | Self::Serialization(_)
                | Self::Gateway(_)
                | Self::Internal(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Authentication(_) => "AUTHENTICATION_FAILED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InsufficientCredit { .. } => "INSUFFICIENT_CREDIT",
            Self::DuplicateBooking { .. } => "DUPLICATE_BOOKING",
            Self::AlreadyCancelled(_) => "ALREADY_CANCELLED",
            Self::InvalidReservationStatus { .. } => "INVALID_RESERVATION_STATUS",
            Self::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
            Self::ClassNotFound(_) => "CLASS_NOT_FOUND",
            Self::PackageNotFound(_) => "PACKAGE_NOT_FOUND",
            Self::CartNotFound(_) => "CART_NOT_FOUND",
            Self::PaymentOrderNotFound(_) => "PAYMENT_ORDER_NOT_FOUND",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InsufficientCredit { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DuplicateBooking { .. }
            | Self::AlreadyCancelled(_)
            | Self::InvalidReservationStatus { .. }
            | Self::ConcurrencyConflict => StatusCode::CONFLICT,
            Self::ReservationNotFound(_)
            | Self::ClassNotFound(_)
            | Self::PackageNotFound(_)
            | Self::CartNotFound(_)
            | Self::PaymentOrderNotFound(_) => StatusCode::NOT_FOUND,
            Self::ResourceExhausted => StatusCode::SERVICE_UNAVAILABLE,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Serialization(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// 死锁、序列化失败和 IO 中断属于瞬时错误
fn is_transient_db_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => matches!(db.code().as_deref(), Some("40001") | Some("40P01")),
        _ => false,
    }
}

impl IntoResponse for SettlementError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Serialization(e) => {
                tracing::error!(error = %e, "序列化失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Gateway(e) => {
                tracing::error!(error = %e, "支付网关调用失败");
                "支付服务暂不可用，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let data = match &self {
            Self::InsufficientCredit {
                required,
                available,
            } => json!({ "required": required, "available": available }),
            _ => serde_json::Value::Null,
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": data
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_maps_to_resource_exhausted() {
        let err: SettlementError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, SettlementError::ResourceExhausted));
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_business_errors_are_not_retryable() {
        let insufficient = SettlementError::InsufficientCredit {
            required: 3,
            available: 1,
        };
        assert!(insufficient.is_business_error());
        assert!(!insufficient.is_retryable());

        let duplicate = SettlementError::DuplicateBooking {
            class_id: 1,
            target_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        };
        assert!(duplicate.is_business_error());
        assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_system_errors() {
        assert!(!SettlementError::Internal("boom".into()).is_business_error());
        assert!(SettlementError::ConcurrencyConflict.is_retryable());
        assert!(!SettlementError::Database(sqlx::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn test_error_code_and_status() {
        let cases = [
            (
                SettlementError::AlreadyCancelled(9),
                "ALREADY_CANCELLED",
                StatusCode::CONFLICT,
            ),
            (
                SettlementError::Authentication("mismatch".into()),
                "AUTHENTICATION_FAILED",
                StatusCode::UNAUTHORIZED,
            ),
            (
                SettlementError::PackageNotFound(4),
                "PACKAGE_NOT_FOUND",
                StatusCode::NOT_FOUND,
            ),
            (
                SettlementError::Gateway("timeout".into()),
                "GATEWAY_ERROR",
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, code, status) in cases {
            assert_eq!(err.error_code(), code);
            assert_eq!(err.status_code(), status);
        }
    }

    #[test]
    fn test_insufficient_credit_display() {
        let err = SettlementError::InsufficientCredit {
            required: 5,
            available: 2,
        };
        let text = err.to_string();
        assert!(text.contains('5'));
        assert!(text.contains('2'));
    }

    #[tokio::test]
    async fn test_insufficient_credit_response_carries_counts() {
        let response = SettlementError::InsufficientCredit {
            required: 4,
            available: 1,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "INSUFFICIENT_CREDIT");
        assert_eq!(body["data"]["required"], 4);
        assert_eq!(body["data"]["available"], 1);
    }

    #[tokio::test]
    async fn test_system_error_message_is_generic() {
        let response = SettlementError::Internal("secret detail".into()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(!body["message"].as_str().unwrap().contains("secret"));
    }
}
