//! 请求 DTO

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

/// 创建预约请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[validate(range(min = 1, message = "课程 ID 必须为正数"))]
    pub class_id: i64,
    pub target_date: NaiveDate,
    #[validate(range(min = 1, max = 20, message = "预约人数必须在1-20之间"))]
    pub attendee_count: i32,
}

/// 出勤标记请求
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub attended: bool,
}

/// 创建支付链接请求：指定单个套餐，或结算整个购物车
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(range(min = 1, message = "套餐 ID 必须为正数"))]
    pub package_id: Option<i64>,
    #[serde(default)]
    pub cart: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_request_validation() {
        let ok: CreateBookingRequest = serde_json::from_str(
            r#"{"classId": 3, "targetDate": "2024-01-10", "attendeeCount": 2}"#,
        )
        .unwrap();
        assert!(ok.validate().is_ok());

        let zero = CreateBookingRequest {
            attendee_count: 0,
            ..ok.clone()
        };
        assert!(zero.validate().is_err());

        let bad_class = CreateBookingRequest { class_id: 0, ..ok };
        assert!(bad_class.validate().is_err());
    }

    #[test]
    fn test_checkout_request_defaults() {
        let req: CheckoutRequest = serde_json::from_str(r#"{"packageId": 4}"#).unwrap();
        assert_eq!(req.package_id, Some(4));
        assert!(!req.cart);

        let cart: CheckoutRequest = serde_json::from_str(r#"{"cart": true}"#).unwrap();
        assert!(cart.package_id.is_none());
        assert!(cart.cart);
    }
}
