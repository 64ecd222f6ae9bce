//! 支付 API 处理器

use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::{
    dto::{ApiResponse, CheckoutRequest, CheckoutResponse},
    error::SettlementError,
    models::Actor,
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "x-payment-signature";

/// 创建支付链接
///
/// POST /api/v1/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<ApiResponse<CheckoutResponse>>, SettlementError> {
    let response = state.payments.create_checkout(&actor.user_id, &req).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// 支付网关回调
///
/// POST /webhooks/payment
///
/// 签名基于原始请求体计算，必须在解析 JSON 之前校验。
/// 回调方是自动化系统，失败时只返回状态码。
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.payments.handle_webhook(&body, signature).await {
        Ok(ack) => (StatusCode::OK, Json(json!({ "received": true, "result": ack.outcome() })))
            .into_response(),
        Err(e) => {
            warn!(code = e.error_code(), error = %e, "支付回调处理失败");
            e.status_code().into_response()
        }
    }
}
