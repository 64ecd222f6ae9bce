//! 路由配置模块

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{handlers, middleware::identity_middleware, state::AppState};

/// 业务路由，需要调用方身份
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // 预约
        .route("/bookings", post(handlers::booking::create_booking))
        .route(
            "/bookings/{id}/cancel",
            post(handlers::booking::cancel_booking),
        )
        .route(
            "/bookings/{id}/attendance",
            post(handlers::booking::mark_attendance),
        )
        // 积分
        .route("/credits/balance", get(handlers::credit::get_balance))
        .route("/credits/lots", get(handlers::credit::list_lots))
        // 支付
        .route("/checkout", post(handlers::payment::create_checkout))
        // 活动上报
        .route(
            "/activities/workouts",
            post(handlers::activity::workout_logged),
        )
        .route_layer(middleware::from_fn(identity_middleware))
}

/// 网关回调路由，靠签名而不是调用方身份鉴权
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/payment", post(handlers::payment::payment_webhook))
}

/// 组装完整路由
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .nest("/webhooks", webhook_routes())
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
}
