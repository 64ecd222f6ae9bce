//! 预约 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    dto::{ApiResponse, AttendanceRequest, CancellationOutcome, CreateBookingRequest},
    error::SettlementError,
    models::{Actor, Reservation},
    state::AppState,
};

/// 创建预约
///
/// POST /api/v1/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Reservation>>), SettlementError> {
    let reservation = state.bookings.create_booking(&actor.user_id, &req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(reservation))))
}

/// 取消预约
///
/// POST /api/v1/bookings/{id}/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CancellationOutcome>>, SettlementError> {
    let outcome = state.bookings.cancel_booking(id, &actor).await?;
    Ok(Json(ApiResponse::success_with_message(outcome, "预约已取消")))
}

/// 标记出勤
///
/// POST /api/v1/bookings/{id}/attendance
pub async fn mark_attendance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(req): Json<AttendanceRequest>,
) -> Result<Json<ApiResponse<Reservation>>, SettlementError> {
    let reservation = state
        .bookings
        .mark_attendance(id, &actor, req.attended)
        .await?;
    Ok(Json(ApiResponse::success(reservation)))
}
