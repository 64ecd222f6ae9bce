//! 活动上报 API 处理器

use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{
    cascade::{CascadeTrigger, TriggerKind},
    dto::ApiResponse,
    models::Actor,
    state::AppState,
};

/// 训练记录服务上报一次已完成的训练，只触发成就级联
///
/// POST /api/v1/activities/workouts
pub async fn workout_logged(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    state
        .cascade
        .enqueue(CascadeTrigger::new(actor.user_id, TriggerKind::WorkoutLogged));
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::success_with_message((), "已受理")),
    )
}
