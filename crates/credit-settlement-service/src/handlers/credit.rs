//! 积分查询 API 处理器

use axum::{Extension, Json, extract::State};

use crate::{
    dto::{ApiResponse, BalanceResponse},
    error::SettlementError,
    models::{Actor, CreditLot},
    state::AppState,
};

/// GET /api/v1/credits/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<BalanceResponse>>, SettlementError> {
    let balance = state.ledger.balance(&actor.user_id).await?;
    Ok(Json(ApiResponse::success(BalanceResponse {
        owner_id: actor.user_id,
        balance,
    })))
}

/// GET /api/v1/credits/lots
pub async fn list_lots(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<Vec<CreditLot>>>, SettlementError> {
    let lots = state.ledger.list_lots(&actor.user_id).await?;
    Ok(Json(ApiResponse::success(lots)))
}
