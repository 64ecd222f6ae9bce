//! 健康检查

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use studio_shared::database::Database;

use crate::state::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = Database::from_pool(state.pool.clone())
        .health_check()
        .await
        .is_ok();

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_ok { "ok" } else { "degraded" },
            "service": "credit-settlement",
            "checks": {
                "database": if db_ok { "ok" } else { "fail" }
            },
            "cascadeQueueDepth": state.cascade.depth()
        })),
    )
}
