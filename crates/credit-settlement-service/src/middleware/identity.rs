//! 调用方身份中间件
//!
//! 上游认证网关通过请求头透传用户 ID 和角色，这里解析后注入请求扩展。
//! 缺少用户 ID 的请求直接返回 401。

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::models::Actor;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    // 借用只在块内，不能跨越下面的 await
    let (user_id, role) = {
        let headers = request.headers();
        (
            header_value(headers, USER_ID_HEADER),
            header_value(headers, USER_ROLE_HEADER),
        )
    };
    let Some(user_id) = user_id else {
        return unauthorized_response("缺少调用方身份");
    };

    request.extensions_mut().insert(Actor::new(user_id, role));
    next.run(request).await
}

/// 读取非空请求头，去掉首尾空白
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn unauthorized_response(message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": "UNAUTHORIZED",
        "message": message,
        "data": null
    });
    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}
