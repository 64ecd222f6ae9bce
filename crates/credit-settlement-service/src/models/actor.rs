//! 调用方身份
//!
//! 认证由上游网关完成，这里只承载网关透传的用户 ID 和角色。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn member(user_id: impl Into<String>) -> Self {
        Self::new(user_id, None)
    }

    pub fn role(&self) -> &str {
        self.role.as_deref().unwrap_or("")
    }
}
