//! 基础设施错误类型
//!
//! 覆盖连接池、迁移和配置加载阶段的失败。业务错误由各服务自行定义。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, InfraError>;

impl InfraError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// 连接池耗尽和 IO 抖动可以重试，其余属于部署问题
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(sqlx::Error::PoolTimedOut) | Self::Database(sqlx::Error::Io(_))
        )
    }
}
