//! 共享库
//!
//! 各服务共用的配置、数据库连接、重试和可观测性基础设施。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod retry;
