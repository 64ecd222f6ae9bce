//! 数据库仓储层
//!
//! 封装 SQL 细节，不包含业务规则。
//!
//! - 事务由服务层开启，`*_in_tx` 函数接收调用方的连接
//! - 级联评估依赖的仓储通过 trait 暴露，便于 mock

mod achievement_repo;
mod activity_stats_repo;
mod catalog_repo;
mod class_directory;
mod credit_lot_repo;
mod payment_repo;
mod reservation_repo;
mod streak_repo;
mod traits;

pub use achievement_repo::AchievementRepository;
pub use activity_stats_repo::ActivityStatsRepository;
pub use catalog_repo::CatalogRepository;
pub use class_directory::PgClassDirectory;
pub use credit_lot_repo::CreditLotRepository;
pub use payment_repo::{NewPaymentOrder, PaymentOrderRepository};
pub use reservation_repo::ReservationRepository;
pub use streak_repo::StreakRepository;
pub use traits::*;
