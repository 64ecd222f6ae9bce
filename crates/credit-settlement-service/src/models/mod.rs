//! 领域模型

pub mod achievement;
pub mod actor;
pub mod credit_lot;
pub mod enums;
pub mod payment;
pub mod reservation;

pub use achievement::{
    AchievementDefinition, ActivitySnapshot, ActivityStats, StreakState, UserAchievementAward,
};
pub use actor::Actor;
pub use credit_lot::{CreditLot, NewCreditLot, package_source_ref, refund_source_ref};
pub use enums::{CriteriaType, LotSource, PaymentOrderStatus, ReservationStatus};
pub use payment::{
    CartLine, CreditPackage, OrderMetadata, OrderTarget, PaymentOrder, PurchaseLine,
};
pub use reservation::{NewReservation, Reservation};
