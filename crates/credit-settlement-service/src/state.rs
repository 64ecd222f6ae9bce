//! 应用状态定义

use std::sync::Arc;

use sqlx::PgPool;

use crate::cascade::CascadeQueue;
use crate::ledger::CreditLedger;
use crate::service::{BookingSettlement, PaymentReconciliation};

/// Axum 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub ledger: Arc<CreditLedger>,
    pub bookings: Arc<BookingSettlement>,
    pub payments: Arc<PaymentReconciliation>,
    /// 外部协作方（训练记录等）上报活动时直接入队
    pub cascade: CascadeQueue,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        ledger: Arc<CreditLedger>,
        bookings: Arc<BookingSettlement>,
        payments: Arc<PaymentReconciliation>,
        cascade: CascadeQueue,
    ) -> Self {
        Self {
            pool,
            ledger,
            bookings,
            payments,
            cascade,
        }
    }
}
