//! CreditLedger 集成测试
//!
//! 扣减依赖行级锁与事务回滚，必须在真实 PostgreSQL 上验证。

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;

use credit_settlement::models::LotSource;
use credit_settlement::{CreditLedger, SettlementError};

use common::{setup_pool, unique_user};

/// 余额始终在 [0, sum(total)] 之间
async fn assert_sum_invariant(pool: &sqlx::PgPool, owner_id: &str) {
    let (available, total): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(remaining) FILTER (WHERE expires_at IS NULL OR expires_at > NOW()), 0)::BIGINT,
            COALESCE(SUM(total), 0)::BIGINT
        FROM credit_lots WHERE owner_id = $1
        "#,
    )
    .bind(owner_id)
    .fetch_one(pool)
    .await
    .unwrap();

    assert!(available >= 0);
    assert!(available <= total);
}

#[tokio::test]
#[ignore = "需要 DATABASE_URL"]
async fn test_issue_deduct_round_trip() {
    let pool = setup_pool().await;
    let ledger = CreditLedger::new(pool.clone());
    let owner = unique_user();

    ledger
        .issue(&owner, LotSource::Purchase, "package:test", 5, Some(30))
        .await
        .unwrap();
    assert_eq!(ledger.balance(&owner).await.unwrap(), 5);

    ledger.deduct(&owner, 5).await.unwrap();
    assert_eq!(ledger.balance(&owner).await.unwrap(), 0);

    assert_sum_invariant(&pool, &owner).await;
}

#[tokio::test]
#[ignore = "需要 DATABASE_URL"]
async fn test_insufficient_credit_leaves_lots_untouched() {
    let pool = setup_pool().await;
    let ledger = CreditLedger::new(pool.clone());
    let owner = unique_user();

    ledger
        .issue(&owner, LotSource::Purchase, "package:test", 2, None)
        .await
        .unwrap();
    ledger
        .issue(&owner, LotSource::Purchase, "package:test", 1, Some(10))
        .await
        .unwrap();

    let err = ledger.deduct(&owner, 4).await.unwrap_err();
    match err {
        SettlementError::InsufficientCredit {
            required,
            available,
        } => {
            assert_eq!(required, 4);
            assert_eq!(available, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // 全有或全无：没有任何批次被部分扣减
    let lots = ledger.list_lots(&owner).await.unwrap();
    assert!(lots.iter().all(|lot| lot.remaining == lot.total));
    assert_sum_invariant(&pool, &owner).await;
}

#[tokio::test]
#[ignore = "需要 DATABASE_URL"]
async fn test_deduct_consumes_soonest_expiring_first() {
    let pool = setup_pool().await;
    let ledger = CreditLedger::new(pool.clone());
    let owner = unique_user();

    let short = ledger
        .issue(&owner, LotSource::Purchase, "package:short", 2, Some(1))
        .await
        .unwrap();
    let long = ledger
        .issue(&owner, LotSource::Purchase, "package:long", 5, Some(30))
        .await
        .unwrap();

    let receipt = ledger.deduct(&owner, 3).await.unwrap();
    assert_eq!(receipt.plan.draws.len(), 2);

    let lots = ledger.list_lots(&owner).await.unwrap();
    let remaining_of = |id: i64| lots.iter().find(|l| l.id == id).unwrap().remaining;
    assert_eq!(remaining_of(short.id), 0);
    assert_eq!(remaining_of(long.id), 4);
    assert_eq!(ledger.balance(&owner).await.unwrap(), 4);
}

#[tokio::test]
#[ignore = "需要 DATABASE_URL"]
async fn test_expired_lots_do_not_count() {
    let pool = setup_pool().await;
    let ledger = CreditLedger::new(pool.clone());
    let owner = unique_user();

    ledger
        .issue(&owner, LotSource::Purchase, "package:test", 3, Some(30))
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO credit_lots (owner_id, source_kind, source_ref, total, remaining, expires_at) \
         VALUES ($1, 'purchase', 'package:old', 10, 10, $2)",
    )
    .bind(&owner)
    .bind(Utc::now() - Duration::days(1))
    .execute(&pool)
    .await
    .unwrap();

    assert_eq!(ledger.balance(&owner).await.unwrap(), 3);
    assert!(matches!(
        ledger.deduct(&owner, 4).await,
        Err(SettlementError::InsufficientCredit { available: 3, .. })
    ));
}

#[tokio::test]
#[ignore = "需要 DATABASE_URL"]
async fn test_concurrent_single_credit_deductions_never_overdraw() {
    const N: usize = 10;

    let pool = setup_pool().await;
    let ledger = Arc::new(CreditLedger::new(pool.clone()));
    let owner = unique_user();

    ledger
        .issue(&owner, LotSource::Purchase, "package:test", N as i32, None)
        .await
        .unwrap();

    let tasks = (0..N + 1).map(|_| {
        let ledger = ledger.clone();
        let owner = owner.clone();
        tokio::spawn(async move { ledger.deduct(&owner, 1).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|r| matches!(r, Err(SettlementError::InsufficientCredit { .. })))
        .count();

    assert_eq!(succeeded, N);
    assert_eq!(insufficient, 1);
    assert_eq!(ledger.balance(&owner).await.unwrap(), 0);
    assert_sum_invariant(&pool, &owner).await;
}

#[tokio::test]
#[ignore = "需要 DATABASE_URL"]
async fn test_concurrent_multi_lot_deductions_settle_without_deadlock() {
    let pool = setup_pool().await;
    let ledger = Arc::new(CreditLedger::new(pool.clone()));
    let owner = unique_user();

    // 三个批次各 4 点，每次扣 3 点必然跨越批次边界
    for expires_in_days in [Some(5), Some(10), None] {
        ledger
            .issue(&owner, LotSource::Purchase, "package:test", 4, expires_in_days)
            .await
            .unwrap();
    }

    let tasks = (0..6).map(|_| {
        let ledger = ledger.clone();
        let owner = owner.clone();
        tokio::spawn(async move { ledger.deduct(&owner, 3).await })
    });
    // 加锁顺序一致时不会死锁，超时即视为失败
    let deadline = std::time::Duration::from_secs(30);
    let results: Vec<_> = tokio::time::timeout(deadline, join_all(tasks))
        .await
        .expect("并发扣减未在时限内完成")
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|r| matches!(r, Err(SettlementError::InsufficientCredit { .. })))
        .count();
    assert_eq!(succeeded, 4);
    assert_eq!(insufficient, 2);
    assert!(
        results
            .iter()
            .flatten()
            .any(|receipt| receipt.plan.draws.len() > 1)
    );

    let lots = ledger.list_lots(&owner).await.unwrap();
    assert_eq!(lots.len(), 3);
    assert!(lots.iter().all(|lot| lot.remaining == 0));
    assert_eq!(ledger.balance(&owner).await.unwrap(), 0);
    assert_sum_invariant(&pool, &owner).await;
}

#[tokio::test]
#[ignore = "需要 DATABASE_URL"]
async fn test_refund_creates_new_lot_with_grace_expiry() {
    let pool = setup_pool().await;
    let ledger = CreditLedger::new(pool.clone());
    let owner = unique_user();

    let original = ledger
        .issue(&owner, LotSource::Purchase, "package:test", 2, Some(90))
        .await
        .unwrap();
    ledger.deduct(&owner, 2).await.unwrap();

    let refund = ledger
        .refund(&owner, 2, 7, "refund:reservation:test")
        .await
        .unwrap();

    assert_ne!(refund.id, original.id);
    assert_eq!(refund.source_kind, LotSource::Refund);
    assert_eq!(refund.remaining, 2);
    let expires_at = refund.expires_at.unwrap();
    assert!(expires_at > Utc::now() + Duration::days(6));
    assert!(expires_at <= Utc::now() + Duration::days(7));

    // 已耗尽的原批次不会被复用
    let lots = ledger.list_lots(&owner).await.unwrap();
    assert_eq!(
        lots.iter().find(|l| l.id == original.id).unwrap().remaining,
        0
    );
    assert_eq!(ledger.balance(&owner).await.unwrap(), 2);
}
