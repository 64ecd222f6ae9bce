//! AchievementCascade 集成测试（真实仓储）

mod common;

use std::sync::Arc;

use credit_settlement::cascade::{AchievementCascade, CascadeTrigger, TriggerKind};
use credit_settlement::notification::{InAppNotifier, NotificationSender};
use credit_settlement::repository::{
    AchievementRepository, ActivityStatsRepository, StreakRepository,
};
use sqlx::PgPool;

use common::{date, setup_pool, unique_user};

fn cascade(pool: &PgPool) -> AchievementCascade {
    AchievementCascade::new(
        Arc::new(ActivityStatsRepository::new(pool.clone())),
        Arc::new(StreakRepository::new(pool.clone())),
        Arc::new(AchievementRepository::new(pool.clone())),
        NotificationSender::new(Arc::new(InAppNotifier::new(pool.clone()))),
    )
}

async fn log_workout(pool: &PgPool, user_id: &str) {
    sqlx::query("INSERT INTO workout_logs (user_id, completed_at) VALUES ($1, NOW())")
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}

async fn award_codes(pool: &PgPool, user_id: &str) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT d.code FROM user_achievement_awards a \
         JOIN achievement_definitions d ON d.id = a.achievement_id \
         WHERE a.user_id = $1 ORDER BY d.code",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
#[ignore = "需要 DATABASE_URL"]
async fn test_repeated_trigger_awards_once() {
    let pool = setup_pool().await;
    let cascade = cascade(&pool);
    let user = unique_user();
    log_workout(&pool, &user).await;

    let trigger = CascadeTrigger::new(user.clone(), TriggerKind::WorkoutLogged);
    let today = date(2026, 3, 2);

    let first = cascade.process_on(&trigger, today).await.unwrap();
    let second = cascade.process_on(&trigger, today).await.unwrap();

    let first_codes: Vec<_> = first.newly_awarded.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(first_codes, vec!["first_workout"]);
    assert!(second.newly_awarded.is_empty());
    assert_eq!(award_codes(&pool, &user).await, vec!["first_workout"]);

    assert_eq!(first.streak.current_streak, 1);
    assert_eq!(second.streak, first.streak);
}

#[tokio::test]
#[ignore = "需要 DATABASE_URL"]
async fn test_streak_is_persisted_across_days() {
    let pool = setup_pool().await;
    let cascade = cascade(&pool);
    let user = unique_user();
    let trigger = CascadeTrigger::new(user.clone(), TriggerKind::WorkoutLogged);

    cascade.process_on(&trigger, date(2026, 3, 2)).await.unwrap();
    cascade.process_on(&trigger, date(2026, 3, 3)).await.unwrap();

    let (current, longest, last): (i32, i32, Option<chrono::NaiveDate>) = sqlx::query_as(
        "SELECT current_streak, longest_streak, last_activity_date FROM streak_state WHERE user_id = $1",
    )
    .bind(&user)
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!((current, longest), (2, 2));
    assert_eq!(last, Some(date(2026, 3, 3)));

    // 中断一天后重新计数，最长记录保留
    let outcome = cascade.process_on(&trigger, date(2026, 3, 5)).await.unwrap();
    assert_eq!(outcome.streak.current_streak, 1);
    assert_eq!(outcome.streak.longest_streak, 2);
}

#[tokio::test]
#[ignore = "需要 DATABASE_URL"]
async fn test_booking_trigger_does_not_touch_streak() {
    let pool = setup_pool().await;
    let cascade = cascade(&pool);
    let user = unique_user();

    let outcome = cascade
        .process_on(
            &CascadeTrigger::new(user.clone(), TriggerKind::BookingCreated),
            date(2026, 3, 2),
        )
        .await
        .unwrap();

    assert_eq!(outcome.streak.current_streak, 0);
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM streak_state WHERE user_id = $1")
        .bind(&user)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}
