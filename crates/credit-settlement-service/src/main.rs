//! 积分账本与预约结算服务
//!
//! 提供预约、积分查询、支付链接和支付回调的 REST API，
//! 并在后台运行成就级联 worker。

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use credit_settlement::{
    cascade::{AchievementCascade, CascadeDispatcher, CascadeQueue},
    ledger::CreditLedger,
    notification::{InAppNotifier, NotificationSender},
    payment::SquareGateway,
    repository::{
        AchievementRepository, ActivityStatsRepository, PgClassDirectory, StreakRepository,
    },
    routes,
    service::{BookingSettlement, PaymentReconciliation},
    state::AppState,
};
use studio_shared::{
    config::AppConfig,
    database::Database,
    observability::{self, middleware as obs_middleware},
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

const SERVICE_NAME: &str = "credit-settlement";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 配置加载失败时退回默认值，保证服务仍可启动
    let config = match AppConfig::load(SERVICE_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("加载配置失败，使用默认配置: {e}");
            AppConfig {
                service_name: SERVICE_NAME.to_string(),
                ..Default::default()
            }
        }
    };

    let _guard = observability::init(&config.service_name, &config.observability).await?;

    info!(
        environment = %config.environment,
        addr = %config.server_addr(),
        "Starting {}",
        config.service_name
    );

    if config.payment.webhook_secret.is_none() {
        if config.payment.reject_unsigned_webhooks {
            warn!("未配置 webhook 签名密钥，所有支付回调都将被拒绝");
        } else {
            warn!("未配置 webhook 签名密钥，支付回调将在不校验签名的情况下被信任");
        }
    }

    // 初始化基础设施
    let db = Database::connect(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }
    let pool = db.pool().clone();

    // 成就级联：仓储 -> 评估器 -> 队列与 worker
    let notifier = NotificationSender::new(Arc::new(InAppNotifier::new(pool.clone())));
    let cascade = Arc::new(AchievementCascade::new(
        Arc::new(ActivityStatsRepository::new(pool.clone())),
        Arc::new(StreakRepository::new(pool.clone())),
        Arc::new(AchievementRepository::new(pool.clone())),
        notifier,
    ));
    let (queue, receiver) = CascadeQueue::new(config.cascade.queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = CascadeDispatcher::from_config(cascade, &config.cascade).spawn_workers(
        receiver,
        config.cascade.workers,
        shutdown_rx,
    );

    // 业务服务
    let ledger = Arc::new(CreditLedger::new(pool.clone()));
    let bookings = Arc::new(BookingSettlement::new(
        pool.clone(),
        Arc::new(PgClassDirectory::new(pool.clone())),
        queue.clone(),
        config.settlement.clone(),
    ));
    let gateway = Arc::new(SquareGateway::new(&config.payment)?);
    let payments = Arc::new(PaymentReconciliation::new(
        pool.clone(),
        gateway,
        queue.clone(),
        &config.payment,
    ));

    let state = AppState::new(pool, ledger, bookings, payments, queue);

    let app = routes::app_router(state)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP 停止后通知 worker 退出，等待队列中剩余的级联处理完
    let _ = shutdown_tx.send(true);
    for worker in workers {
        if let Err(e) = worker.await {
            warn!(error = %e, "级联 worker 异常退出");
        }
    }

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
