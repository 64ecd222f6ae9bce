//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus，指标通过独立端口的 `/metrics` 暴露。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 安装 recorder 并启动指标 HTTP 服务器
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

fn describe_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!("credit_issuances_total", "Credit lots issued");
    metrics::describe_counter!("credit_deductions_total", "Credit deduction attempts");
    metrics::describe_histogram!(
        "credit_deduction_duration_seconds",
        "Credit deduction duration in seconds"
    );
    metrics::describe_counter!("credit_refunds_total", "Refund lots issued on cancellation");

    metrics::describe_counter!("bookings_total", "Booking attempts");
    metrics::describe_histogram!("booking_duration_seconds", "Booking duration in seconds");
    metrics::describe_counter!("booking_cancellations_total", "Cancellation attempts");

    metrics::describe_counter!("payment_webhooks_total", "Payment webhook deliveries");

    metrics::describe_counter!("cascade_tasks_total", "Achievement cascade tasks");
    metrics::describe_gauge!("cascade_queue_depth", "Pending achievement cascade tasks");
    metrics::describe_counter!("achievements_awarded_total", "Newly inserted achievement awards");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "指标服务已监听");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "指标服务异常退出");
        }
    }))
}

// ============================================================================
// 指标记录函数
// ============================================================================

#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// source: purchase / refund / grant
#[inline]
pub fn record_credit_issuance(source: &str, credits: i32) {
    metrics::counter!("credit_issuances_total", "source" => source.to_string()).increment(1);
    metrics::counter!("credits_issued_total", "source" => source.to_string())
        .increment(credits.max(0) as u64);
}

/// outcome: success / insufficient / error
#[inline]
pub fn record_credit_deduction(outcome: &str, duration_secs: f64) {
    metrics::counter!("credit_deductions_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("credit_deduction_duration_seconds").record(duration_secs);
}

#[inline]
pub fn record_credit_refund() {
    metrics::counter!("credit_refunds_total").increment(1);
}

/// outcome: success / duplicate / insufficient / error
#[inline]
pub fn record_booking(outcome: &str, duration_secs: f64) {
    metrics::counter!("bookings_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("booking_duration_seconds", "outcome" => outcome.to_string())
        .record(duration_secs);
}

#[inline]
pub fn record_booking_cancellation(outcome: &str) {
    metrics::counter!("booking_cancellations_total", "outcome" => outcome.to_string())
        .increment(1);
}

/// outcome: processed / duplicate / rejected / ignored / error
#[inline]
pub fn record_payment_webhook(outcome: &str) {
    metrics::counter!("payment_webhooks_total", "outcome" => outcome.to_string()).increment(1);
}

#[inline]
pub fn record_cascade_task(kind: &str, outcome: &str) {
    metrics::counter!(
        "cascade_tasks_total",
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[inline]
pub fn set_cascade_queue_depth(depth: usize) {
    metrics::gauge!("cascade_queue_depth").set(depth as f64);
}

#[inline]
pub fn record_achievements_awarded(count: usize) {
    metrics::counter!("achievements_awarded_total").increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 未安装 recorder 时记录操作为空操作
        record_http_request("POST", "/api/v1/bookings", 201, 0.02);
        record_credit_issuance("purchase", 10);
        record_credit_deduction("success", 0.01);
        record_credit_refund();
        record_booking("duplicate", 0.005);
        record_booking_cancellation("success");
        record_payment_webhook("processed");
        record_cascade_task("workout_logged", "success");
        set_cascade_queue_depth(3);
        record_achievements_awarded(2);
    }
}
