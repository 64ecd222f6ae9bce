//! 成就级联任务队列
//!
//! 业务操作提交后把触发事件放入有界队列，由若干 worker 消费。
//! 入队永不阻塞调用方：队列满或已关闭时只记日志和指标。
//! 每个任务用 `retry_with_policy` 执行，仅对可重试错误退避重试，
//! 最终失败同样只记录，不会回传给触发方。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use studio_shared::config::CascadeConfig;
use studio_shared::observability::metrics;
use studio_shared::retry::{RetryPolicy, retry_with_policy};

use super::dto::CascadeTrigger;
use super::evaluator::AchievementCascade;
use crate::error::SettlementError;

/// 入队端，可在各服务间克隆共享
#[derive(Clone)]
pub struct CascadeQueue {
    sender: mpsc::Sender<CascadeTrigger>,
}

impl CascadeQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<CascadeTrigger>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// 非阻塞入队
    pub fn enqueue(&self, trigger: CascadeTrigger) {
        let kind = trigger.kind.as_str();
        match self.sender.try_send(trigger) {
            Ok(()) => {
                metrics::record_cascade_task(kind, "enqueued");
                metrics::set_cascade_queue_depth(self.depth());
            }
            Err(mpsc::error::TrySendError::Full(trigger)) => {
                metrics::record_cascade_task(kind, "dropped");
                warn!(user_id = %trigger.user_id, kind, "级联队列已满，丢弃触发事件");
            }
            Err(mpsc::error::TrySendError::Closed(trigger)) => {
                metrics::record_cascade_task(kind, "dropped");
                warn!(user_id = %trigger.user_id, kind, "级联队列已关闭，丢弃触发事件");
            }
        }
    }

    /// 队列中尚未被取走的任务数
    pub fn depth(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

/// 级联 worker 池
pub struct CascadeDispatcher {
    cascade: Arc<AchievementCascade>,
    policy: RetryPolicy,
}

impl CascadeDispatcher {
    pub fn new(cascade: Arc<AchievementCascade>, policy: RetryPolicy) -> Self {
        Self { cascade, policy }
    }

    pub fn from_config(cascade: Arc<AchievementCascade>, config: &CascadeConfig) -> Self {
        let policy = RetryPolicy::with_attempts(
            config.max_attempts,
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        );
        Self::new(cascade, policy)
    }

    /// 启动 `workers` 个消费任务，共享同一个接收端
    ///
    /// worker 在收到 shutdown 信号或所有入队端都被释放后退出；
    /// 收到 shutdown 时先处理完队列中已有的触发再退出。
    pub fn spawn_workers(
        self,
        receiver: mpsc::Receiver<CascadeTrigger>,
        workers: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let receiver = Arc::new(Mutex::new(receiver));
        let dispatcher = Arc::new(self);

        info!(workers = workers.max(1), "成就级联 worker 已启动");

        (0..workers.max(1))
            .map(|worker_id| {
                let receiver = receiver.clone();
                let dispatcher = dispatcher.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    dispatcher.run_worker(worker_id, receiver, shutdown).await;
                })
            })
            .collect()
    }

    async fn run_worker(
        &self,
        worker_id: usize,
        receiver: Arc<Mutex<mpsc::Receiver<CascadeTrigger>>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.changed() => None,
                trigger = async { receiver.lock().await.recv().await } => trigger,
            };

            let Some(trigger) = next else {
                break;
            };

            metrics::set_cascade_queue_depth(receiver.lock().await.len());
            self.handle(&trigger).await;
        }

        // 已入队的触发在停机前处理完
        let mut drained = 0usize;
        loop {
            let next = receiver.lock().await.try_recv();
            let Ok(trigger) = next else {
                break;
            };
            self.handle(&trigger).await;
            drained += 1;
        }

        debug!(worker_id, drained, "成就级联 worker 已停止");
    }

    /// 执行单个触发事件，失败只记录
    pub async fn handle(&self, trigger: &CascadeTrigger) {
        let kind = trigger.kind.as_str();
        let result = retry_with_policy(
            &self.policy,
            "achievement_cascade",
            SettlementError::is_retryable,
            || self.cascade.process(trigger),
        )
        .await;

        match result {
            Ok(outcome) => {
                metrics::record_cascade_task(kind, "success");
                debug!(
                    user_id = %trigger.user_id,
                    kind,
                    awarded = outcome.newly_awarded.len(),
                    "成就级联完成"
                );
            }
            Err(e) => {
                metrics::record_cascade_task(kind, "failed");
                error!(
                    user_id = %trigger.user_id,
                    kind,
                    error = %e,
                    "成就级联失败，已放弃"
                );
            }
        }
    }
}
