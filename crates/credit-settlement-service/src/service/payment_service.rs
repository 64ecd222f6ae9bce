//! 支付对账服务
//!
//! ## 回调处理流程
//!
//! 1. 签名校验 -> 2. 解析事件，非支付完成直接确认
//!    -> 3. 解析订单元数据（本地订单优先，缺失时查询网关）
//!    -> 4. 事务内：占用事件 ID -> 订单 pending 置为 completed -> 按结账快照逐行发放批次
//!       -> 清空购物车
//!    -> 5. 提交后触发级联
//!
//! 去重分两层：同一事件重复投递时事件 ID 冲突；同一订单的不同事件（网关对一笔支付
//! 会发送多次 payment.updated）在订单状态上冲突。两种情况都直接确认且不发放。

use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use studio_shared::config::PaymentConfig;
use studio_shared::observability::metrics;

use crate::cascade::{CascadeQueue, CascadeTrigger, TriggerKind};
use crate::dto::{CheckoutRequest, CheckoutResponse, WebhookAck};
use crate::error::{Result, SettlementError};
use crate::ledger::CreditLedger;
use crate::models::{
    LotSource, OrderMetadata, OrderTarget, PaymentOrderStatus, PurchaseLine, package_source_ref,
};
use crate::payment::{
    CheckoutLineItem, CheckoutLinkRequest, PaymentGateway, PaymentWebhookEvent, WebhookVerifier,
};
use crate::repository::{CatalogRepository, NewPaymentOrder, PaymentOrderRepository};

pub struct PaymentReconciliation {
    pool: PgPool,
    order_repo: PaymentOrderRepository,
    catalog: CatalogRepository,
    gateway: Arc<dyn PaymentGateway>,
    verifier: WebhookVerifier,
    cascade: CascadeQueue,
    currency: String,
    redirect_url: Option<String>,
}

impl PaymentReconciliation {
    pub fn new(
        pool: PgPool,
        gateway: Arc<dyn PaymentGateway>,
        cascade: CascadeQueue,
        config: &PaymentConfig,
    ) -> Self {
        Self {
            order_repo: PaymentOrderRepository::new(pool.clone()),
            catalog: CatalogRepository::new(pool.clone()),
            pool,
            gateway,
            verifier: WebhookVerifier::from_config(config),
            cascade,
            currency: config.currency.clone(),
            redirect_url: config.redirect_url.clone(),
        }
    }

    /// 处理支付回调
    #[instrument(skip(self, raw_body, signature_header), fields(body_len = raw_body.len()))]
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookAck> {
        let result = self.handle_webhook_inner(raw_body, signature_header).await;

        let outcome = match &result {
            Ok(ack) => ack.outcome(),
            Err(SettlementError::Authentication(_)) => "unauthorized",
            Err(e) if e.is_business_error() => "rejected",
            Err(_) => "error",
        };
        metrics::record_payment_webhook(outcome);

        result
    }

    async fn handle_webhook_inner(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookAck> {
        // 1. 签名校验，失败时不做任何处理
        self.verifier.verify(raw_body, signature_header)?;

        // 2. 只处理支付完成
        let event = PaymentWebhookEvent::parse(raw_body)?;
        if !event.is_payment_completed() {
            info!(
                event_id = ?event.event_id(),
                event_type = %event.event_type,
                "非支付完成事件，忽略"
            );
            return Ok(WebhookAck::Ignored);
        }

        let order_id = event
            .order_id()
            .ok_or_else(|| SettlementError::Validation("回调缺少 order_id".to_string()))?;

        // 3. 订单元数据与结账快照
        let order = self.resolve_order(order_id).await?;
        let metadata = &order.metadata;

        // 4. 事务内发放
        let mut tx = self.pool.begin().await?;

        match event.event_id() {
            Some(event_id) => {
                if !PaymentOrderRepository::claim_event_in_tx(&mut tx, event_id, order_id).await? {
                    info!(event_id, order_id, "回调事件已处理过，跳过");
                    return Ok(WebhookAck::Duplicate);
                }
            }
            None => warn!(order_id, "回调缺少 event_id，仅按订单去重"),
        }

        let claimed = match order.lines {
            Some(_) => PaymentOrderRepository::complete_pending_in_tx(&mut tx, order_id).await?,
            None => {
                PaymentOrderRepository::record_gateway_order_in_tx(&mut tx, metadata, &self.currency)
                    .await?
            }
        };
        if !claimed {
            info!(order_id, event_id = ?event.event_id(), "订单已结算，跳过");
            return Ok(WebhookAck::Duplicate);
        }

        let credits_issued = Self::settle_order_in_tx(&mut tx, &order).await?;

        if let Some(event_id) = event.event_id() {
            PaymentOrderRepository::record_event_credits_in_tx(&mut tx, event_id, credits_issued)
                .await?;
        }

        tx.commit().await?;

        info!(
            event_id = ?event.event_id(),
            order_id,
            user_id = %metadata.user_id,
            credits_issued,
            "支付回调处理完成"
        );

        // 5. 提交后触发级联
        self.cascade.enqueue(CascadeTrigger::new(
            metadata.user_id.clone(),
            TriggerKind::CreditsPurchased {
                credits: credits_issued,
            },
        ));

        Ok(WebhookAck::Processed { credits_issued })
    }

    /// 为指定套餐或购物车创建支付链接
    #[instrument(skip(self, request))]
    pub async fn create_checkout(
        &self,
        user_id: &str,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse> {
        request.validate()?;

        let (target, line_items, lines) = match (request.package_id, request.cart) {
            (Some(package_id), false) => {
                let package = self
                    .catalog
                    .get_active_package(package_id)
                    .await?
                    .ok_or(SettlementError::PackageNotFound(package_id))?;
                let line = PurchaseLine::from(&package);
                (
                    OrderTarget::Package { package_id },
                    vec![CheckoutLineItem {
                        name: package.name,
                        quantity: 1,
                        unit_price_cents: package.price_cents,
                    }],
                    vec![line],
                )
            }
            (None, true) => {
                let cart_id = self
                    .catalog
                    .find_cart_id(user_id)
                    .await?
                    .ok_or_else(|| SettlementError::CartNotFound(user_id.to_string()))?;
                let lines = self.catalog.list_cart_lines(cart_id).await?;
                if lines.is_empty() {
                    return Err(SettlementError::CartNotFound(user_id.to_string()));
                }
                let purchase_lines: Vec<PurchaseLine> =
                    lines.iter().map(PurchaseLine::from).collect();
                (
                    OrderTarget::Cart { cart_id },
                    lines
                        .into_iter()
                        .map(|line| CheckoutLineItem {
                            name: line.package_name,
                            quantity: line.quantity,
                            unit_price_cents: line.price_cents,
                        })
                        .collect(),
                    purchase_lines,
                )
            }
            _ => {
                return Err(SettlementError::Validation(
                    "必须且只能指定 packageId 或 cart".to_string(),
                ));
            }
        };

        let link_request = CheckoutLinkRequest {
            idempotency_key: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            target,
            line_items,
            currency: self.currency.clone(),
            redirect_url: self.redirect_url.clone(),
        };
        let amount_cents = link_request.amount_cents();

        let link = self.gateway.create_checkout(&link_request).await?;

        let (package_id, cart_id) = match target {
            OrderTarget::Package { package_id } => (Some(package_id), None),
            OrderTarget::Cart { cart_id } => (None, Some(cart_id)),
        };
        self.order_repo
            .create(&NewPaymentOrder {
                order_id: link.order_id.clone(),
                user_id: user_id.to_string(),
                package_id,
                cart_id,
                amount_cents,
                currency: self.currency.clone(),
                checkout_url: link.url.clone(),
                lines,
            })
            .await?;

        info!(
            user_id = %user_id,
            order_id = %link.order_id,
            amount_cents,
            "支付链接已创建"
        );

        Ok(CheckoutResponse {
            order_id: link.order_id,
            url: link.url,
        })
    }

    // ==================== 私有方法 ====================

    /// 本地订单优先（带结账快照），缺失时回退到网关订单元数据
    async fn resolve_order(&self, order_id: &str) -> Result<ResolvedOrder> {
        let local = self
            .order_repo
            .get(order_id)
            .await?
            .and_then(|order| order.metadata().map(|metadata| (metadata, order.status)));
        if let Some((metadata, status)) = local {
            let lines = self.order_repo.list_lines(order_id).await?;
            // 网关侧订单落库时没有明细；已完成的订单稍后在状态更新处判重
            if lines.is_empty() && status == PaymentOrderStatus::Pending {
                return Err(SettlementError::Internal(format!(
                    "订单缺少结账明细: {}",
                    order_id
                )));
            }
            return Ok(ResolvedOrder {
                metadata,
                lines: Some(lines),
            });
        }

        warn!(order_id, "本地无订单记录，查询网关订单元数据");
        let metadata = self
            .gateway
            .fetch_order_metadata(order_id)
            .await?
            .ok_or_else(|| SettlementError::PaymentOrderNotFound(order_id.to_string()))?;

        Ok(ResolvedOrder {
            metadata,
            lines: None,
        })
    }

    /// 逐行发放批次；购物车订单在全部发放成功后清空购物车
    async fn settle_order_in_tx(tx: &mut PgConnection, order: &ResolvedOrder) -> Result<i64> {
        let metadata = &order.metadata;
        let lines: Vec<PurchaseLine> = match (&order.lines, metadata.target) {
            (Some(snapshot), _) => snapshot.clone(),
            (None, OrderTarget::Package { package_id }) => {
                let package = CatalogRepository::get_package_in_tx(&mut *tx, package_id)
                    .await?
                    .ok_or(SettlementError::PackageNotFound(package_id))?;
                vec![PurchaseLine::from(&package)]
            }
            // 网关侧订单没有快照，只能按当前购物车发放
            (None, OrderTarget::Cart { cart_id }) => {
                let lines = CatalogRepository::lock_cart_lines_in_tx(&mut *tx, cart_id).await?;
                if lines.is_empty() {
                    return Err(SettlementError::CartNotFound(metadata.user_id.clone()));
                }
                lines.iter().map(PurchaseLine::from).collect()
            }
        };

        let now = Utc::now();
        let mut credits_issued: i64 = 0;
        for line in &lines {
            let lot = CreditLedger::issue_in_tx(
                &mut *tx,
                &metadata.user_id,
                LotSource::Purchase,
                &package_source_ref(line.package_id),
                line.credits(),
                line.duration_days,
                now,
            )
            .await?;
            credits_issued += i64::from(lot.total);
        }

        if let OrderTarget::Cart { cart_id } = metadata.target {
            let removed = CatalogRepository::clear_cart_in_tx(&mut *tx, cart_id).await?;
            info!(cart_id, removed, "购物车已清空");
        }

        Ok(credits_issued)
    }
}

/// 回调待结算的订单：本地订单带结账快照，网关侧订单没有
struct ResolvedOrder {
    metadata: OrderMetadata,
    lines: Option<Vec<PurchaseLine>>,
}
