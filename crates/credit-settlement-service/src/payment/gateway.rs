//! 支付网关客户端
//!
//! `PaymentGateway` 抽象出站调用：创建支付链接、查询订单元数据。
//! `SquareGateway` 基于 reqwest 调用 Square Checkout / Orders API。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument, warn};

use studio_shared::config::PaymentConfig;

use crate::error::{Result, SettlementError};
use crate::models::{OrderMetadata, OrderTarget};

const SQUARE_VERSION: &str = "2024-06-04";

/// 订单 metadata 中的键
pub const META_USER_ID: &str = "user_id";
pub const META_PACKAGE_ID: &str = "package_id";
pub const META_CART_ID: &str = "cart_id";

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

/// 创建支付链接的请求
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLinkRequest {
    pub idempotency_key: String,
    pub user_id: String,
    pub target: OrderTarget,
    pub line_items: Vec<CheckoutLineItem>,
    pub currency: String,
    pub redirect_url: Option<String>,
}

impl CheckoutLinkRequest {
    pub fn amount_cents(&self) -> i64 {
        self.line_items
            .iter()
            .map(|item| item.unit_price_cents.saturating_mul(i64::from(item.quantity)))
            .sum()
    }

    /// 写入网关订单的元数据，回调时据此还原用户和购买内容
    pub fn metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert(META_USER_ID.to_string(), self.user_id.clone());
        match self.target {
            OrderTarget::Package { package_id } => {
                metadata.insert(META_PACKAGE_ID.to_string(), package_id.to_string())
            }
            OrderTarget::Cart { cart_id } => {
                metadata.insert(META_CART_ID.to_string(), cart_id.to_string())
            }
        };
        metadata
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLink {
    pub order_id: String,
    pub url: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(&self, request: &CheckoutLinkRequest) -> Result<CheckoutLink>;

    /// 本地没有订单记录时，从网关订单的 metadata 还原
    async fn fetch_order_metadata(&self, order_id: &str) -> Result<Option<OrderMetadata>>;
}

/// 从订单 metadata 解析出购买内容；字段缺失或非法时返回 None
pub fn metadata_from_map(
    order_id: &str,
    metadata: &HashMap<String, String>,
) -> Option<OrderMetadata> {
    let user_id = metadata.get(META_USER_ID).filter(|v| !v.is_empty())?;

    let target = if let Some(package_id) = metadata.get(META_PACKAGE_ID) {
        OrderTarget::Package {
            package_id: package_id.parse().ok()?,
        }
    } else {
        OrderTarget::Cart {
            cart_id: metadata.get(META_CART_ID)?.parse().ok()?,
        }
    };

    Some(OrderMetadata {
        order_id: order_id.to_string(),
        user_id: user_id.clone(),
        target,
    })
}

// ==================== Square 实现 ====================

#[derive(Debug, Serialize)]
struct Money<'a> {
    amount: i64,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct PaymentLinkResponse {
    payment_link: Option<PaymentLinkBody>,
}

#[derive(Debug, Deserialize)]
struct PaymentLinkBody {
    url: String,
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    order: Option<OrderBody>,
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

pub struct SquareGateway {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    location_id: Option<String>,
}

impl SquareGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| SettlementError::Gateway(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.gateway_base_url.trim_end_matches('/').to_string(),
            access_token: config.gateway_access_token.clone(),
            location_id: config.location_id.clone(),
        })
    }

    fn access_token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SettlementError::Gateway("未配置支付网关访问令牌".to_string()))
    }

    fn location_id(&self) -> Result<&str> {
        self.location_id
            .as_deref()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| SettlementError::Gateway("未配置支付网关门店 ID".to_string()))
    }
}

#[async_trait]
impl PaymentGateway for SquareGateway {
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn create_checkout(&self, request: &CheckoutLinkRequest) -> Result<CheckoutLink> {
        let token = self.access_token()?;
        let location_id = self.location_id()?;

        let line_items: Vec<_> = request
            .line_items
            .iter()
            .map(|item| {
                json!({
                    "name": item.name,
                    "quantity": item.quantity.to_string(),
                    "base_price_money": Money {
                        amount: item.unit_price_cents,
                        currency: &request.currency,
                    },
                })
            })
            .collect();

        let mut body = json!({
            "idempotency_key": request.idempotency_key,
            "order": {
                "location_id": location_id,
                "line_items": line_items,
                "metadata": request.metadata(),
            },
        });
        if let Some(redirect_url) = &request.redirect_url {
            body["checkout_options"] = json!({ "redirect_url": redirect_url });
        }

        let response = self
            .client
            .post(format!("{}/v2/online-checkout/payment-links", self.base_url))
            .bearer_auth(token)
            .header("Square-Version", SQUARE_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = %status, detail = %detail, "创建支付链接失败");
            return Err(SettlementError::Gateway(format!(
                "创建支付链接返回 HTTP {}",
                status
            )));
        }

        let parsed: PaymentLinkResponse = response.json().await?;
        let link = parsed
            .payment_link
            .ok_or_else(|| SettlementError::Gateway("响应缺少 payment_link".to_string()))?;

        debug!(order_id = %link.order_id, "支付链接已创建");

        Ok(CheckoutLink {
            order_id: link.order_id,
            url: link.url,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_order_metadata(&self, order_id: &str) -> Result<Option<OrderMetadata>> {
        let token = self.access_token()?;

        let response = self
            .client
            .get(format!("{}/v2/orders/{}", self.base_url, order_id))
            .bearer_auth(token)
            .header("Square-Version", SQUARE_VERSION)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SettlementError::Gateway(format!(
                "查询订单返回 HTTP {}",
                response.status()
            )));
        }

        let parsed: OrderResponse = response.json().await?;
        Ok(parsed
            .order
            .and_then(|order| metadata_from_map(&order.id, &order.metadata)))
    }
}
