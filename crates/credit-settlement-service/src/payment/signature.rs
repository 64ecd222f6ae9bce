//! Webhook 签名校验
//!
//! 签名 = base64(HMAC-SHA256(secret, callback_url + raw_body))，
//! 回调地址必须与网关登记时完全一致，否则签名不匹配。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use studio_shared::config::PaymentConfig;

use crate::error::{Result, SettlementError};

type HmacSha256 = Hmac<Sha256>;

fn keyed_mac(raw_body: &[u8], secret: &str, callback_url: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SettlementError::Internal(format!("HMAC 密钥无效: {}", e)))?;
    mac.update(callback_url.as_bytes());
    mac.update(raw_body);
    Ok(mac)
}

/// 计算签名（网关侧的算法，测试和本地联调使用）
pub fn sign(raw_body: &[u8], secret: &str, callback_url: &str) -> Result<String> {
    let mac = keyed_mac(raw_body, secret, callback_url)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// 校验签名头，比较为常量时间
pub fn verify_signature(
    raw_body: &[u8],
    signature_header: Option<&str>,
    secret: &str,
    callback_url: &str,
) -> Result<()> {
    let header = signature_header
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SettlementError::Authentication("缺少签名头".to_string()))?;

    let expected = STANDARD
        .decode(header)
        .map_err(|_| SettlementError::Authentication("签名不是合法的 base64".to_string()))?;

    keyed_mac(raw_body, secret, callback_url)?
        .verify_slice(&expected)
        .map_err(|_| SettlementError::Authentication("签名不匹配".to_string()))
}

/// 按配置执行的回调校验器
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: Option<String>,
    callback_url: String,
    reject_unsigned: bool,
}

impl WebhookVerifier {
    pub fn new(secret: Option<String>, callback_url: impl Into<String>, reject_unsigned: bool) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            callback_url: callback_url.into(),
            reject_unsigned,
        }
    }

    pub fn from_config(config: &PaymentConfig) -> Self {
        Self::new(
            config.webhook_secret.clone(),
            config.webhook_callback_url.clone(),
            config.reject_unsigned_webhooks,
        )
    }

    /// 未配置密钥时默认放行（不安全），除非开启 `reject_unsigned`
    pub fn verify(&self, raw_body: &[u8], signature_header: Option<&str>) -> Result<()> {
        match &self.secret {
            Some(secret) => {
                verify_signature(raw_body, signature_header, secret, &self.callback_url)
            }
            None if self.reject_unsigned => Err(SettlementError::Authentication(
                "未配置签名密钥，拒绝回调".to_string(),
            )),
            None => {
                warn!("未配置 webhook 签名密钥，回调未经校验即被信任");
                Ok(())
            }
        }
    }
}
