//! 支付 webhook
//!
//! 签名方案：`stripe-signature` 请求头包含 `t=<unix>` 和一个或多个 `v1=<hex>`，
//! 每个都是用端点密钥对 `"{t}.{raw body}"` 计算的 HMAC-SHA256。

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("webhook secret is not configured")]
    NotConfigured,

    #[error("missing signature header")]
    MissingHeader,

    #[error("malformed signature header")]
    Malformed,

    #[error("timestamp outside the tolerance window")]
    Expired,

    #[error("signature mismatch")]
    Mismatch,
}

/// 用原始请求体校验 `header`
///
/// `now` 由调用方传入，便于测试时间窗口
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NotConfigured);
    }
    if header.trim().is_empty() {
        return Err(SignatureError::MissingHeader);
    }

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(SignatureError::Malformed);
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => signatures.push(value),
            // 忽略 v0 及其他方案
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    // MAC 校验通过前 t= 不可信
    let age = now.checked_sub(timestamp).ok_or(SignatureError::Malformed)?;
    if age.unsigned_abs() > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    let mac = signed_payload_mac(payload, secret, timestamp)?;
    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// 按支付方的方式生成签名请求头
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let mac = signed_payload_mac(payload, secret, timestamp)?;
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn signed_payload_mac(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::NotConfigured)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

// ==================== Event model ====================

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get("user_id").map(String::as_str)
    }

    pub fn package_id(&self) -> Option<i32> {
        self.metadata.get("package_id")?.parse().ok()
    }

    /// 未关联套餐时显式指定的金币数
    pub fn coins(&self) -> Option<i64> {
        self.metadata.get("coins")?.parse().ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub plan: Option<PlanRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanRef {
    pub id: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl SubscriptionObject {
    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get("user_id").map(String::as_str)
    }

    pub fn plan_name(&self) -> Option<String> {
        self.plan
            .as_ref()
            .map(|plan| plan.nickname.clone().unwrap_or_else(|| plan.id.clone()))
    }
}

/// 本服务处理的事件
#[derive(Debug, Clone)]
pub enum PaymentEvent {
    CheckoutCompleted(CheckoutSession),
    SubscriptionChanged(SubscriptionObject),
    Ignored(String),
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn into_payment_event(self) -> Result<PaymentEvent, serde_json::Error> {
        match self.event_type.as_str() {
            "checkout.session.completed" => Ok(PaymentEvent::CheckoutCompleted(
                serde_json::from_value(self.data.object)?,
            )),
            "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.deleted" => Ok(PaymentEvent::SubscriptionChanged(
                serde_json::from_value(self.data.object)?,
            )),
            _ => Ok(PaymentEvent::Ignored(self.event_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";
    const NOW: i64 = 1_760_000_000;

    fn payload() -> &'static [u8] {
        b"{\"type\":\"checkout.session.completed\"}"
    }

    #[test]
    fn valid_signature_is_accepted() {
        let header = sign(payload(), SECRET, NOW).unwrap();
        assert_eq!(verify_signature(payload(), &header, SECRET, 300, NOW), Ok(()));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = sign(payload(), "wrong_secret", NOW).unwrap();
        assert_eq!(
            verify_signature(payload(), &header, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn modified_payload_is_rejected() {
        let header = sign(payload(), SECRET, NOW).unwrap();
        let tampered = b"{\"type\":\"checkout.session.completed\",\"hacked\":true}";
        assert_eq!(
            verify_signature(tampered, &header, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn old_timestamp_is_rejected() {
        let header = sign(payload(), SECRET, NOW - 600).unwrap();
        assert_eq!(
            verify_signature(payload(), &header, SECRET, 300, NOW),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn any_matching_v1_entry_passes() {
        let good = sign(payload(), SECRET, NOW).unwrap();
        let good_sig = good.split_once(",v1=").unwrap().1;
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={good_sig}");
        assert_eq!(verify_signature(payload(), &header, SECRET, 300, NOW), Ok(()));
    }

    #[test]
    fn extreme_timestamps_are_rejected() {
        for timestamp in [i64::MIN, i64::MAX, -1] {
            let header = format!("t={timestamp},v1=00");
            assert!(verify_signature(payload(), &header, SECRET, 300, NOW).is_err());
        }
    }

    #[test]
    fn malformed_headers_error() {
        for header in [
            "garbage",
            "v1=somesignature",
            "t=1234567890",
            "t=abc,v1=00",
            "t=-9223372036854775808,v1=00",
        ] {
            assert_eq!(
                verify_signature(payload(), header, SECRET, 300, NOW),
                Err(SignatureError::Malformed),
                "{header}"
            );
        }
        assert_eq!(
            verify_signature(payload(), "", SECRET, 300, NOW),
            Err(SignatureError::MissingHeader)
        );
    }

    #[test]
    fn missing_secret_rejects_everything() {
        let header = sign(payload(), SECRET, NOW).unwrap();
        assert_eq!(
            verify_signature(payload(), &header, "", 300, NOW),
            Err(SignatureError::NotConfigured)
        );
    }

    #[test]
    fn checkout_event_parses_metadata() {
        let body = br#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_1",
                "payment_status": "paid",
                "amount_total": 499,
                "metadata": { "user_id": "user_42", "package_id": "3" }
            }}
        }"#;

        let event = WebhookEvent::parse(body).unwrap().into_payment_event().unwrap();
        let PaymentEvent::CheckoutCompleted(session) = event else {
            panic!("expected checkout event");
        };
        assert!(session.is_paid());
        assert_eq!(session.user_id(), Some("user_42"));
        assert_eq!(session.package_id(), Some(3));
        assert_eq!(session.coins(), None);
    }

    #[test]
    fn subscription_event_uses_plan_nickname() {
        let body = br#"{
            "id": "evt_2",
            "type": "customer.subscription.updated",
            "data": { "object": {
                "id": "sub_1",
                "status": "active",
                "current_period_end": 1760000000,
                "metadata": { "user_id": "user_42" },
                "plan": { "id": "price_123", "nickname": "Monthly" }
            }}
        }"#;

        let event = WebhookEvent::parse(body).unwrap().into_payment_event().unwrap();
        let PaymentEvent::SubscriptionChanged(sub) = event else {
            panic!("expected subscription event");
        };
        assert_eq!(sub.plan_name().as_deref(), Some("Monthly"));
        assert_eq!(sub.current_period_end, Some(1_760_000_000));
    }

    #[test]
    fn unknown_events_are_ignored() {
        let body = br#"{"id":"evt_3","type":"invoice.paid","data":{"object":{}}}"#;
        let event = WebhookEvent::parse(body).unwrap().into_payment_event().unwrap();
        assert!(matches!(event, PaymentEvent::Ignored(kind) if kind == "invoice.paid"));
    }
}
