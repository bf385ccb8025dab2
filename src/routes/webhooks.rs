//! 支付回调
//!
//! 解析前先用原始字节校验签名。支付方对非 2xx 响应会重试，
//! 因此已处理事件的重放同样返回 200。

use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde_json::{Value, json};

use crate::database::repository::{
    packages_repository::PackagesRepository,
    subscriptions_repository::{SubscriptionUpsert, SubscriptionsRepository},
    users_repository::UsersRepository,
};
use crate::database::service::{CoinLedger, CreditOutcome, CreditRequest};
use crate::entity::coin_transactions::TransactionKind;
use crate::entity::transaction_metadata::TransactionMetadata;
use crate::error::AppError;
use crate::payments::{
    CheckoutSession, PaymentEvent, SIGNATURE_HEADER, SignatureError, SubscriptionObject,
    WebhookEvent, verify_signature,
};
use crate::state::AppState;

pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(SignatureError::MissingHeader)?;

    if let Err(e) = verify_signature(
        &body,
        header,
        &state.config.webhook_secret,
        state.config.webhook_tolerance_secs,
        chrono::Utc::now().timestamp(),
    ) {
        log::warn!("拒绝支付 webhook: {}", e);
        return Err(e.into());
    }

    let event = WebhookEvent::parse(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid event payload: {e}")))?;
    log::info!("收到支付 webhook {} ({})", event.id, event.event_type);

    let event = event
        .into_payment_event()
        .map_err(|e| AppError::BadRequest(format!("Invalid event object: {e}")))?;

    match event {
        PaymentEvent::CheckoutCompleted(session) => checkout_completed(&state, session).await,
        PaymentEvent::SubscriptionChanged(subscription) => {
            subscription_changed(&state, subscription).await
        }
        PaymentEvent::Ignored(kind) => {
            log::debug!("忽略支付事件 {}", kind);
            Ok(Json(json!({ "received": true })))
        }
    }
}

async fn checkout_completed(
    state: &AppState,
    session: CheckoutSession,
) -> Result<Json<Value>, AppError> {
    if !session.is_paid() {
        log::info!("支付 {} 尚未完成，不入账", session.id);
        return Ok(Json(json!({ "received": true, "credited": false })));
    }

    let user_id = session
        .user_id()
        .ok_or_else(|| AppError::BadRequest("checkout metadata has no user_id".to_string()))?
        .to_string();

    let (coins, description) = match session.package_id() {
        Some(package_id) => {
            let package = PackagesRepository::find_by_id(&state.db, package_id)
                .await?
                .ok_or_else(|| AppError::BadRequest(format!("Unknown coin package {package_id}")))?;
            (
                package.total_coins(),
                format!("Purchased {} ({} coins)", package.name, package.total_coins()),
            )
        }
        None => {
            let coins = session.coins().filter(|c| *c > 0).ok_or_else(|| {
                AppError::BadRequest("checkout metadata has no package_id or coins".to_string())
            })?;
            (coins, format!("Purchased {coins} coins"))
        }
    };

    let outcome = CoinLedger::credit_coins(
        &state.db,
        CreditRequest {
            user_id: user_id.clone(),
            amount: coins,
            kind: TransactionKind::CoinPurchase,
            reference: session.id.clone(),
            description: Some(description),
            metadata: Some(TransactionMetadata {
                package_id: session.package_id(),
                amount_paid_cents: session.amount_total,
                ..Default::default()
            }),
        },
    )
    .await?;

    Ok(Json(json!({
        "received": true,
        "credited": matches!(outcome, CreditOutcome::Credited { .. }),
        "duplicate": matches!(outcome, CreditOutcome::Duplicate { .. }),
        "user_id": user_id,
        "balance": outcome.balance(),
    })))
}

async fn subscription_changed(
    state: &AppState,
    subscription: SubscriptionObject,
) -> Result<Json<Value>, AppError> {
    let user_id = subscription
        .user_id()
        .ok_or_else(|| AppError::BadRequest("subscription metadata has no user_id".to_string()))?
        .to_string();

    UsersRepository::ensure_exists(&state.db, &user_id).await?;

    let saved = SubscriptionsRepository::upsert(
        &state.db,
        SubscriptionUpsert {
            plan: subscription.plan_name(),
            user_id,
            provider_subscription_id: subscription.id,
            status: subscription.status,
            current_period_end: subscription.current_period_end,
        },
    )
    .await?;

    let Some(saved) = saved else {
        return Ok(Json(json!({ "received": true, "ignored": true })));
    };

    log::info!(
        "订阅 {}（用户 {}）状态更新为 {}",
        saved.provider_subscription_id,
        saved.user_id,
        saved.status
    );

    Ok(Json(json!({ "received": true, "status": saved.status })))
}
