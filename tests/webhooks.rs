//! Payment webhook end-to-end tests

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use manhwa_rush_lib::payments;
use serde_json::json;

#[tokio::test]
async fn signed_checkout_credits_package_coins_and_bonus() {
    let app = spawn_app().await;
    let package = app.seed_package(500, 50).await;

    let event = checkout_event("cs_test_1", "reader_1", json!({ "package_id": package.to_string() }));
    let (status, body) = app.webhook(&event).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["credited"], true);
    assert_eq!(body["balance"], 550);

    let (_, balance) = app.get("/api/coins/balance", Some("reader_1")).await;
    assert_eq!(balance["coins"], 550);

    let (_, page) = app.get("/api/coins/transactions", Some("reader_1")).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["kind"], "coin_purchase");
    assert_eq!(page["items"][0]["reference"], "cs_test_1");
    assert_eq!(page["items"][0]["metadata"]["package_id"], package);
}

#[tokio::test]
async fn replayed_checkout_credits_once() {
    let app = spawn_app().await;
    let event = checkout_event("cs_test_replay", "reader_1", json!({ "coins": "300" }));

    let (first_status, first) = app.webhook(&event).await;
    let (second_status, second) = app.webhook(&event).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["duplicate"], false);
    assert_eq!(second["duplicate"], true);
    assert_eq!(second["balance"], 300);

    let (_, balance) = app.get("/api/coins/balance", Some("reader_1")).await;
    assert_eq!(balance["coins"], 300);
}

#[tokio::test]
async fn unpaid_checkout_is_acknowledged_without_credit() {
    let app = spawn_app().await;
    let mut event = checkout_event("cs_test_unpaid", "reader_1", json!({ "coins": "300" }));
    event["data"]["object"]["payment_status"] = json!("unpaid");

    let (status, body) = app.webhook(&event).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["credited"], false);
    let (_, balance) = app.get("/api/coins/balance", Some("reader_1")).await;
    assert_eq!(balance["coins"], 0);
}

#[tokio::test]
async fn checkout_without_user_is_rejected() {
    let app = spawn_app().await;
    let event = json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_1", "payment_status": "paid", "metadata": { "coins": "10" } } }
    });

    let (status, body) = app.webhook(&event).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn bad_signature_is_rejected() {
    let app = spawn_app().await;
    let payload = serde_json::to_vec(&checkout_event("cs_forged", "reader_1", json!({ "coins": "9999" })))
        .unwrap();
    let header = payments::sign(&payload, "not_the_secret", chrono::Utc::now().timestamp()).unwrap();

    let (status, body) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/webhooks/payments")
                .header(payments::SIGNATURE_HEADER, header)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("signature"));

    let (_, balance) = app.get("/api/coins/balance", Some("reader_1")).await;
    assert_eq!(balance["coins"], 0);
}

#[tokio::test]
async fn stale_signature_is_rejected() {
    let app = spawn_app().await;
    let payload = serde_json::to_vec(&checkout_event("cs_old", "reader_1", json!({ "coins": "10" })))
        .unwrap();
    let header = payments::sign(&payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp() - 600)
        .unwrap();

    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/webhooks/payments")
                .header(payments::SIGNATURE_HEADER, header)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let app = spawn_app().await;
    let (status, _) = app
        .post(
            "/api/webhooks/payments",
            None,
            checkout_event("cs_1", "reader_1", json!({ "coins": "10" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subscription_events_unlock_premium_chapters() {
    let app = spawn_app().await;
    let (_, premium) = app.seed_series(40).await;

    let subscription = |status: &str| {
        json!({
            "id": "evt_sub",
            "type": "customer.subscription.updated",
            "data": { "object": {
                "id": "sub_123",
                "status": status,
                "current_period_end": chrono::Utc::now().timestamp() + 86_400,
                "metadata": { "user_id": "reader_1" },
                "plan": { "id": "price_monthly", "nickname": "Monthly" }
            }}
        })
    };

    let (status, _) = app.webhook(&subscription("active")).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/chapters/{premium}/access");
    let (_, access) = app.get(&uri, Some("reader_1")).await;
    assert_eq!(access["has_access"], true);
    assert_eq!(access["reason"], "subscription");

    let (_, sub) = app.get("/api/subscription", Some("reader_1")).await;
    assert_eq!(sub["plan"], "Monthly");

    let (status, _) = app.webhook(&subscription("canceled")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, access) = app.get(&uri, Some("reader_1")).await;
    assert_eq!(access["reason"], "locked");
}

fn subscription_event(event_type: &str, sub_id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": format!("evt_{sub_id}_{status}"),
        "type": event_type,
        "data": { "object": {
            "id": sub_id,
            "status": status,
            "metadata": { "user_id": "reader_1" },
            "plan": { "id": "price_monthly" }
        }}
    })
}

#[tokio::test]
async fn cancellation_of_replaced_plan_keeps_new_one_active() {
    let app = spawn_app().await;
    let (_, premium) = app.seed_series(40).await;

    app.webhook(&subscription_event("customer.subscription.created", "sub_old", "active"))
        .await;
    app.webhook(&subscription_event("customer.subscription.created", "sub_new", "active"))
        .await;
    let (status, body) = app
        .webhook(&subscription_event("customer.subscription.deleted", "sub_old", "canceled"))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ignored"], true);

    let (_, access) = app
        .get(&format!("/api/chapters/{premium}/access"), Some("reader_1"))
        .await;
    assert_eq!(access["reason"], "subscription");

    let (_, sub) = app.get("/api/subscription", Some("reader_1")).await;
    assert_eq!(sub["provider_subscription_id"], "sub_new");
    assert_eq!(sub["status"], "active");
}

#[tokio::test]
async fn unknown_events_are_acknowledged() {
    let app = spawn_app().await;
    let (status, body) = app
        .webhook(&json!({ "id": "evt_x", "type": "invoice.paid", "data": { "object": {} } }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
}
