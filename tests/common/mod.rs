#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use manhwa_rush_lib::{
    build_router,
    config::Config,
    database::{
        db,
        dto::{InsertChapterData, InsertManhwaData, InsertPackageData, UpdateUserData},
        repository::{
            chapters_repository::ChaptersRepository, manhwa_repository::ManhwaRepository,
            packages_repository::PackagesRepository, users_repository::UsersRepository,
        },
    },
    entity::{chapter_pages::ChapterPages, users::Role},
    payments,
    state::AppState,
};
use migration::MigratorTrait;
use serde_json::Value;
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";
pub const ADMIN: &str = "admin_1";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub async fn spawn_app() -> TestApp {
    let conn = db::connect("sqlite::memory:".to_string(), 1)
        .await
        .expect("in-memory database");
    migration::Migrator::up(&conn, None)
        .await
        .expect("migrations apply");

    let config = Config {
        database_url: Some("sqlite::memory:".to_string()),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        backup_dir: std::env::temp_dir().join("manhwa-rush-test-backups"),
        ..Config::default()
    };

    let state = AppState::new(conn, config, None);
    TestApp {
        router: build_router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        self.send(request("GET", uri, user, None)).await
    }

    pub async fn post(&self, uri: &str, user: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request("POST", uri, user, Some(body))).await
    }

    pub async fn put(&self, uri: &str, user: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request("PUT", uri, user, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        self.send(request("DELETE", uri, user, None)).await
    }

    /// Posts a webhook body signed with the test secret
    pub async fn webhook(&self, body: &Value) -> (StatusCode, Value) {
        let payload = serde_json::to_vec(body).unwrap();
        let header = payments::sign(&payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp())
            .unwrap();
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/webhooks/payments")
                .header("content-type", "application/json")
                .header(payments::SIGNATURE_HEADER, header)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
    }

    pub async fn make_admin(&self, user_id: &str) {
        UsersRepository::ensure_exists(&self.state.db, user_id)
            .await
            .unwrap();
        UsersRepository::update(
            &self.state.db,
            user_id,
            UpdateUserData {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    /// A series with one free and one premium chapter; returns (free, premium) ids
    pub async fn seed_series(&self, premium_price: i64) -> (i32, i32) {
        let series = ManhwaRepository::insert(
            &self.state.db,
            InsertManhwaData {
                title: "Tower of the Night King".to_string(),
                slug: "tower-of-the-night-king".to_string(),
                description: None,
                cover_url: None,
                author: Some("Han Seol".to_string()),
                status: None,
                genres: None,
            },
        )
        .await
        .unwrap();

        let mut ids = Vec::new();
        for (number, premium, price) in [(1, false, 0), (2, true, premium_price)] {
            let chapter = ChaptersRepository::insert(
                &self.state.db,
                InsertChapterData {
                    manhwa_id: series.id,
                    number,
                    title: Some(format!("Floor {number}")),
                    is_premium: premium,
                    coin_price: price,
                    pages: Some(ChapterPages(vec![
                        format!("https://cdn.example.com/{number}/001.webp"),
                        format!("https://cdn.example.com/{number}/002.webp"),
                    ])),
                    published_at: None,
                },
            )
            .await
            .unwrap();
            ids.push(chapter.id);
        }
        (ids[0], ids[1])
    }

    pub async fn seed_package(&self, coins: i64, bonus: i64) -> i32 {
        PackagesRepository::insert(
            &self.state.db,
            InsertPackageData {
                name: format!("{coins} coins"),
                coins,
                bonus_coins: bonus,
                price_cents: 499,
                currency: None,
                is_active: None,
                sort_order: None,
            },
        )
        .await
        .unwrap()
        .id
    }
}

pub fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn checkout_event(session_id: &str, user_id: &str, metadata: Value) -> Value {
    let mut metadata = metadata;
    metadata["user_id"] = Value::String(user_id.to_string());
    serde_json::json!({
        "id": format!("evt_{session_id}"),
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session_id,
            "payment_status": "paid",
            "amount_total": 499,
            "metadata": metadata
        }}
    })
}
