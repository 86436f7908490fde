//! Integration tests for API endpoints.
//!
//! The router runs on the in-memory store and cache, so these tests need
//! neither PostgreSQL nor Redis.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use account_orders::api::{create_router, AppState};
use account_orders::config::AuthConfig;
use account_orders::domain::{AccountDraft, Password, Role};
use account_orders::infra::{CacheStore, MemoryCache, MemoryStore};
use account_orders::services::{ServiceOptions, Services, TokenService};

const SECRET: &str = "test-secret-key-for-testing-only-32chars";

struct TestApp {
    router: Router,
    store: MemoryStore,
    tokens: TokenService,
}

impl TestApp {
    fn new() -> Self {
        Self::with_cache(None)
    }

    fn with_cache(cache: Option<MemoryCache>) -> Self {
        let store = MemoryStore::new();
        let auth = AuthConfig::new(SECRET, 1).unwrap();
        let cache = cache.map(|c| Arc::new(c) as Arc<dyn CacheStore>);

        let services = Services::build(
            Arc::new(store.clone()),
            cache.clone(),
            ServiceOptions {
                auth: auth.clone(),
                cache_ttl: Duration::from_secs(600),
                scope_timeout: Duration::from_secs(3),
            },
        );
        let state = AppState::from_container(&services, None, cache);

        Self {
            router: create_router(state),
            store,
            tokens: TokenService::new(auth),
        }
    }

    /// Seed an account directly and return a bearer token for it.
    fn seed(&self, email: &str, role: Role) -> (i64, String) {
        let account = self
            .store
            .seed_account(AccountDraft {
                name: "Seeded".to_string(),
                email: email.to_string(),
                password_hash: Password::new("pw").unwrap().into_string(),
                role,
            })
            .unwrap();
        let token = self.tokens.issue(&account).unwrap().access_token;
        (account.id, token)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, headers, value)
    }
}

#[tokio::test]
async fn test_root_and_health() {
    let app = TestApp::with_cache(Some(MemoryCache::new()));

    let (status, _, _) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["services"]["database"]["status"], "disabled");
    assert_eq!(body["services"]["cache"]["status"], "healthy");
}

#[tokio::test]
async fn test_health_degraded_when_cache_down() {
    let cache = MemoryCache::new();
    cache.set_disconnected(true);
    let app = TestApp::with_cache(Some(cache));

    let (status, _, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_register_with_order_scenario() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(
            Method::POST,
            "/auth/register-with-order",
            None,
            Some(json!({
                "account": {"name": "Ann", "email": "ann@x.io", "password": "pw"},
                "order": {"amount": 42.50, "items": []}
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let account_id = body["account"]["id"].as_i64().unwrap();
    assert_eq!(body["order"]["account_id"].as_i64(), Some(account_id));
    assert!(body["order"]["id"].as_i64().is_some());
    assert!(body["account"]["created_at"].is_string());
    assert!(body["order"]["created_at"].is_string());
    assert_eq!(body["order"]["status"], "pending");
    assert!(body["account"].get("password").is_none());
    assert!(body["account"].get("password_hash").is_none());

    let amount: Decimal = serde_json::from_value(body["order"]["amount"].clone()).unwrap();
    assert_eq!(amount, Decimal::new(4250, 2));

    assert_eq!(app.store.accounts_snapshot().len(), 1);
    let orders = app.store.orders_snapshot();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].account_id, account_id);
}

#[tokio::test]
async fn test_register_with_order_duplicate_email_is_conflict() {
    let app = TestApp::new();
    app.seed("ann@x.io", Role::Member);

    let (status, _, body) = app
        .send(
            Method::POST,
            "/auth/register-with-order",
            None,
            Some(json!({
                "account": {"name": "Ann", "email": "ann@x.io", "password": "pw"},
                "order": {"amount": 10, "items": [{"product_id": 1, "quantity": 2, "unit_price": 5}]}
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
    assert_eq!(app.store.accounts_snapshot().len(), 1);
    assert!(app.store.orders_snapshot().is_empty());
}

#[tokio::test]
async fn test_register_with_order_rejects_bad_items() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(
            Method::POST,
            "/auth/register-with-order",
            None,
            Some(json!({
                "account": {"name": "Ann", "email": "ann@x.io", "password": "pw"},
                "order": {"amount": 10, "items": [{"product_id": 1, "quantity": 0, "unit_price": 5}]}
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert!(body["details"].as_str().unwrap().contains("quantity"));
    assert_eq!(app.store.stats().begins, 0);
}

#[tokio::test]
async fn test_register_with_order_rejects_amount_beyond_column() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(
            Method::POST,
            "/auth/register-with-order",
            None,
            Some(json!({
                "account": {"name": "Ann", "email": "ann@x.io", "password": "pw"},
                "order": {"amount": "10000000000", "items": []}
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert_eq!(app.store.stats().begins, 0);
}

#[tokio::test]
async fn test_register_and_login() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"name": "Bob", "email": "bob@x.io", "password": "hunter2"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "member");

    let (status, _, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "bob@x.io", "password": "hunter2"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");

    let token = body["access_token"].as_str().unwrap().to_string();
    let (status, _, body) = app.send(Method::GET, "/accounts/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "bob@x.io");
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = TestApp::new();
    app.seed("ann@x.io", Role::Member);

    let (status, _, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "ann@x.io", "password": "nope"})),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn test_missing_token_is_unauthenticated_without_store_access() {
    let app = TestApp::new();
    let before = app.store.stats();

    let (status, _, body) = app.send(Method::GET, "/accounts/1", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthenticated");
    assert_eq!(app.store.stats(), before);
}

#[tokio::test]
async fn test_malformed_token_is_unauthenticated() {
    let app = TestApp::new();

    let (status, _, _) = app
        .send(Method::GET, "/accounts/me", Some("not-a-jwt"), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_on_admin_endpoint_is_forbidden_without_store_access() {
    let app = TestApp::new();
    let (target, _) = app.seed("target@x.io", Role::Member);
    let (_, member_token) = app.seed("member@x.io", Role::Member);
    let before = app.store.stats();

    for method in [Method::GET, Method::DELETE] {
        let uri = format!("/accounts/{}", target);
        let (status, _, body) = app.send(method, &uri, Some(&member_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], 403);
    }

    assert_eq!(app.store.stats(), before);
    assert_eq!(app.store.accounts_snapshot().len(), 2);
}

#[tokio::test]
async fn test_admin_reads_are_cached() {
    let app = TestApp::with_cache(Some(MemoryCache::new()));
    let (target, _) = app.seed("target@x.io", Role::Member);
    let (_, admin_token) = app.seed("admin@x.io", Role::Admin);
    let uri = format!("/accounts/{}", target);

    let (status, headers, first) = app.send(Method::GET, &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-cache"], "MISS");

    let reads = app.store.stats().account_reads;
    let (_, headers, second) = app.send(Method::GET, &uri, Some(&admin_token), None).await;
    assert_eq!(headers["x-cache"], "HIT");
    assert_eq!(app.store.stats().account_reads, reads);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_admin_update_invalidates_cache() {
    let app = TestApp::with_cache(Some(MemoryCache::new()));
    let (target, _) = app.seed("target@x.io", Role::Member);
    let (_, admin_token) = app.seed("admin@x.io", Role::Admin);
    let uri = format!("/accounts/{}", target);

    app.send(Method::GET, &uri, Some(&admin_token), None).await;

    let (status, _, body) = app
        .send(
            Method::PUT,
            &uri,
            Some(&admin_token),
            Some(json!({"name": "Renamed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Renamed");

    let (_, headers, body) = app.send(Method::GET, &uri, Some(&admin_token), None).await;
    assert_eq!(headers["x-cache"], "MISS");
    assert_eq!(body["name"], "Renamed");
}

#[tokio::test]
async fn test_admin_delete_then_not_found() {
    let app = TestApp::new();
    let (target, _) = app.seed("target@x.io", Role::Member);
    let (_, admin_token) = app.seed("admin@x.io", Role::Admin);
    let uri = format!("/accounts/{}", target);

    let (status, _, _) = app.send(Method::DELETE, &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, body) = app.send(Method::GET, &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_orders_visible_to_owner_only() {
    let app = TestApp::new();

    let (_, _, body) = app
        .send(
            Method::POST,
            "/auth/register-with-order",
            None,
            Some(json!({
                "account": {"name": "Ann", "email": "ann@x.io", "password": "pw"},
                "order": {"amount": "42.50"}
            })),
        )
        .await;
    let owner_id = body["account"]["id"].as_i64().unwrap();
    let order_id = body["order"]["id"].as_i64().unwrap();

    let (_, owner_token) = {
        let owner = app
            .store
            .accounts_snapshot()
            .into_iter()
            .find(|a| a.id == owner_id)
            .unwrap();
        (owner.id, app.tokens.issue(&owner).unwrap().access_token)
    };
    let (_, stranger_token) = app.seed("eve@x.io", Role::Member);

    let order_uri = format!("/orders/{}", order_id);
    let (status, _, body) = app.send(Method::GET, &order_uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account_id"].as_i64(), Some(owner_id));

    let (status, _, _) = app
        .send(Method::GET, &order_uri, Some(&stranger_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let list_uri = format!("/accounts/{}/orders", owner_id);
    let (status, _, body) = app.send(Method::GET, &list_uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);

    let before = app.store.stats();
    let (status, _, _) = app
        .send(Method::GET, &list_uri, Some(&stranger_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.stats(), before);
}
