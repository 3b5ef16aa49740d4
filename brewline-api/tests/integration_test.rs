use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use brewline_api::{app, middleware::Claims, AppState};
use brewline_core::{ModifierKind, OrderStatus};
use brewline_store::{app_config::Config, InMemorySessions, InMemoryStore};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "test-secret";
const ISSUER: &str = "brewline";

const TEST_CONFIG: &str = r#"
    [server]
    port = 0

    [database]
    url = "postgres://unused"

    [redis]
    url = "redis://unused"
    key_prefix = "brewline"

    [auth]
    jwt_secret = "test-secret"
    jwt_issuer = "brewline"
"#;

struct TestApp {
    router: Router,
    store: InMemoryStore,
    sessions: InMemorySessions,
}

async fn test_app() -> TestApp {
    let store = InMemoryStore::new();
    store.add_menu(5, "Caramel Latte", dec!(20000), dec!(10), 10).await;
    store.add_menu(8, "Croissant", dec!(12000), dec!(0), 1).await;
    store.add_modifier(ModifierKind::Size, 1, "Regular", dec!(0)).await;
    store.add_modifier(ModifierKind::Type, 1, "Hot", dec!(0)).await;
    let sessions = InMemorySessions::new();

    let config = Config::from_toml(TEST_CONFIG).unwrap();
    let state = AppState::new(Arc::new(store.clone()), Arc::new(sessions.clone()), &config).unwrap();

    TestApp {
        router: app(state),
        store,
        sessions,
    }
}

fn token(user_id: i32, role: &str, issuer: &str, ttl_secs: i64) -> String {
    let claims = Claims {
        user_id,
        role: role.to_string(),
        iss: issuer.to_string(),
        exp: (chrono::Utc::now().timestamp() + ttl_secs) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

fn user_token(user_id: i32) -> String {
    token(user_id, "user", ISSUER, 3600)
}

fn admin_token() -> String {
    token(1, "admin", ISSUER, 3600)
}

fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", bearer));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn money(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

fn cart(menu_id: i32, qty: i32) -> Value {
    json!({
        "shipping": "pickup",
        "payment_id": 1,
        "menus": [
            { "menu_id": menu_id, "qty": qty, "product_size_id": 1, "product_type_id": 1 }
        ]
    })
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = test_app().await;
    let (status, body) = send(&app.router, request("POST", "/orders", None, Some(cart(5, 1)))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
    assert!(app.store.orders().await.is_empty());
}

#[tokio::test]
async fn test_expired_and_foreign_tokens_are_rejected() {
    let app = test_app().await;

    let expired = token(7, "user", ISSUER, -3600);
    let (status, body) = send(&app.router, request("GET", "/orders/history", Some(&expired), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Expired Token, Please Login Again");

    let foreign = token(7, "user", "someone-else", 3600);
    let (status, _) = send(&app.router, request("GET", "/orders/history", Some(&foreign), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_users() {
    let app = test_app().await;
    let (status, _) = send(&app.router, request("GET", "/admin/orders", Some(&user_token(7)), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app.router, request("POST", "/orders", Some(&admin_token()), Some(cart(5, 1)))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_place_order() {
    let app = test_app().await;
    let (status, body) = send(&app.router, request("POST", "/orders", Some(&user_token(7)), Some(cart(5, 2)))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(money(&body["data"]["subtotal"]), dec!(36000));
    assert_eq!(money(&body["data"]["tax"]), dec!(3600));
    assert_eq!(money(&body["data"]["total"]), dec!(39600));

    let orders = app.store.orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].user_id, 7);
    assert_eq!(body["data"]["order_id"], orders[0].id.to_string());
    assert_eq!(app.store.menu_stock(5).await, Some(8));

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/metrics", None, None))
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let metrics = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(metrics.contains("orders_placed_total 1"));
}

#[tokio::test]
async fn test_invalid_cart_is_bad_request() {
    let app = test_app().await;
    let body = json!({ "shipping": "", "payment_id": 1, "menus": [] });
    let (status, body) = send(&app.router, request("POST", "/orders", Some(&user_token(7)), Some(body))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Body");
    assert!(app.store.orders().await.is_empty());
}

#[tokio::test]
async fn test_insufficient_stock_is_conflict() {
    let app = test_app().await;
    let (status, body) = send(&app.router, request("POST", "/orders", Some(&user_token(7)), Some(cart(8, 3)))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Stock Insufficient");
    assert_eq!(app.store.menu_stock(8).await, Some(1));
    assert!(app.store.orders().await.is_empty());
}

#[tokio::test]
async fn test_unknown_menu_is_not_found() {
    let app = test_app().await;
    let (status, _) = send(&app.router, request("POST", "/orders", Some(&user_token(7)), Some(cart(99, 1)))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_and_detail() {
    let app = test_app().await;
    send(&app.router, request("POST", "/orders", Some(&user_token(7)), Some(cart(5, 1)))).await;
    let order_id = app.store.orders().await[0].id;

    let (status, body) = send(&app.router, request("GET", "/orders/history?page=1", Some(&user_token(7)), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["total_pages"], 1);

    let uri = format!("/orders/{}", order_id);
    let (status, body) = send(&app.router, request("GET", &uri, Some(&user_token(7)), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lines"][0]["item_name"], "Caramel Latte");

    let (status, _) = send(&app.router, request("GET", &uri, Some(&user_token(8)), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_updates_status() {
    let app = test_app().await;
    send(&app.router, request("POST", "/orders", Some(&user_token(7)), Some(cart(5, 1)))).await;
    let order_id = app.store.orders().await[0].id;

    let patch = json!({ "order_id": order_id, "status": "done" });
    let (status, body) = send(&app.router, request("PATCH", "/admin/orders", Some(&admin_token()), Some(patch))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "done");
    assert_eq!(app.store.orders().await[0].status, OrderStatus::Done);

    let (status, body) = send(&app.router, request("GET", "/admin/orders?status=done", Some(&admin_token()), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_status_errors() {
    let app = test_app().await;
    send(&app.router, request("POST", "/orders", Some(&user_token(7)), Some(cart(5, 1)))).await;
    let order_id = app.store.orders().await[0].id;

    let bad = json!({ "order_id": order_id, "status": "shipped" });
    let (status, _) = send(&app.router, request("PATCH", "/admin/orders", Some(&admin_token()), Some(bad))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.orders().await[0].status, OrderStatus::Pending);

    let missing = json!({ "order_id": uuid::Uuid::new_v4(), "status": "done" });
    let (status, _) = send(&app.router, request("PATCH", "/admin/orders", Some(&admin_token()), Some(missing))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.router, request("GET", "/admin/orders?status=lost", Some(&admin_token()), None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_review_checks_session_token() {
    let app = test_app().await;
    let bearer = user_token(7);
    send(&app.router, request("POST", "/orders", Some(&bearer), Some(cart(5, 1)))).await;
    let line_id = app.store.lines().await[0].id;
    let review = json!({ "order_line_id": line_id, "rating": 4 });

    let (status, _) = send(&app.router, request("POST", "/orders/review", Some(&bearer), Some(review.clone()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.sessions.set_token(7, &bearer).await;
    let (status, body) = send(&app.router, request("POST", "/orders/review", Some(&bearer), Some(review))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(app.store.reviews().await.len(), 1);
}
