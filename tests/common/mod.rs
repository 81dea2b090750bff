#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use woodmart_api::{
    config::{AdminConfig, AdminPassword, AppConfig, OrderPolicy},
    db::{create_orm_conn, run_migrations},
    dto::orders::CreateOrderRequest,
    middleware::auth::AdminUser,
    services::auth_service::AdminPrincipal,
    state::AppState,
};

pub const ADMIN_EMAIL: &str = "owner@woodmart.test";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

pub fn admin_config() -> AdminConfig {
    AdminConfig {
        email: ADMIN_EMAIL.to_string(),
        password: AdminPassword::Plain(SecretString::from(ADMIN_PASSWORD)),
        jwt_secret: SecretString::from("test-signing-secret"),
        token_ttl_secs: 3 * 60 * 60,
    }
}

pub fn test_config(orders: OrderPolicy, webhook: Option<&str>) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        admin: admin_config(),
        orders,
        contact_webhook_url: webhook.map(str::to_string),
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 15,
    }
}

/// Fresh in-memory database with every migration applied.
pub async fn setup_state_with(
    orders: OrderPolicy,
    webhook: Option<&str>,
) -> anyhow::Result<AppState> {
    let config = test_config(orders, webhook);
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    AppState::from_config(orm, &config)
}

pub async fn setup_state() -> anyhow::Result<AppState> {
    setup_state_with(OrderPolicy::default(), None).await
}

pub fn admin() -> AdminUser {
    AdminUser(AdminPrincipal {
        email: ADMIN_EMAIL.to_string(),
    })
}

pub fn order_payload(value: Value) -> CreateOrderRequest {
    serde_json::from_value(value).expect("valid order payload")
}

/// The checkout payload used across tests: two chairs at 10 plus 5 shipping.
pub fn chair_order(name: &str, email: &str) -> CreateOrderRequest {
    order_payload(serde_json::json!({
        "customer": {
            "name": name,
            "email": email,
            "phone": "+44 20 7946 0000",
            "address_line1": "1 High Street",
            "city": "London",
            "country": "UK",
            "postal_code": "N1 1AA"
        },
        "items": [
            { "product_ref": "chair-oak", "title": "Oak chair", "slug": "oak-chair", "price": 10, "quantity": 2 }
        ],
        "shipping": { "method": "courier", "fee": 5 },
        "payment": { "method": "cod" }
    }))
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    send_with_headers(app, method, uri, token, &[], body).await
}

pub async fn send_with_headers(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn login_token(app: &Router) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/admin/login",
        None,
        Some(serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["data"]["token"]
        .as_str()
        .expect("token in login response")
        .to_string()
}
