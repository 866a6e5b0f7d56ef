//! Scenario: webhook receivers refuse deliveries that fail verification.
//!
//! 1. Square deliveries without (or with a bad) HMAC signature get 403.
//! 2. A correctly signed Square delivery passes the signature gate.
//! 3. Telegram deliveries with the wrong shared secret get 403; an empty
//!    configured secret refuses everything.
//! 4. Telegram login-widget linking refuses when no bot is configured.
//! 5. Health answers without touching the database.
//!
//! The pool is lazy and never connects on the 403 paths, so these tests are
//! pure in-process; a correctly signed delivery is only exercised when
//! ASJ_DATABASE_URL points somewhere real.

use std::sync::Arc;

use asj_server::{routes, square, state, telegram};
use axum::http::{Request, StatusCode};
use base64::Engine;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use sha2::Sha256;
use tower::ServiceExt; // oneshot

const SIGNATURE_KEY: &str = "test-signature-key";
const NOTIFICATION_URL: &str = "https://example.com/webhooks/square";
const TELEGRAM_SECRET: &str = "webhook-shared-secret";

fn test_state(telegram_secret: &str) -> Arc<state::AppState> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://unused@localhost/unused")
        .expect("lazy pool");

    let show = asj_config::load_layered_yaml_from_strings(&[&format!(
        r#"
show:
  name: Test Show
  year: "2026"
money:
  tax_rate: "0.0825"
  commission: "0.10"
  invoice_prefix: "2026-"
square:
  notification_url: {NOTIFICATION_URL}
"#
    )])
    .expect("config")
    .show()
    .expect("show config");

    state::AppState::new(
        pool,
        show,
        state::Secrets {
            square_signature_key: SIGNATURE_KEY.to_string(),
            telegram_bot_token: String::new(),
            telegram_webhook_secret: telegram_secret.to_string(),
        },
    )
}

fn sign_square(body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SIGNATURE_KEY.as_bytes()).unwrap();
    mac.update(NOTIFICATION_URL.as_bytes());
    mac.update(body.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

async fn call(
    router: axum::Router,
    req: Request<axum::body::Body>,
) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

#[tokio::test]
async fn square_delivery_without_signature_is_refused() {
    let st = test_state(TELEGRAM_SECRET);
    let req = Request::builder()
        .method("POST")
        .uri("/webhooks/square")
        .body(axum::body::Body::from(r#"{"type":"payment.updated"}"#))
        .unwrap();
    let (status, body) = call(routes::build_router(st), req).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["message"], "invalid webhook signature");
}

#[tokio::test]
async fn square_delivery_with_tampered_body_is_refused() {
    let st = test_state(TELEGRAM_SECRET);
    let signature = sign_square(r#"{"type":"payment.updated"}"#);
    let req = Request::builder()
        .method("POST")
        .uri("/webhooks/square")
        .header(square::SIGNATURE_HEADER, signature)
        .body(axum::body::Body::from(r#"{"type":"tampered"}"#))
        .unwrap();
    let (status, _) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signed_square_delivery_passes_the_gate() {
    // Past the signature gate the handler logs to the database.
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var(asj_db::ENV_DB_URL) else {
        eprintln!("SKIP: ASJ_DATABASE_URL not set");
        return;
    };
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect");
    asj_db::migrate(&pool).await.expect("migrate");

    let st = test_state(TELEGRAM_SECRET);
    let st = state::AppState::new(pool, st.show.clone(), st.secrets.clone());

    let body = r#"{"type":"payment.updated","data":{"object":{"payment":{"id":"PAY1","order_id":"no-such-order","status":"COMPLETED"}}}}"#;
    let req = Request::builder()
        .method("POST")
        .uri("/webhooks/square")
        .header(square::SIGNATURE_HEADER, sign_square(body))
        .body(axum::body::Body::from(body))
        .unwrap();
    let (status, _) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn telegram_delivery_with_wrong_secret_is_refused() {
    let st = test_state(TELEGRAM_SECRET);
    let req = Request::builder()
        .method("POST")
        .uri("/webhooks/telegram")
        .header(telegram::SECRET_TOKEN_HEADER, "wrong-secret")
        .body(axum::body::Body::from(r#"{"update_id":1}"#))
        .unwrap();
    let (status, _) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unconfigured_telegram_secret_refuses_everything() {
    let st = test_state("");
    let req = Request::builder()
        .method("POST")
        .uri("/webhooks/telegram")
        // Header matches the (empty) configured secret; still refused.
        .header(telegram::SECRET_TOKEN_HEADER, "")
        .body(axum::body::Body::from(r#"{"update_id":1}"#))
        .unwrap();
    let (status, _) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn telegram_link_without_configured_bot_is_refused() {
    // test_state has no bot token, so login verification can never pass.
    let st = test_state(TELEGRAM_SECRET);
    let body = serde_json::json!({
        "fields": { "id": "12345", "auth_date": "1700000000", "hash": "deadbeef" }
    });
    let req = Request::builder()
        .method("POST")
        .uri("/v1/bidders/1/telegram")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    let (status, resp) = call(routes::build_router(st), req).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let json: serde_json::Value = serde_json::from_slice(&resp).unwrap();
    assert_eq!(json["error"]["message"], "telegram login is not configured");
}

#[tokio::test]
async fn health_answers_without_database() {
    let st = test_state(TELEGRAM_SECRET);
    let req = Request::builder()
        .method("GET")
        .uri("/v1/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = call(routes::build_router(st), req).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["show"], "Test Show");
}
