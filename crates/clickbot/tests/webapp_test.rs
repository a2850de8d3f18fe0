//! HTTP tests against the full router

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let app = router(state(service()));
    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_click_requires_init_data() {
    let app = router(state(service()));

    let response = send(&app, post("/api/click", "{}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "error": "unauthorized" }));
}

#[tokio::test]
async fn test_forged_init_data_is_rejected() {
    let app = router(state(service()));
    let forged = init_data_for(42, "Ann", "999:OTHER");

    let response = send(&app, post_signed("/api/click", &forged)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    // no detail leaks to the client
    assert_eq!(body_json(response).await, json!({ "error": "unauthorized" }));

    let response = send(&app, post_signed("/api/click", "user=%7B%22id%22%3A42%7D&hash=abc")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_click_flow_levels_up() {
    let app = router(state(service()));
    let signed = init_data(42);

    let response = send(&app, post_signed("/api/click", &signed)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "clicks": 1, "level": 1 }));

    let mut last = serde_json::Value::Null;
    for _ in 1..10 {
        last = body_json(send(&app, post_signed("/api/click", &signed)).await).await;
    }
    assert_eq!(last, json!({ "clicks": 10, "level": 2 }));
}

#[tokio::test]
async fn test_telegram_header_alias() {
    let app = router(state(service()));
    let request = Request::builder()
        .method("POST")
        .uri("/api/click")
        .header("x-telegram-init-data", init_data(7))
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_state_for_unknown_user_is_zero() {
    let service = service();
    let app = router(state(service.clone()));

    let response = send(&app, get_signed("/api/state", &init_data(5))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user_id"], 5);
    assert_eq!(body["clicks"], 0);
    assert_eq!(body["level"], 1);
    assert_eq!(body["rank"], serde_json::Value::Null);
    assert_eq!(body["top"], json!([]));

    // reading did not create a record
    assert_eq!(service.rank(5).await.unwrap(), None);
}

#[tokio::test]
async fn test_state_without_credentials_is_unauthorized() {
    let app = router(state(service()));
    let response = send(&app, get("/api/state")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_state_names_only_the_viewer() {
    let service = service();
    let app = router(state(service.clone()));
    for _ in 0..3 {
        service.click(1).await.unwrap();
    }
    send(&app, post_signed("/api/click", &init_data(2))).await;

    let body = body_json(send(&app, get_signed("/api/state", &init_data(2))).await).await;
    assert_eq!(body["rank"], 2);
    assert_eq!(
        body["top"],
        json!([
            { "rank": 1, "user_id": 1, "clicks": 3, "level": 1 },
            { "rank": 2, "user_id": 2, "clicks": 1, "level": 1, "name": "Ann" },
        ])
    );
}

#[tokio::test]
async fn test_leaderboard_limit_and_anonymous_access() {
    let service = service();
    for user_id in 1..=5 {
        for _ in 0..user_id {
            service.click(user_id).await.unwrap();
        }
    }
    let app = router(state(service));

    let body = body_json(send(&app, get("/api/leaderboard?limit=2")).await).await;
    assert_eq!(
        body,
        json!([
            { "rank": 1, "user_id": 5, "clicks": 5, "level": 1 },
            { "rank": 2, "user_id": 4, "clicks": 4, "level": 1 },
        ])
    );

    let forged = init_data_for(5, "Eve", "999:OTHER");
    let response = send(&app, get_signed("/api/leaderboard", &forged)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_buy_auto_clicker() {
    let service = service().with_auto_clicker_cost(3);
    let app = router(state(service.clone()));
    let signed = init_data(9);

    let response = send(&app, post_signed("/api/shop/auto-clicker", &signed)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for _ in 0..4 {
        send(&app, post_signed("/api/click", &signed)).await;
    }
    let response = send(&app, post_signed("/api/shop/auto-clicker", &signed)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "clicks": 1, "level": 1, "auto_clickers": 1 })
    );
}

#[tokio::test]
async fn test_page_embeds_state() {
    let service = service();
    service.click(3).await.unwrap();
    let app = router(state(service));

    let response = send(&app, get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(r#"{"clicks":0,"level":1}"#));

    let response = send(&app, get_signed("/", &init_data(3))).await;
    assert!(body_text(response).await.contains(r#"{"clicks":1,"level":1}"#));
}

#[tokio::test]
async fn test_legacy_endpoints_disabled_by_default() {
    let app = router(state(service()));

    for request in [
        post("/api/click/5", ""),
        post("/click", r#"{"user_id": 5}"#),
        post("/stats", r#"{"user_id": 5}"#),
        get("/game/5"),
        get("/?user_id=5"),
        get("/api/state?user_id=5"),
    ] {
        let uri = request.uri().to_string();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn test_legacy_endpoints_when_enabled() {
    let app = router(state(service()).with_legacy(true));

    let response = send(&app, post("/click", r#"{"user_id": 5}"#)).await;
    assert_eq!(body_json(response).await, json!({ "clicks": 1, "level": 1 }));

    let response = send(&app, post("/api/click/5", "")).await;
    assert_eq!(body_json(response).await, json!({ "clicks": 2, "level": 1 }));

    let response = send(&app, post("/click", "{}")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, post("/stats", r#"{"user_id": "5"}"#)).await;
    assert_eq!(body_json(response).await, json!({ "clicks": 2, "level": 1 }));

    let response = send(&app, post("/stats", "{}")).await;
    assert_eq!(body_json(response).await, json!({ "clicks": 0, "level": 1 }));

    let response = send(&app, get("/game/5")).await;
    assert!(body_text(response).await.contains(r#"{"clicks":2,"level":1}"#));
}

#[tokio::test]
async fn test_webhook_not_configured() {
    let app = router(state(service()));
    let response = send(&app, post(&format!("/webhook/{}", WEBHOOK_SECRET), "{}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn webhook_request(path_secret: &str, header_secret: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/webhook/{}", path_secret))
        .header("content-type", "application/json");
    if let Some(secret) = header_secret {
        builder = builder.header("x-telegram-bot-api-secret-token", secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_webhook_rejects_wrong_secrets() {
    let app = router(with_webhook(state(service())));

    let cases = [
        webhook_request("wrong", Some(WEBHOOK_SECRET), "{}"),
        webhook_request(WEBHOOK_SECRET, Some("wrong"), "{}"),
        webhook_request(WEBHOOK_SECRET, None, "{}"),
    ];
    for request in cases {
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_webhook_rejects_garbage_update() {
    let app = router(with_webhook(state(service())));
    let response = send(&app, webhook_request(WEBHOOK_SECRET, Some(WEBHOOK_SECRET), "not json")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

const PLAIN_MESSAGE_UPDATE: &str = r#"{
    "update_id": 1,
    "message": {
        "message_id": 1,
        "date": 1700000000,
        "chat": {"id": 5, "type": "private", "first_name": "Ann"},
        "from": {"id": 5, "is_bot": false, "first_name": "Ann"},
        "text": "hello"
    }
}"#;

#[tokio::test]
async fn test_webhook_accepts_signed_update() {
    let service = service();
    let app = router(with_webhook(state(service.clone())));

    let response = send(
        &app,
        webhook_request(WEBHOOK_SECRET, Some(WEBHOOK_SECRET), PLAIN_MESSAGE_UPDATE),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "ok": true }));

    // a plain message is not a command and must not touch scores
    assert_eq!(service.user_state(5).await.unwrap().rank, None);
}
