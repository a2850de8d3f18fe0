//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use clicker::web::{create_router, AppState, WebhookState};
use clicker::HandlerDeps;
use clickcore::auth::{sign_init_data, SharedSecret};
use clickcore::storage::MemoryStore;
use clickcore::{ClickService, InitDataVerifier, LevelRule};
use teloxide::Bot;
use tower::ServiceExt;

pub const TOKEN: &str = "123:ABC";
pub const WEBHOOK_SECRET: &str = "hook-secret";

pub fn service() -> ClickService {
    ClickService::new(Arc::new(MemoryStore::new()), LevelRule::new(10).unwrap())
}

pub fn state(service: ClickService) -> AppState {
    AppState::new(service, InitDataVerifier::new(TOKEN))
}

pub fn with_webhook(state: AppState) -> AppState {
    let deps = HandlerDeps::new(state.service.clone(), None, Some("clicker_bot".to_string()), 10);
    state.with_webhook(WebhookState::new(Bot::new(TOKEN), deps, SharedSecret::new(WEBHOOK_SECRET)))
}

/// Init data for `user_id` signed with `token`.
pub fn init_data_for(user_id: i64, first_name: &str, token: &str) -> String {
    let user = serde_json::json!({ "id": user_id, "first_name": first_name }).to_string();
    let auth_date = chrono::Utc::now().timestamp().to_string();
    sign_init_data(&[("auth_date", &auth_date), ("user", &user)], token).unwrap()
}

pub fn init_data(user_id: i64) -> String {
    init_data_for(user_id, "Ann", TOKEN)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

pub fn get_signed(uri: &str, init_data: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-init-data", init_data)
        .body(Body::empty())
        .unwrap()
}

pub fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_signed(uri: &str, init_data: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-init-data", init_data)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

pub fn router(state: AppState) -> Router {
    create_router(state)
}
