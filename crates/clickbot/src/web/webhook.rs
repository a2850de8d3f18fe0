//! Telegram webhook endpoint
//!
//! Telegram posts updates to `/webhook/{secret}` with the same secret in the
//! `X-Telegram-Bot-Api-Secret-Token` header. Both must match.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use clickcore::auth::SharedSecret;
use clickcore::core::config::web::WEBHOOK_SECRET_HEADER;
use teloxide::types::Update;
use teloxide::Bot;

use super::error::AppError;
use super::AppState;
use crate::telegram::{handle_update, HandlerDeps};

/// What the webhook route needs to answer updates.
pub struct WebhookState {
    pub bot: Bot,
    pub deps: HandlerDeps,
    pub secret: SharedSecret,
}

impl WebhookState {
    pub fn new(bot: Bot, deps: HandlerDeps, secret: SharedSecret) -> Self {
        Self { bot, deps, secret }
    }
}

/// POST /webhook/{secret}
pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(path_secret): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let webhook = state
        .webhook
        .clone()
        .ok_or_else(|| AppError::NotFound("webhook is not configured".to_string()))?;

    let header_secret = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    // evaluate both, no short circuit
    let path_ok = webhook.secret.matches(&path_secret);
    let header_ok = webhook.secret.matches(header_secret);
    if !(path_ok & header_ok) {
        log::warn!(
            "Webhook call rejected (path secret ok: {}, header secret ok: {})",
            path_ok,
            header_ok
        );
        return Err(AppError::Unauthorized);
    }

    let update: Update =
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(format!("invalid update: {}", e)))?;

    // Telegram only needs the acknowledgement
    tokio::spawn(async move {
        if let Err(e) = handle_update(&webhook.bot, update, &webhook.deps).await {
            log::error!("Failed to handle webhook update: {}", e);
        }
    });

    Ok(Json(serde_json::json!({ "ok": true })))
}
