//! HTTP surface of the Mini App: page, JSON API and the Telegram webhook

pub mod error;
pub mod handlers;
pub mod page;
pub mod webhook;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use clickcore::{ClickService, InitDataVerifier};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

pub use error::AppError;
pub use webhook::WebhookState;

/// Shared state for all endpoints
#[derive(Clone)]
pub struct AppState {
    pub service: ClickService,
    pub verifier: Arc<InitDataVerifier>,
    /// Accept caller-supplied user ids on the legacy endpoints
    pub allow_legacy: bool,
    pub leaderboard_size: usize,
    pub webhook: Option<Arc<WebhookState>>,
}

impl AppState {
    pub fn new(service: ClickService, verifier: InitDataVerifier) -> Self {
        Self {
            service,
            verifier: Arc::new(verifier),
            allow_legacy: false,
            leaderboard_size: clickcore::core::config::game::DEFAULT_LEADERBOARD_SIZE,
            webhook: None,
        }
    }

    pub fn with_legacy(mut self, allow: bool) -> Self {
        self.allow_legacy = allow;
        self
    }

    pub fn with_leaderboard_size(mut self, size: usize) -> Self {
        self.leaderboard_size = size;
        self
    }

    pub fn with_webhook(mut self, webhook: WebhookState) -> Self {
        self.webhook = Some(Arc::new(webhook));
        self
    }
}

/// Builds the router with every route
pub fn create_router(state: AppState) -> Router {
    // CORS for the Mini App
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/game/{user_id}", get(handlers::legacy_game_page))
        .route("/api/click", post(handlers::api_click))
        .route("/click", post(handlers::click))
        .route("/api/click/{user_id}", post(handlers::legacy_click))
        .route("/api/state", get(handlers::api_state))
        .route("/stats", post(handlers::legacy_stats))
        .route("/api/leaderboard", get(handlers::api_leaderboard))
        .route("/api/shop/auto-clicker", post(handlers::buy_auto_clicker))
        .route("/health", get(handlers::health_check))
        .route("/webhook/{secret}", post(webhook::handle_webhook))
        .layer(cors)
        .with_state(state)
}

/// Serves the router on `0.0.0.0:port` until the process stops
pub async fn run_web_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    log::info!("Starting Mini App web server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Runs [`run_web_server`] on its own task.
///
/// A server failure (such as a port already in use) is logged here and kept
/// in the handle, so callers must await it next to their main loop.
pub fn spawn_web_server(port: u16, state: AppState) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move {
        let result = run_web_server(port, state).await;
        if let Err(e) = &result {
            log::error!("Web server on port {} failed: {}", port, e);
        }
        result
    })
}
