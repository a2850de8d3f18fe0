//! HTTP handlers
//!
//! Verified endpoints take the user from the `X-Init-Data` header (or its
//! `X-Telegram-Init-Data` alias). Legacy endpoints take a caller-supplied
//! `user_id` and answer 401 unless legacy ids are enabled.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse},
    Json,
};
use clickcore::core::config::web::{INIT_DATA_HEADER, INIT_DATA_HEADER_ALIAS};
use clickcore::{AuthError, LeaderboardEntry, ScoreView, UserState, VerifiedInitData, Viewer};
use serde::{Deserialize, Serialize};

use super::error::AppError;
use super::page::render_page;
use super::AppState;

/// Upper bound for `?limit=` on the leaderboard.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// Body of `GET /api/state`
#[derive(Debug, Serialize)]
pub struct StateResponse {
    #[serde(flatten)]
    pub state: UserState,
    pub top: Vec<LeaderboardEntry>,
}

/// Body of `POST /api/shop/auto-clicker`
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub clicks: i64,
    pub level: i64,
    pub auto_clickers: i64,
}

// ============================================================================
// IDENTITY
// ============================================================================

/// Raw init data header; empty values count as absent.
fn init_data_header(headers: &HeaderMap) -> Option<&str> {
    [INIT_DATA_HEADER, INIT_DATA_HEADER_ALIAS]
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .filter(|raw| !raw.is_empty())
}

fn rejected(err: AuthError) -> AppError {
    log::warn!("Rejected init data: {}", err);
    AppError::Unauthorized
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<VerifiedInitData, AppError> {
    let raw = init_data_header(headers).ok_or_else(|| rejected(AuthError::Missing))?;
    state.verifier.verify(raw).map_err(rejected)
}

fn authenticated_user(state: &AppState, headers: &HeaderMap) -> Result<(i64, VerifiedInitData), AppError> {
    let data = authenticate(state, headers)?;
    let user_id = data.user_id().map_err(rejected)?;
    Ok((user_id, data))
}

/// Caller-supplied id, accepted only when legacy ids are enabled.
fn legacy_user(state: &AppState, supplied: Option<i64>, route: &str) -> Result<i64, AppError> {
    if !state.allow_legacy {
        log::warn!("Legacy user id rejected on {} (ALLOW_LEGACY_USER_ID is off)", route);
        return Err(AppError::Unauthorized);
    }
    supplied.ok_or_else(|| AppError::BadRequest("user_id is required".to_string()))
}

/// `{"user_id": 42}` or `{"user_id": "42"}`; an empty body has no id.
fn parse_legacy_body(body: &Bytes) -> Result<Option<i64>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))?;

    match value.get("user_id") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| AppError::BadRequest("user_id must be an integer".to_string())),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest("user_id must be an integer".to_string())),
        Some(_) => Err(AppError::BadRequest("user_id must be an integer".to_string())),
    }
}

fn viewer_of(user_id: i64, data: Option<&VerifiedInitData>) -> Viewer {
    Viewer {
        user_id,
        name: data.and_then(|d| d.user()).and_then(|u| u.display_name()),
    }
}

// ============================================================================
// PAGES
// ============================================================================

/// GET / - the Mini App page
pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserIdQuery>,
) -> Result<Html<String>, AppError> {
    let user_id = if init_data_header(&headers).is_some() {
        Some(authenticated_user(&state, &headers)?.0)
    } else if query.user_id.is_some() {
        Some(legacy_user(&state, query.user_id, "/")?)
    } else {
        // Telegram passes init data to the page script, not to the page request
        None
    };

    let view = match user_id {
        Some(user_id) => state.service.state(user_id).await?,
        None => ScoreView::ZERO,
    };
    Ok(render_page(view))
}

/// GET /game/{user_id} - legacy page for a caller-supplied id
pub async fn legacy_game_page(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let user_id = legacy_user(&state, Some(user_id), "/game")?;
    Ok(render_page(state.service.state(user_id).await?))
}

// ============================================================================
// CLICKS
// ============================================================================

/// POST /api/click
pub async fn api_click(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<ScoreView>, AppError> {
    let (user_id, _) = authenticated_user(&state, &headers)?;
    Ok(Json(state.service.click(user_id).await?))
}

/// POST /click - init data header, or a legacy `{user_id}` body
pub async fn click(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ScoreView>, AppError> {
    let user_id = if init_data_header(&headers).is_some() {
        authenticated_user(&state, &headers)?.0
    } else {
        legacy_user(&state, parse_legacy_body(&body)?, "/click")?
    };
    Ok(Json(state.service.click(user_id).await?))
}

/// POST /api/click/{user_id} - legacy
pub async fn legacy_click(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ScoreView>, AppError> {
    let user_id = legacy_user(&state, Some(user_id), "/api/click/{user_id}")?;
    Ok(Json(state.service.click(user_id).await?))
}

// ============================================================================
// STATE & LEADERBOARD
// ============================================================================

/// GET /api/state - own score, rank and the leaderboard
pub async fn api_state(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<StateResponse>, AppError> {
    let viewer = if init_data_header(&headers).is_some() {
        let (user_id, data) = authenticated_user(&state, &headers)?;
        viewer_of(user_id, Some(&data))
    } else {
        viewer_of(legacy_user(&state, query.user_id, "/api/state")?, None)
    };

    let user_state = state.service.user_state(viewer.user_id).await?;
    let top = state.service.leaderboard(state.leaderboard_size, Some(&viewer)).await?;
    Ok(Json(StateResponse { state: user_state, top }))
}

/// POST /stats - legacy; a body without an id reads as zero state
pub async fn legacy_stats(State(state): State<AppState>, body: Bytes) -> Result<Json<ScoreView>, AppError> {
    if !state.allow_legacy {
        log::warn!("Legacy user id rejected on /stats (ALLOW_LEGACY_USER_ID is off)");
        return Err(AppError::Unauthorized);
    }
    let view = match parse_legacy_body(&body)? {
        Some(user_id) => state.service.state(user_id).await?,
        None => ScoreView::ZERO,
    };
    Ok(Json(view))
}

/// GET /api/leaderboard?limit= - init data is optional and only names the caller
pub async fn api_leaderboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let viewer = if init_data_header(&headers).is_some() {
        let (user_id, data) = authenticated_user(&state, &headers)?;
        Some(viewer_of(user_id, Some(&data)))
    } else {
        None
    };
    let limit = query
        .limit
        .unwrap_or(state.leaderboard_size)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    Ok(Json(state.service.leaderboard(limit, viewer.as_ref()).await?))
}

// ============================================================================
// SHOP & HEALTH
// ============================================================================

/// POST /api/shop/auto-clicker
pub async fn buy_auto_clicker(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PurchaseResponse>, AppError> {
    let (user_id, _) = authenticated_user(&state, &headers)?;
    let record = state.service.buy_auto_clicker(user_id).await?;
    Ok(Json(PurchaseResponse {
        clicks: record.clicks,
        level: record.level,
        auto_clickers: record.auto_clickers,
    }))
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "clicker"
    }))
}
