//! HTTP route handlers.
//!
//! Every endpoint speaks JSON except the image routes. Ledger calls are
//! synchronous SQLite work, so each one runs on the blocking pool.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bidbook_core::error::require_positive;
use bidbook_core::model::{NewPlayer, NewTeam, PlayerUpdate};
use bidbook_core::{Ledger, LedgerError};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::assets::{AssetError, AssetKind, AssetStore};
use crate::config::MigrationConfig;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub ledger: Arc<Ledger>,
    pub assets: AssetStore,
    /// Defaults for a migrate request that names no targets.
    pub migration: MigrationConfig,
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error rendered as `{"error": ..., "kind": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "validation",
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: message.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status = match &err {
            LedgerError::Validation(_) | LedgerError::InsufficientFunds { .. } => {
                StatusCode::BAD_REQUEST
            }
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::Conflict(_) | LedgerError::InvalidState(_) => StatusCode::CONFLICT,
            LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "Ledger operation failed");
        } else {
            warn!(kind = err.kind(), error = %err, "Ledger operation rejected");
        }
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<AssetError> for ApiError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::NotFound { .. } => Self {
                status: StatusCode::NOT_FOUND,
                kind: "not_found",
                message: err.to_string(),
            },
            AssetError::Io(_) => {
                error!(error = %err, "Asset store failed");
                Self::internal(err.to_string())
            }
            _ => Self::validation(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message, "kind": self.kind }));
        (self.status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run a ledger call on the blocking pool.
async fn with_ledger<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Ledger) -> bidbook_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let ledger = Arc::clone(&state.ledger);
    let joined = tokio::task::spawn_blocking(move || f(&*ledger)).await;
    match joined {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            error!(error = %e, "Ledger task panicked");
            Err(ApiError::internal("ledger task failed"))
        }
    }
}

fn required_text(field: &str, value: Option<String>) -> ApiResult<String> {
    value.ok_or_else(|| ApiError::validation(format!("missing required field `{field}`")))
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

// Fields are optional at the serde level so that a missing field reports as
// a validation error naming the field, like a zero value does.

#[derive(Debug, Deserialize)]
pub struct BidRequest {
    pub player_id: Option<i64>,
    pub team_id: Option<i64>,
    pub bid_amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SaleRequest {
    pub player_id: Option<i64>,
    pub team_id: Option<i64>,
    pub sold_price: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerRef {
    pub player_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TeamRequest {
    pub name: Option<String>,
    pub initial_budget: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub base_price: Option<i64>,
    pub jersey_no: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MigrateRequest {
    pub canonical_budget: Option<i64>,
    pub canonical_base_price: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "healthy", "database": state.ledger.path() }))
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// GET /api/teams
pub async fn list_teams(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let rosters = with_ledger(&state, |l| l.teams_with_rosters()).await?;
    Ok(Json(rosters))
}

/// GET /api/teams/summary
pub async fn team_summaries(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let summaries = with_ledger(&state, |l| l.team_summaries()).await?;
    Ok(Json(summaries))
}

/// POST /api/teams
pub async fn create_team(
    State(state): State<AppState>,
    payload: Result<Json<TeamRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let team = NewTeam {
        name: required_text("name", req.name)?,
        initial_budget: require_positive("initial_budget", req.initial_budget)?,
    };
    let created = with_ledger(&state, move |l| l.create_team(&team)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/teams/:id
///
/// Renames and/or re-caps a team in one transaction.
pub async fn update_team(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TeamRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(team_id) = path?;
    let Json(req) = payload?;
    let team = with_ledger(&state, move |l| {
        l.update_team(team_id, req.name.as_deref(), req.initial_budget)
    })
    .await?;
    Ok(Json(team))
}

/// DELETE /api/teams/:id
pub async fn delete_team(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(team_id) = path?;
    let bids_removed = with_ledger(&state, move |l| l.delete_team(team_id)).await?;
    Ok(Json(json!({
        "message": "Team deleted successfully",
        "team_id": team_id,
        "bids_removed": bids_removed,
    })))
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// GET /api/players
pub async fn list_players(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<impl IntoResponse> {
    let players = match params.search {
        Some(term) => with_ledger(&state, move |l| l.search_players(&term)).await?,
        None => with_ledger(&state, |l| l.list_players()).await?,
    };
    Ok(Json(players))
}

/// GET /api/players/available
pub async fn available_players(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let players = with_ledger(&state, |l| l.available_players()).await?;
    Ok(Json(players))
}

/// POST /api/players
pub async fn create_player(
    State(state): State<AppState>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let player = NewPlayer {
        name: required_text("name", req.name)?,
        role: required_text("role", req.role)?,
        base_price: require_positive("base_price", req.base_price)?,
        jersey_no: req.jersey_no,
    };
    let created = with_ledger(&state, move |l| l.create_player(&player)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/players/:id
pub async fn update_player(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PlayerUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(player_id) = path?;
    let Json(update) = payload?;
    let player = with_ledger(&state, move |l| l.update_player(player_id, &update)).await?;
    Ok(Json(player))
}

/// DELETE /api/players/:id
pub async fn delete_player(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(player_id) = path?;
    let bids_removed = with_ledger(&state, move |l| l.delete_player(player_id)).await?;
    Ok(Json(json!({
        "message": "Player deleted successfully",
        "player_id": player_id,
        "bids_removed": bids_removed,
    })))
}

// ---------------------------------------------------------------------------
// Auction
// ---------------------------------------------------------------------------

/// POST /api/auction/bid
pub async fn place_bid(
    State(state): State<AppState>,
    payload: Result<Json<BidRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let player_id = require_positive("player_id", req.player_id)?;
    let team_id = require_positive("team_id", req.team_id)?;
    let amount = require_positive("bid_amount", req.bid_amount)?;

    let bid = with_ledger(&state, move |l| l.place_bid(player_id, team_id, amount)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Bid placed successfully", "bid": bid })),
    ))
}

/// POST /api/auction/sold
pub async fn mark_sold(
    State(state): State<AppState>,
    payload: Result<Json<SaleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let player_id = require_positive("player_id", req.player_id)?;
    let team_id = require_positive("team_id", req.team_id)?;
    let price = require_positive("sold_price", req.sold_price)?;

    let receipt = with_ledger(&state, move |l| l.settle_sale(player_id, team_id, price)).await?;
    Ok(Json(json!({
        "message": "Player sold successfully",
        "player": receipt.player,
        "team": receipt.team,
        "bid": receipt.bid,
    })))
}

/// POST /api/auction/unsold
pub async fn mark_unsold(
    State(state): State<AppState>,
    payload: Result<Json<PlayerRef>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let player_id = require_positive("player_id", req.player_id)?;

    let player = with_ledger(&state, move |l| l.mark_passed_over(player_id)).await?;
    Ok(Json(json!({ "message": "Player marked as unsold", "player": player })))
}

/// POST /api/auction/release
pub async fn release(
    State(state): State<AppState>,
    payload: Result<Json<PlayerRef>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let player_id = require_positive("player_id", req.player_id)?;

    let receipt = with_ledger(&state, move |l| l.release(player_id)).await?;
    Ok(Json(json!({
        "message": "Player released successfully",
        "player": receipt.player,
        "team": receipt.team,
        "refunded": receipt.refunded,
    })))
}

/// GET /api/auction/history
pub async fn history(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let history = with_ledger(&state, |l| l.auction_history()).await?;
    Ok(Json(history))
}

/// DELETE /api/auction/history/:id
pub async fn delete_bid(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(bid_id) = path?;
    with_ledger(&state, move |l| l.delete_bid(bid_id)).await?;
    Ok(Json(json!({ "message": "Bid deleted successfully", "bid_id": bid_id })))
}

/// POST /api/reset
pub async fn reset(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let summary = with_ledger(&state, |l| l.reset_all()).await?;
    Ok(Json(json!({
        "message": "Auction reset successfully",
        "players_reset": summary.players_reset,
        "teams_reset": summary.teams_reset,
        "bids_cleared": summary.bids_cleared,
    })))
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let stats = with_ledger(&state, |l| l.stats()).await?;
    Ok(Json(stats))
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

/// POST /api/admin/migrate
///
/// An empty body migrates to the configured canonical scale.
pub async fn migrate(State(state): State<AppState>, body: Bytes) -> ApiResult<impl IntoResponse> {
    let req: MigrateRequest = if body.iter().all(u8::is_ascii_whitespace) {
        MigrateRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::validation(format!("invalid migrate body: {e}")))?
    };
    let budget = req.canonical_budget.unwrap_or(state.migration.canonical_budget);
    let base_price = req
        .canonical_base_price
        .unwrap_or(state.migration.canonical_base_price);

    let report =
        with_ledger(&state, move |l| l.migrate_to_canonical_scale(budget, base_price)).await?;
    Ok(Json(report))
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// PUT /api/images/:kind/:name
pub async fn put_image(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let Path((kind, name)) = path?;
    let kind = AssetKind::parse(&kind)?;
    let stored = state.assets.store(kind, &name, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "kind": stored.kind,
            "key": stored.key,
            "format": stored.format,
            "bytes": stored.bytes,
        })),
    ))
}

/// GET /api/images/:kind/:name
pub async fn get_image(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path((kind, name)) = path?;
    let kind = AssetKind::parse(&kind)?;
    let (format, data) = state.assets.load(kind, &name).await?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], data))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
