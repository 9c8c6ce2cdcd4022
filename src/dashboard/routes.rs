//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is the shared [`Table`].

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::engine::autobet::AutoBetStatus;
use crate::engine::ledger::LedgerView;
use crate::table::{ShoeSnapshot, Table};
use crate::types::{Color, DeckCount, GameError, PlayerStats, RoundResult};

pub type AppState = Table;

/// Recent results returned when `n` is not given.
const DEFAULT_RESULTS: usize = 10;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Game(GameError),
    BadRequest(String),
}

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        ApiError::Game(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Game(e) if !e.is_recoverable() => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Game(GameError::InvalidTransition { .. } | GameError::AutoBetRunning) => {
                StatusCode::CONFLICT
            }
            ApiError::Game(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Game(e) => e.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
        };
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %message, "Request failed");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ColorRequest {
    pub color: Color,
}

#[derive(Debug, Deserialize)]
pub struct StakeRequest {
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct StakeResponse {
    pub stake: Decimal,
}

/// Deck size by count (`2`) or by selector name (`"double"`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DeckSelector {
    Count(u8),
    Name(String),
}

#[derive(Debug, Deserialize)]
pub struct DeckRequest {
    pub decks: DeckSelector,
}

#[derive(Debug, Deserialize)]
pub struct BetQuery {
    pub multiplier: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    pub n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AutoBetRequest {
    pub stake: Decimal,
    pub rounds: u32,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /api/player
pub async fn get_player(State(table): State<AppState>) -> Json<PlayerStats> {
    Json(table.player_stats().await)
}

/// GET /api/house
pub async fn get_house(State(table): State<AppState>) -> Json<PlayerStats> {
    Json(table.house_stats().await)
}

/// GET /api/shoe
pub async fn get_shoe(State(table): State<AppState>) -> ApiResult<ShoeSnapshot> {
    Ok(Json(table.shoe_snapshot().await?))
}

/// GET /api/history
pub async fn get_history(State(table): State<AppState>) -> Json<LedgerView> {
    Json(table.ledger_view().await)
}

/// GET /api/results?n=
pub async fn get_results(
    State(table): State<AppState>,
    Query(query): Query<ResultsQuery>,
) -> Json<Vec<Color>> {
    Json(table.last_results(query.n.unwrap_or(DEFAULT_RESULTS)).await)
}

/// GET /api/auto-bet
pub async fn get_auto_bet(State(table): State<AppState>) -> Json<AutoBetStatus> {
    Json(table.auto_bet_status())
}

/// POST /api/color
pub async fn select_color(
    State(table): State<AppState>,
    Json(req): Json<ColorRequest>,
) -> ApiResult<PlayerStats> {
    table.select_color(req.color).await?;
    Ok(Json(table.player_stats().await))
}

/// POST /api/stake
pub async fn set_stake(
    State(table): State<AppState>,
    Json(req): Json<StakeRequest>,
) -> ApiResult<StakeResponse> {
    let stake = table.set_stake(req.amount).await?;
    Ok(Json(StakeResponse { stake }))
}

/// POST /api/deck
pub async fn set_deck(
    State(table): State<AppState>,
    Json(req): Json<DeckRequest>,
) -> ApiResult<ShoeSnapshot> {
    let deck_count = match req.decks {
        DeckSelector::Count(n) => DeckCount::new(n)?,
        DeckSelector::Name(name) => name
            .parse()
            .map_err(|e: anyhow::Error| ApiError::BadRequest(e.to_string()))?,
    };
    table.set_deck_count(deck_count).await?;
    get_shoe(State(table)).await
}

/// POST /api/bet?multiplier=
pub async fn confirm_bet(
    State(table): State<AppState>,
    Query(query): Query<BetQuery>,
) -> ApiResult<RoundResult> {
    let result = match query.multiplier {
        Some(m) => table.confirm_bet_with_multiplier(m).await?,
        None => table.confirm_bet().await?,
    };
    Ok(Json(result))
}

/// POST /api/auto-bet/start
///
/// Returns once the run is accepted. A round failure that halts it later
/// is reported in `last_run` by `GET /api/auto-bet`.
pub async fn start_auto_bet(
    State(table): State<AppState>,
    Json(req): Json<AutoBetRequest>,
) -> Result<(StatusCode, Json<AutoBetStatus>), ApiError> {
    drop(table.start_auto_bet(req.stake, req.rounds).await?);
    Ok((StatusCode::ACCEPTED, Json(table.auto_bet_status())))
}

/// POST /api/auto-bet/stop
pub async fn stop_auto_bet(State(table): State<AppState>) -> Json<AutoBetStatus> {
    table.stop_auto_bet();
    Json(table.auto_bet_status())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
