//! HTTP surface
//!
//! Thin adapter over the lobby: validate shapes, delegate, serialize.
//! Reads are public; the two chess endpoints sit behind the wallet gate.
//! Resource responses use the `{success, data}` envelope; the move endpoint
//! returns `{success, move, gameState}`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use chess_engine::types::{PieceType, Square};
use chess_engine::MoveRecord;
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthedPlayer, TokenVerifier};
use crate::chain::BlockchainClient;
use crate::error::ApiError;
use crate::game::{Game, GameState, GameStats};
use crate::lobby::Lobby;
use crate::poller::{PollerSnapshot, PollerStatus};
use crate::settle::Settler;

#[derive(Clone)]
pub struct AppState {
    pub lobby: Arc<Lobby>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub settler: Settler,
    pub chain: Arc<BlockchainClient>,
    pub poller_status: Arc<PollerStatus>,
}

pub fn router(state: AppState) -> Router {
    let authed = Router::new()
        .route(
            "/api/games/{id}/chess/valid-moves/{row}/{col}",
            get(chess_valid_moves),
        )
        .route("/api/games/{id}/chess/move", post(chess_move))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_wallet,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/api/games", get(list_games))
        .route("/api/games/open", get(list_open))
        .route("/api/games/active", get(list_active))
        .route("/api/games/invitations", get(list_invitations))
        .route("/api/games/settled", get(list_settled))
        .route("/api/games/stats", get(game_stats))
        .route("/api/games/{id}", get(get_game))
        .route("/api/games/{id}/chess", get(get_chess_state))
        .merge(authed)
        .with_state(state)
}

/// Standard envelope for resource reads
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<ApiResponse<T>> {
        Json(ApiResponse {
            success: true,
            data,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    chains: HashMap<u64, bool>,
    poller: PollerSnapshot,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        chains: state.chain.validate_connectivity().await,
        poller: state.poller_status.snapshot(),
    })
}

#[derive(Deserialize)]
struct GamesQuery {
    state: Option<String>,
    owner: Option<String>,
    opponent: Option<String>,
}

async fn list_games(
    State(state): State<AppState>,
    Query(query): Query<GamesQuery>,
) -> Result<Json<ApiResponse<Vec<Game>>>, ApiError> {
    let state_filter = query.state.as_deref().map(parse_state).transpose()?;
    let owner = parse_optional_address(query.owner.as_deref(), "owner")?;
    let opponent = parse_optional_address(query.opponent.as_deref(), "opponent")?;

    Ok(ApiResponse::ok(state.lobby.list_filtered(
        state_filter,
        owner,
        opponent,
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenQuery {
    exclude_user: Option<String>,
}

async fn list_open(
    State(state): State<AppState>,
    Query(query): Query<OpenQuery>,
) -> Result<Json<ApiResponse<Vec<Game>>>, ApiError> {
    let exclude = parse_optional_address(query.exclude_user.as_deref(), "excludeUser")?;
    Ok(ApiResponse::ok(state.lobby.list_open(exclude)))
}

#[derive(Deserialize)]
struct UserQuery {
    user: Option<String>,
}

async fn list_active(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Vec<Game>>>, ApiError> {
    let user = require_address(query.user.as_deref(), "user")?;
    Ok(ApiResponse::ok(state.lobby.list_active(user)))
}

async fn list_invitations(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Vec<Game>>>, ApiError> {
    let user = require_address(query.user.as_deref(), "user")?;
    Ok(ApiResponse::ok(state.lobby.list_invitations(user)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettledQuery {
    user_address: Option<String>,
}

async fn list_settled(
    State(state): State<AppState>,
    Query(query): Query<SettledQuery>,
) -> Result<Json<ApiResponse<Vec<Game>>>, ApiError> {
    let user = require_address(query.user_address.as_deref(), "userAddress")?;
    Ok(ApiResponse::ok(state.lobby.list_settled(user)))
}

async fn game_stats(State(state): State<AppState>) -> Json<ApiResponse<GameStats>> {
    ApiResponse::ok(state.lobby.stats())
}

async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Game>>, ApiError> {
    let game = state
        .lobby
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("game {id} not found")))?;
    Ok(ApiResponse::ok(game))
}

async fn get_chess_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<chess_engine::ChessState>>, ApiError> {
    let game = state
        .lobby
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("game {id} not found")))?;
    let chess = game
        .chess_state
        .ok_or_else(|| ApiError::NotFound(format!("game {id} has not started")))?;
    Ok(ApiResponse::ok(chess))
}

async fn chess_valid_moves(
    State(state): State<AppState>,
    Path((id, row, col)): Path<(String, u8, u8)>,
    Extension(player): Extension<AuthedPlayer>,
) -> Result<Json<ApiResponse<Vec<Square>>>, ApiError> {
    let from = board_square(row, col)?;
    let moves = state
        .lobby
        .valid_moves(&id, from, player.wallet_address)?;
    Ok(ApiResponse::ok(moves))
}

#[derive(Deserialize)]
struct Coordinate {
    row: u8,
    col: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest {
    from: Coordinate,
    to: Coordinate,
    promotion_piece: Option<PieceType>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveResponse {
    success: bool,
    #[serde(rename = "move")]
    move_record: MoveRecord,
    game_state: Game,
}

async fn chess_move(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(player): Extension<AuthedPlayer>,
    Json(body): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, ApiError> {
    let from = board_square(body.from.row, body.from.col)?;
    let to = board_square(body.to.row, body.to.col)?;

    let applied = state.lobby.make_move(
        &id,
        from,
        to,
        body.promotion_piece,
        player.wallet_address,
    )?;

    // Settlement is asynchronous; the winning move's response never waits
    // on the chain.
    if let Some(request) = applied.settlement {
        state.settler.submit(request);
    }

    Ok(Json(MoveResponse {
        success: true,
        move_record: applied.record,
        game_state: applied.game,
    }))
}

fn board_square(row: u8, col: u8) -> Result<Square, ApiError> {
    if row > 7 || col > 7 {
        return Err(ApiError::Validation(format!(
            "coordinate ({row}, {col}) is outside the board"
        )));
    }
    Ok(Square::new(row, col))
}

fn parse_state(raw: &str) -> Result<GameState, ApiError> {
    match raw {
        "CREATED" => Ok(GameState::Created),
        "WAITING" => Ok(GameState::Waiting),
        "STARTED" => Ok(GameState::Started),
        "SETTLED" => Ok(GameState::Settled),
        other => Err(ApiError::Validation(format!("unknown game state {other:?}"))),
    }
}

fn parse_address(raw: &str, field: &str) -> Result<Address, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("{field} is not a valid address: {raw:?}")))
}

fn parse_optional_address(raw: Option<&str>, field: &str) -> Result<Option<Address>, ApiError> {
    raw.map(|value| parse_address(value, field)).transpose()
}

fn require_address(raw: Option<&str>, field: &str) -> Result<Address, ApiError> {
    let value = raw.ok_or_else(|| ApiError::Validation(format!("query parameter {field} is required")))?;
    parse_address(value, field)
}
