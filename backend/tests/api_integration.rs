//! HTTP API integration tests
//!
//! Drive the real router through `Router::oneshot` with a stub token
//! verifier and no chain behind the state. Games are seeded through the
//! lobby exactly as the event poller would.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ethers::types::{Address, H256, U256};
use serde_json::{json, Value};
use tower::ServiceExt;

use backend::api::{self, AppState};
use backend::auth::{AuthError, LinkedWallet, TokenVerifier, VerifiedUser};
use backend::chain::BlockchainClient;
use backend::lobby::{GameCreation, GameJoin, Lobby};
use backend::poller::PollerStatus;
use backend::settle::{SettlementExecutor, SettlementRequest, Settler};

const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

const WHITE: &str = "0x00000000000000000000000000000000000000aa";
const BLACK: &str = "0x00000000000000000000000000000000000000bb";

/// Fixed token → wallet mapping standing in for the identity provider
struct StubVerifier;

#[async_trait]
impl TokenVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedUser, AuthError> {
        let wallet = |address: &str| VerifiedUser {
            user_id: format!("did:test:{token}"),
            wallets: vec![LinkedWallet {
                address: address.to_string(),
                chain_type: "ethereum".to_string(),
            }],
        };
        match token {
            "white-token" => Ok(wallet(WHITE)),
            "black-token" => Ok(wallet(BLACK)),
            "stranger-token" => Ok(wallet("0x00000000000000000000000000000000000000cc")),
            "no-wallet-token" => Ok(VerifiedUser {
                user_id: "did:test:no-wallet".to_string(),
                wallets: Vec::new(),
            }),
            _ => Err(AuthError::InvalidToken("unknown test token".to_string())),
        }
    }
}

/// Executor that always succeeds; settlement is covered in game_flow tests
struct NullExecutor;

#[async_trait]
impl SettlementExecutor for NullExecutor {
    async fn settle(&self, _request: &SettlementRequest) -> anyhow::Result<H256> {
        Ok(H256::zero())
    }
}

fn test_state() -> (AppState, Arc<Lobby>) {
    let lobby = Arc::new(Lobby::new());
    let chain = Arc::new(
        BlockchainClient::new(TEST_MNEMONIC, HashMap::new()).expect("wallet derives"),
    );
    let settler = Settler::spawn(Arc::new(NullExecutor), lobby.clone());

    let state = AppState {
        lobby: lobby.clone(),
        verifier: Arc::new(StubVerifier),
        settler,
        chain,
        poller_status: Arc::new(PollerStatus::default()),
    };
    (state, lobby)
}

fn test_router() -> (Router, Arc<Lobby>) {
    let (state, lobby) = test_state();
    (api::router(state), lobby)
}

fn addr(raw: &str) -> Address {
    raw.parse().expect("valid test address")
}

fn seed_waiting(lobby: &Lobby, game_id: &str, opponent: Option<Address>) {
    lobby.upsert_from_creation(GameCreation {
        game_id: game_id.to_string(),
        creator: addr(WHITE),
        opponent,
        wager: U256::exp10(16),
        chain_id: 11155111,
        contract_address: addr("0x00000000000000000000000000000000000000ee"),
        tx_hash: H256::from_low_u64_be(1),
        block_number: 100,
    });
}

fn seed_started(lobby: &Lobby, game_id: &str) {
    seed_waiting(lobby, game_id, None);
    lobby.apply_join(GameJoin {
        game_id: game_id.to_string(),
        joiner: addr(BLACK),
        wager: U256::exp10(16),
    });
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn get_authed(app: Router, uri: &str, token: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_reports_poller_and_chains() {
    let (app, _lobby) = test_router();

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["poller"]["running"], false);
    assert!(body["chains"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn list_games_starts_empty_and_fills() {
    let (app, lobby) = test_router();

    let (status, body) = get(app.clone(), "/api/games").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    seed_waiting(&lobby, "g1", None);
    let (_, body) = get(app.clone(), "/api/games").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], "g1");
    assert_eq!(body["data"][0]["state"], "WAITING");
    assert_eq!(body["data"][0]["wager"], "10000000000000000");

    // State filter
    let (_, body) = get(app.clone(), "/api/games?state=SETTLED").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, body) = get(app, "/api/games?state=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn open_games_exclude_the_owner() {
    let (app, lobby) = test_router();
    seed_waiting(&lobby, "open-1", None);
    seed_waiting(&lobby, "invite-1", Some(addr(BLACK)));

    let (_, body) = get(app.clone(), "/api/games/open").await;
    let games = body["data"].as_array().unwrap();
    assert_eq!(games.len(), 1, "invitations are not open games");
    assert_eq!(games[0]["id"], "open-1");

    let (_, body) = get(
        app.clone(),
        &format!("/api/games/open?excludeUser={WHITE}"),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, _) = get(app, "/api/games/open?excludeUser=junk").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invitations_and_active_and_settled_listings() {
    let (app, lobby) = test_router();
    seed_waiting(&lobby, "invite-1", Some(addr(BLACK)));
    seed_started(&lobby, "running-1");

    let (_, body) = get(
        app.clone(),
        &format!("/api/games/invitations?user={BLACK}"),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], "invite-1");

    let (_, body) = get(app.clone(), &format!("/api/games/active?user={BLACK}")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], "running-1");

    let (_, body) = get(
        app.clone(),
        &format!("/api/games/settled?userAddress={BLACK}"),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // The user parameter is required
    let (status, body) = get(app, "/api/games/active").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn stats_count_per_state() {
    let (app, lobby) = test_router();
    seed_waiting(&lobby, "w1", None);
    seed_waiting(&lobby, "w2", None);
    seed_started(&lobby, "s1");

    let (status, body) = get(app, "/api/games/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["waiting"], 2);
    assert_eq!(body["data"]["started"], 1);
    assert_eq!(body["data"]["total"], 3);
}

#[tokio::test]
async fn unknown_game_is_a_404_envelope() {
    let (app, _lobby) = test_router();

    let (status, body) = get(app, "/api/games/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn chess_state_is_404_until_started() {
    let (app, lobby) = test_router();
    seed_waiting(&lobby, "g1", None);

    let (status, _) = get(app.clone(), "/api/games/g1/chess").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    lobby.apply_join(GameJoin {
        game_id: "g1".to_string(),
        joiner: addr(BLACK),
        wager: U256::exp10(16),
    });

    let (status, body) = get(app, "/api/games/g1/chess").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currentPlayer"], "white");
    assert_eq!(body["data"]["fullMoveNumber"], 1);
}

#[tokio::test]
async fn valid_moves_require_authentication() {
    let (app, lobby) = test_router();
    seed_started(&lobby, "g1");

    let (status, _) = get(app.clone(), "/api/games/g1/chess/valid-moves/6/4").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "no token");

    let (status, _) = get_authed(
        app.clone(),
        "/api/games/g1/chess/valid-moves/6/4",
        "bogus-token",
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "unknown token");

    let (status, body) = get_authed(
        app,
        "/api/games/g1/chess/valid-moves/6/4",
        "no-wallet-token",
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "token without a wallet");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn valid_moves_enforce_participant_turn_and_bounds() {
    let (app, lobby) = test_router();
    seed_started(&lobby, "g1");

    let (status, body) = get_authed(
        app.clone(),
        "/api/games/g1/chess/valid-moves/6/4",
        "white-token",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let moves = body["data"].as_array().unwrap();
    assert_eq!(moves.len(), 2, "e2 pawn has two pushes");

    let (status, _) = get_authed(
        app.clone(),
        "/api/games/g1/chess/valid-moves/1/4",
        "black-token",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "not Black's turn");

    let (status, _) = get_authed(
        app.clone(),
        "/api/games/g1/chess/valid-moves/6/4",
        "stranger-token",
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "not a participant");

    let (status, _) = get_authed(
        app,
        "/api/games/g1/chess/valid-moves/6/9",
        "white-token",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "coordinate out of range");
}

#[tokio::test]
async fn move_submission_applies_and_rejects() {
    let (app, lobby) = test_router();
    seed_started(&lobby, "g1");

    // Black may not open
    let (status, _) = post_move(app.clone(), "g1", "black-token", (1, 4), (3, 4)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // White plays e4
    let (status, body) = post_move(app.clone(), "g1", "white-token", (6, 4), (4, 4)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["move"]["from"]["row"], 6);
    assert_eq!(body["move"]["to"]["row"], 4);
    assert_eq!(body["gameState"]["state"], "STARTED");
    assert_eq!(
        body["gameState"]["chessState"]["currentPlayer"], "black",
        "turn passed to Black"
    );

    // An illegal reply is rejected and mutates nothing
    let (status, _) = post_move(app.clone(), "g1", "black-token", (1, 4), (4, 4)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let history_len = lobby
        .get("g1")
        .and_then(|g| g.chess_state)
        .map(|c| c.move_history.len())
        .unwrap();
    assert_eq!(history_len, 1);
}

async fn post_move(
    app: Router,
    game_id: &str,
    token: &str,
    from: (u8, u8),
    to: (u8, u8),
) -> (StatusCode, Value) {
    let body = json!({
        "from": {"row": from.0, "col": from.1},
        "to": {"row": to.0, "col": to.1},
    });
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/games/{game_id}/chess/move"))
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}
