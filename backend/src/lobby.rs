//! In-memory game lobby
//!
//! Owns every [`Game`] record behind a single mutex. Mutations come from two
//! directions: the event poller (creation and join events observed on chain)
//! and authenticated move submissions. All reads hand out clones; the lock is
//! held only for the brief map operation and never across I/O.

use std::collections::HashMap;
use std::sync::Mutex;

use chess_engine::types::{PieceType, Square};
use chess_engine::{ChessState, GameStatus, MoveError, MoveRecord};
use chrono::Utc;
use ethers::types::{Address, H256, U256};
use thiserror::Error;
use tracing::{info, warn};

use crate::game::{EscrowInfo, Game, GameState, GameStats, NetworkType};
use crate::settle::SettlementRequest;

/// A `GameCreated` event, enriched with the opponent looked up from the
/// contract (the event itself does not carry it)
#[derive(Debug, Clone)]
pub struct GameCreation {
    pub game_id: String,
    pub creator: Address,
    pub opponent: Option<Address>,
    pub wager: U256,
    pub chain_id: u64,
    pub contract_address: Address,
    pub tx_hash: H256,
    pub block_number: u64,
}

/// A `GameJoined` event
#[derive(Debug, Clone)]
pub struct GameJoin {
    pub game_id: String,
    pub joiner: Address,
    pub wager: U256,
}

/// Errors from lobby operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LobbyError {
    #[error("game {0} not found")]
    NotFound(String),

    #[error("game {game_id} is {state:?}; operation requires a started game")]
    IllegalState { game_id: String, state: GameState },

    #[error("caller is not a participant in this game")]
    NotParticipant,

    #[error("it is not the caller's turn")]
    NotYourTurn,

    #[error(transparent)]
    Move(#[from] MoveError),
}

/// Result of an accepted move: the record, a snapshot of the updated game,
/// and the settlement to enqueue if the move delivered checkmate
#[derive(Debug, Clone)]
pub struct MoveApplied {
    pub record: MoveRecord,
    pub game: Game,
    pub settlement: Option<SettlementRequest>,
}

#[derive(Default)]
pub struct Lobby {
    games: Mutex<HashMap<String, Game>>,
}

impl Lobby {
    pub fn new() -> Lobby {
        Lobby::default()
    }

    /// Materialize a game from its creation event. Idempotent: a gameId that
    /// already exists is left untouched, so event redelivery is harmless.
    ///
    /// Returns `true` when a new record was inserted.
    pub fn upsert_from_creation(&self, evt: GameCreation) -> bool {
        let mut games = self.lock();

        if games.contains_key(&evt.game_id) {
            return false;
        }

        // A creator naming themselves is treated as an open game
        let opponent = evt.opponent.filter(|&addr| addr != evt.creator);

        let game = Game {
            id: evt.game_id.clone(),
            owner: evt.creator,
            opponent,
            wager: evt.wager,
            network_type: NetworkType::Evm,
            chain_id: Some(evt.chain_id),
            state: GameState::Waiting,
            created_at: Utc::now(),
            started_at: None,
            settled_at: None,
            chess_state: None,
            winner: None,
            escrow: Some(EscrowInfo {
                contract_address: evt.contract_address,
                creation_tx_hash: evt.tx_hash,
                creation_block: evt.block_number,
                settlement_tx_hash: None,
            }),
        };

        info!(
            game_id = %game.id,
            owner = %game.owner,
            open = game.opponent.is_none(),
            wager = %game.wager,
            "game created from escrow event"
        );
        games.insert(evt.game_id, game);
        true
    }

    /// Start a game from its join event. Idempotent: a game already past the
    /// joinable states is left untouched.
    ///
    /// Returns `true` when the game transitioned to `Started`.
    pub fn apply_join(&self, evt: GameJoin) -> bool {
        let mut games = self.lock();

        let Some(game) = games.get_mut(&evt.game_id) else {
            warn!(game_id = %evt.game_id, "join event for unknown game");
            return false;
        };

        if !game.state.joinable() {
            return false;
        }

        if evt.joiner == game.owner {
            warn!(game_id = %game.id, "creator cannot join their own game");
            return false;
        }

        game.opponent = Some(evt.joiner);
        game.state = GameState::Started;
        game.started_at = Some(Utc::now());
        game.chess_state = Some(chess_engine::initial_position());

        info!(
            game_id = %game.id,
            joiner = %evt.joiner,
            "game joined; chess game started"
        );
        true
    }

    pub fn get(&self, id: &str) -> Option<Game> {
        self.lock().get(id).cloned()
    }

    /// Full listing with optional field filters, each ANDed together
    pub fn list_filtered(
        &self,
        state: Option<GameState>,
        owner: Option<Address>,
        opponent: Option<Address>,
    ) -> Vec<Game> {
        self.collect(|g| {
            state.is_none_or(|s| g.state == s)
                && owner.is_none_or(|a| g.owner == a)
                && opponent.is_none_or(|a| g.opponent == Some(a))
        })
    }

    pub fn list_by_owner(&self, addr: Address) -> Vec<Game> {
        self.collect(|g| g.owner == addr)
    }

    pub fn list_by_opponent(&self, addr: Address) -> Vec<Game> {
        self.collect(|g| g.opponent == Some(addr))
    }

    /// Waiting games with no named opponent, excluding ones the caller owns
    pub fn list_open(&self, exclude: Option<Address>) -> Vec<Game> {
        self.collect(|g| g.is_open() && exclude.is_none_or(|a| g.owner != a))
    }

    /// Waiting games naming `addr` as the invited opponent
    pub fn list_invitations(&self, addr: Address) -> Vec<Game> {
        self.collect(|g| g.state == GameState::Waiting && g.opponent == Some(addr))
    }

    /// Started games `addr` plays in
    pub fn list_active(&self, addr: Address) -> Vec<Game> {
        self.collect(|g| g.state == GameState::Started && g.is_participant(addr))
    }

    /// Settled games `addr` played in
    pub fn list_settled(&self, addr: Address) -> Vec<Game> {
        self.collect(|g| g.state == GameState::Settled && g.is_participant(addr))
    }

    pub fn stats(&self) -> GameStats {
        let games = self.lock();
        let mut stats = GameStats {
            total: games.len(),
            ..GameStats::default()
        };
        for game in games.values() {
            match game.state {
                GameState::Created => stats.created += 1,
                GameState::Waiting => stats.waiting += 1,
                GameState::Started => stats.started += 1,
                GameState::Settled => stats.settled += 1,
            }
        }
        stats
    }

    /// Legal destinations for the caller's piece. The caller must be a
    /// participant of a started game and it must be their turn.
    pub fn valid_moves(
        &self,
        id: &str,
        from: Square,
        caller: Address,
    ) -> Result<Vec<Square>, LobbyError> {
        let games = self.lock();
        let game = games.get(id).ok_or_else(|| LobbyError::NotFound(id.into()))?;
        let chess = Self::authorize_turn(game, caller)?;
        Ok(chess_engine::valid_moves(chess, from))
    }

    /// Check the game is started, the caller plays in it, and it is the
    /// caller's turn; hand back the live position
    fn authorize_turn(game: &Game, caller: Address) -> Result<&ChessState, LobbyError> {
        if game.state != GameState::Started {
            return Err(LobbyError::IllegalState {
                game_id: game.id.clone(),
                state: game.state,
            });
        }
        let color = game.color_of(caller).ok_or(LobbyError::NotParticipant)?;

        // Started implies the chess state is present
        let chess = game.chess_state.as_ref().ok_or(LobbyError::IllegalState {
            game_id: game.id.clone(),
            state: game.state,
        })?;
        if chess.current_player != color {
            return Err(LobbyError::NotYourTurn);
        }
        Ok(chess)
    }

    /// Apply the caller's move. On checkmate the game settles with a winner
    /// and a settlement request is returned for the caller to enqueue; on
    /// stalemate it settles with neither.
    pub fn make_move(
        &self,
        id: &str,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
        caller: Address,
    ) -> Result<MoveApplied, LobbyError> {
        let mut games = self.lock();
        let game = games
            .get_mut(id)
            .ok_or_else(|| LobbyError::NotFound(id.into()))?;

        let outcome = {
            let chess = Self::authorize_turn(game, caller)?;
            chess_engine::make_move(chess, from, to, promotion)?
        };
        let status = outcome.state.game_status;
        let engine_winner = outcome.state.winner;
        game.chess_state = Some(outcome.state);

        let mut settlement = None;
        match status {
            GameStatus::Checkmate => {
                game.state = GameState::Settled;
                game.winner = engine_winner;
                game.settled_at = Some(Utc::now());

                match (game.winner_address(), game.chain_id) {
                    (Some(winner), Some(chain_id)) => {
                        settlement = Some(SettlementRequest {
                            game_id: game.id.clone(),
                            winner,
                            chain_id,
                        });
                        info!(
                            game_id = %game.id,
                            winner = %winner,
                            "checkmate; settlement queued"
                        );
                    }
                    _ => warn!(
                        game_id = %game.id,
                        "checkmate but no settlement target; skipping payout"
                    ),
                }
            }
            GameStatus::Stalemate => {
                game.state = GameState::Settled;
                game.settled_at = Some(Utc::now());
                info!(game_id = %game.id, "stalemate; game settled with no winner");
            }
            _ => {}
        }

        Ok(MoveApplied {
            record: outcome.record,
            game: game.clone(),
            settlement,
        })
    }

    /// Record the settlement transaction hash once the payout confirmed
    pub fn record_settlement_tx(&self, id: &str, tx_hash: H256) {
        let mut games = self.lock();
        match games.get_mut(id).and_then(|g| g.escrow.as_mut()) {
            Some(escrow) => escrow.settlement_tx_hash = Some(tx_hash),
            None => warn!(game_id = %id, "settlement receipt for unknown game"),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Game>> {
        // A poisoned lobby lock means a panic mid-mutation; propagate it
        self.games.lock().expect("lobby mutex poisoned")
    }

    fn collect(&self, predicate: impl Fn(&Game) -> bool) -> Vec<Game> {
        self.lock()
            .values()
            .filter(|g| predicate(g))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_engine::types::{CastlingRights, Piece, PieceColor, SideCastling};

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn creation(game_id: &str, opponent: Option<Address>) -> GameCreation {
        GameCreation {
            game_id: game_id.into(),
            creator: addr(0xaa),
            opponent,
            wager: U256::exp10(16),
            chain_id: 11155111,
            contract_address: addr(0xee),
            tx_hash: H256::from_low_u64_be(1),
            block_number: 100,
        }
    }

    fn join(game_id: &str) -> GameJoin {
        GameJoin {
            game_id: game_id.into(),
            joiner: addr(0xbb),
            wager: U256::exp10(16),
        }
    }

    fn started_lobby() -> Lobby {
        let lobby = Lobby::new();
        assert!(lobby.upsert_from_creation(creation("g1", None)));
        assert!(lobby.apply_join(join("g1")));
        lobby
    }

    fn sq(row: u8, col: u8) -> Square {
        Square::new(row, col)
    }

    #[test]
    fn creation_is_idempotent() {
        let lobby = Lobby::new();

        assert!(lobby.upsert_from_creation(creation("g1", None)));
        let first = lobby.get("g1").expect("game exists");

        assert!(
            !lobby.upsert_from_creation(creation("g1", Some(addr(0xcc)))),
            "redelivery must not reinsert"
        );
        let second = lobby.get("g1").expect("game still exists");
        assert_eq!(first, second, "redelivery must not change the record");
    }

    #[test]
    fn join_starts_the_game_once() {
        let lobby = Lobby::new();
        lobby.upsert_from_creation(creation("g1", None));

        assert!(lobby.apply_join(join("g1")));
        let started = lobby.get("g1").expect("game exists");
        assert_eq!(started.state, GameState::Started);
        assert_eq!(started.opponent, Some(addr(0xbb)));
        assert!(started.started_at.is_some());
        assert!(started.chess_state.is_some(), "join installs the position");

        assert!(!lobby.apply_join(join("g1")), "second join is a no-op");
        assert_eq!(lobby.get("g1").expect("game exists"), started);
    }

    #[test]
    fn join_for_unknown_game_is_ignored() {
        let lobby = Lobby::new();
        assert!(!lobby.apply_join(join("missing")));
    }

    #[test]
    fn owner_and_opponent_are_never_the_same_address() {
        let lobby = Lobby::new();

        // Self-invitation degrades to an open game
        lobby.upsert_from_creation(creation("g1", Some(addr(0xaa))));
        assert!(lobby.get("g1").expect("game exists").opponent.is_none());

        // Self-join is ignored
        assert!(!lobby.apply_join(GameJoin {
            game_id: "g1".into(),
            joiner: addr(0xaa),
            wager: U256::exp10(16),
        }));
        assert_eq!(
            lobby.get("g1").expect("game exists").state,
            GameState::Waiting
        );
    }

    #[test]
    fn listings_partition_by_state_and_address() {
        let lobby = Lobby::new();
        lobby.upsert_from_creation(creation("open", None));
        lobby.upsert_from_creation(creation("invite", Some(addr(0xbb))));
        lobby.upsert_from_creation(creation("running", None));
        lobby.apply_join(join("running"));

        let open = lobby.list_open(None);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "open");
        assert!(
            lobby.list_open(Some(addr(0xaa))).is_empty(),
            "owner is excluded from their own open games"
        );

        let invites = lobby.list_invitations(addr(0xbb));
        assert_eq!(invites.len(), 1);
        assert_eq!(invites[0].id, "invite");

        let active = lobby.list_active(addr(0xbb));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "running");
        assert!(lobby.list_active(addr(0xcc)).is_empty());

        assert_eq!(lobby.list_by_owner(addr(0xaa)).len(), 3);
        assert_eq!(
            lobby
                .list_filtered(Some(GameState::Waiting), None, None)
                .len(),
            2
        );

        let stats = lobby.stats();
        assert_eq!(stats.waiting, 2);
        assert_eq!(stats.started, 1);
        assert_eq!(stats.total, 3);
    }

    #[test]
    fn moves_require_participant_and_turn() {
        let lobby = started_lobby();

        assert_eq!(
            lobby.valid_moves("g1", sq(6, 4), addr(0xcc)).unwrap_err(),
            LobbyError::NotParticipant
        );
        assert_eq!(
            lobby
                .make_move("g1", sq(6, 4), sq(4, 4), None, addr(0xcc))
                .unwrap_err(),
            LobbyError::NotParticipant
        );

        // Black (the joiner) cannot move first
        assert_eq!(
            lobby
                .make_move("g1", sq(1, 4), sq(3, 4), None, addr(0xbb))
                .unwrap_err(),
            LobbyError::NotYourTurn
        );

        // Nothing mutated by the rejections
        let game = lobby.get("g1").expect("game exists");
        let chess = game.chess_state.expect("chess state present");
        assert!(chess.move_history.is_empty());
        assert_eq!(chess.current_player, PieceColor::White);
    }

    #[test]
    fn moves_rejected_before_start_and_for_missing_games() {
        let lobby = Lobby::new();
        lobby.upsert_from_creation(creation("g1", None));

        assert!(matches!(
            lobby.make_move("g1", sq(6, 4), sq(4, 4), None, addr(0xaa)),
            Err(LobbyError::IllegalState { .. })
        ));
        assert!(matches!(
            lobby.make_move("nope", sq(6, 4), sq(4, 4), None, addr(0xaa)),
            Err(LobbyError::NotFound(_))
        ));
    }

    #[test]
    fn illegal_engine_moves_surface_and_mutate_nothing() {
        let lobby = started_lobby();

        assert!(matches!(
            lobby.make_move("g1", sq(6, 4), sq(3, 4), None, addr(0xaa)),
            Err(LobbyError::Move(MoveError::IllegalMove { .. }))
        ));
        let game = lobby.get("g1").expect("game exists");
        assert!(game.chess_state.expect("chess state").move_history.is_empty());
    }

    #[test]
    fn accepted_moves_alternate_turns() {
        let lobby = started_lobby();

        let applied = lobby
            .make_move("g1", sq(6, 4), sq(4, 4), None, addr(0xaa))
            .expect("e4 is legal");
        assert_eq!(applied.game.state, GameState::Started);
        assert!(applied.settlement.is_none());

        let applied = lobby
            .make_move("g1", sq(1, 4), sq(3, 4), None, addr(0xbb))
            .expect("e5 is legal");
        assert_eq!(
            applied
                .game
                .chess_state
                .expect("chess state")
                .move_history
                .len(),
            2
        );
    }

    #[test]
    fn checkmate_settles_with_winner_and_settlement_request() {
        let lobby = started_lobby();
        let white = addr(0xaa);
        let black = addr(0xbb);

        // Fool's mate: Black wins on move four
        lobby
            .make_move("g1", sq(6, 5), sq(5, 5), None, white)
            .expect("f3");
        lobby
            .make_move("g1", sq(1, 4), sq(3, 4), None, black)
            .expect("e5");
        lobby
            .make_move("g1", sq(6, 6), sq(4, 6), None, white)
            .expect("g4");
        let applied = lobby
            .make_move("g1", sq(0, 3), sq(4, 7), None, black)
            .expect("Qh4#");

        assert_eq!(applied.game.state, GameState::Settled);
        assert_eq!(applied.game.winner, Some(PieceColor::Black));
        assert!(applied.game.settled_at.is_some());

        let settlement = applied.settlement.expect("checkmate queues settlement");
        assert_eq!(settlement.game_id, "g1");
        assert_eq!(settlement.winner, black, "pot goes to the opponent");
        assert_eq!(settlement.chain_id, 11155111);

        // The settled game rejects further moves
        assert!(matches!(
            lobby.make_move("g1", sq(6, 0), sq(5, 0), None, white),
            Err(LobbyError::IllegalState { .. })
        ));
    }

    #[test]
    fn stalemate_settles_without_winner_or_settlement() {
        let lobby = started_lobby();

        // Rewrite the position to a queen-corner stalemate, White to move
        {
            let mut games = lobby.games.lock().expect("lobby mutex");
            let chess = games
                .get_mut("g1")
                .and_then(|g| g.chess_state.as_mut())
                .expect("started game has chess state");
            chess.board = Default::default();
            chess.castling_rights = CastlingRights {
                white: SideCastling::none(),
                black: SideCastling::none(),
            };
            chess.set_piece(sq(0, 0), Some(Piece::new(PieceType::King, PieceColor::Black)));
            chess.set_piece(sq(2, 1), Some(Piece::new(PieceType::King, PieceColor::White)));
            chess.set_piece(sq(1, 5), Some(Piece::new(PieceType::Queen, PieceColor::White)));
        }

        let applied = lobby
            .make_move("g1", sq(1, 5), sq(1, 2), None, addr(0xaa))
            .expect("Qc7 is legal");

        assert_eq!(applied.game.state, GameState::Settled);
        assert_eq!(applied.game.winner, None, "stalemate crowns no winner");
        assert!(
            applied.settlement.is_none(),
            "stalemate must not trigger a payout"
        );
    }

    #[test]
    fn settlement_tx_hash_is_recorded() {
        let lobby = started_lobby();
        let hash = H256::from_low_u64_be(0xdead);

        lobby.record_settlement_tx("g1", hash);
        let escrow = lobby.get("g1").and_then(|g| g.escrow).expect("escrow info");
        assert_eq!(escrow.settlement_tx_hash, Some(hash));
    }
}
