//! Chess rule engine
//!
//! Pure, deterministic move generation, legality checking and terminal
//! detection over a serializable [`ChessState`]. The engine adjudicates; it
//! does not search or evaluate. All operations take the state by reference
//! and return fresh values, so callers can keep snapshots freely.
//!
//! Coordinate convention: row 0 is Black's back rank, row 7 is White's back
//! rank, and White moves toward decreasing rows.

pub mod api;
pub mod board;
pub mod error;
pub mod move_gen;
pub mod types;

pub use api::{initial_position, make_move, valid_moves, MoveOutcome};
pub use error::{MoveError, MoveResult};
pub use types::{
    CapturedPieces, CastlingRights, ChessState, GameStatus, MoveRecord, Piece, PieceColor,
    PieceType, SideCastling, Square,
};
