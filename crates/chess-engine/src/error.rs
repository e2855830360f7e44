//! Error types for move validation and execution

use crate::types::{PieceType, Square};
use thiserror::Error;

/// Errors that can occur when applying a move
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// No piece on the source square
    #[error("no piece at ({row}, {col})", row = .0.row, col = .0.col)]
    EmptySquare(Square),

    /// Piece on the source square belongs to the opponent
    #[error("piece at ({row}, {col}) does not belong to the player to move", row = .0.row, col = .0.col)]
    WrongColor(Square),

    /// Destination is not reachable under the rules
    #[error("illegal move from ({}, {}) to ({}, {})", from.row, from.col, to.row, to.col)]
    IllegalMove { from: Square, to: Square },

    /// A move may never capture a king
    #[error("move would capture a king")]
    KingCapture,

    /// Pawns promote to queen, rook, bishop or knight only
    #[error("invalid promotion piece {0:?}")]
    InvalidPromotion(PieceType),

    /// Position is already checkmate, stalemate or drawn
    #[error("game is already over")]
    GameOver,
}

/// Result type alias for engine operations
pub type MoveResult<T> = Result<T, MoveError>;
