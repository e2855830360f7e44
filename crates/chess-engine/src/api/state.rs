//! Game state queries
//!
//! Check detection and "any legal reply" probing, the two facts the status
//! computation after each move is built from.

use crate::move_gen::square_attacked;
use crate::types::*;

use super::moves::legal_moves_from;

/// True when `color`'s king is attacked by the opponent
pub fn is_in_check(state: &ChessState, color: PieceColor) -> bool {
    match state.king_square(color) {
        Some(king) => square_attacked(state, king, color.opposite()),
        None => false,
    }
}

/// True when `color` has at least one move that leaves its own king safe
pub fn has_any_legal_move(state: &ChessState, color: PieceColor) -> bool {
    state
        .squares_of(color)
        .into_iter()
        .any(|sq| !legal_moves_from(state, sq).is_empty())
}
