//! Raw (pseudo-legal) move generation
//!
//! Each submodule produces the geometric moves for one piece family, before
//! the king-safety filter in [`crate::api::moves`] is applied. Castling
//! candidates are the one exception: they already verify the squares the
//! king stands on and passes over are unattacked.

mod attack;
mod king;
mod knight;
mod pawn;
mod sliding;

pub use attack::square_attacked;

use crate::types::*;

/// Generate the raw destination squares for the piece on `from`
///
/// Returns an empty list when the square is empty. Ownership and turn order
/// are not checked here; callers gate on those.
pub fn raw_moves(state: &ChessState, from: Square) -> Vec<Square> {
    let Some(piece) = state.piece_at(from) else {
        return Vec::new();
    };

    match piece.piece_type {
        PieceType::Pawn => pawn::pawn_moves(state, from, piece.color),
        PieceType::Knight => knight::knight_moves(state, from, piece.color),
        PieceType::Bishop => sliding::bishop_moves(state, from, piece.color),
        PieceType::Rook => sliding::rook_moves(state, from, piece.color),
        PieceType::Queen => sliding::queen_moves(state, from, piece.color),
        PieceType::King => king::king_moves(state, from, piece.color),
    }
}
