//! Knight move generation

use crate::types::*;

pub(crate) const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

/// Eight L-shaped jumps onto empty or enemy squares; blockers are irrelevant
pub fn knight_moves(state: &ChessState, from: Square, color: PieceColor) -> Vec<Square> {
    KNIGHT_OFFSETS
        .iter()
        .filter_map(|&(dr, dc)| from.offset(dr, dc))
        .filter(|&to| state.piece_at(to).is_none_or(|p| p.color != color))
        .collect()
}
