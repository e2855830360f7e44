//! Sliding piece move generation (rook, bishop, queen)

use crate::types::*;

pub(crate) const ORTHOGONAL: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
pub(crate) const DIAGONAL: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Slide along each direction, stopping before a friendly piece and
/// including the first enemy piece
fn slide(state: &ChessState, from: Square, color: PieceColor, dirs: &[(i8, i8)]) -> Vec<Square> {
    let mut moves = Vec::new();

    for &(dr, dc) in dirs {
        let mut current = from;
        while let Some(next) = current.offset(dr, dc) {
            match state.piece_at(next) {
                None => {
                    moves.push(next);
                    current = next;
                }
                Some(occupant) => {
                    if occupant.color != color {
                        moves.push(next);
                    }
                    break;
                }
            }
        }
    }

    moves
}

pub fn rook_moves(state: &ChessState, from: Square, color: PieceColor) -> Vec<Square> {
    slide(state, from, color, &ORTHOGONAL)
}

pub fn bishop_moves(state: &ChessState, from: Square, color: PieceColor) -> Vec<Square> {
    slide(state, from, color, &DIAGONAL)
}

pub fn queen_moves(state: &ChessState, from: Square, color: PieceColor) -> Vec<Square> {
    let mut moves = slide(state, from, color, &ORTHOGONAL);
    moves.extend(slide(state, from, color, &DIAGONAL));
    moves
}
