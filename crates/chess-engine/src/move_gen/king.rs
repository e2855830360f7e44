//! King move generation, castling included
//!
//! Castling is generated only when:
//! - the right for that side still holds,
//! - every square between king and rook is empty,
//! - the matching home rook is present and same-colored,
//! - the king is not in check, and
//! - the square the king passes over is not attacked.
//!
//! The landing square is screened by the king-safety filter like any other
//! king move.

use crate::types::*;

use super::attack::square_attacked;

pub fn king_moves(state: &ChessState, from: Square, color: PieceColor) -> Vec<Square> {
    let mut moves = Vec::new();

    for dr in -1i8..=1 {
        for dc in -1i8..=1 {
            if dr == 0 && dc == 0 {
                continue;
            }
            if let Some(to) = from.offset(dr, dc) {
                if state.piece_at(to).is_none_or(|p| p.color != color) {
                    moves.push(to);
                }
            }
        }
    }

    moves.extend(castling_moves(state, from, color));
    moves
}

fn castling_moves(state: &ChessState, from: Square, color: PieceColor) -> Vec<Square> {
    let mut moves = Vec::new();
    let back = color.back_row();

    // Castling only arises with the king on its home square
    if from != Square::new(back, 4) {
        return moves;
    }

    let enemy = color.opposite();
    if square_attacked(state, from, enemy) {
        return moves;
    }

    let rights = state.castling_rights.for_color(color);

    if rights.king_side
        && home_rook_present(state, color, Square::new(back, 7))
        && state.is_empty(Square::new(back, 5))
        && state.is_empty(Square::new(back, 6))
        && !square_attacked(state, Square::new(back, 5), enemy)
    {
        moves.push(Square::new(back, 6));
    }

    if rights.queen_side
        && home_rook_present(state, color, Square::new(back, 0))
        && state.is_empty(Square::new(back, 1))
        && state.is_empty(Square::new(back, 2))
        && state.is_empty(Square::new(back, 3))
        && !square_attacked(state, Square::new(back, 3), enemy)
    {
        moves.push(Square::new(back, 2));
    }

    moves
}

fn home_rook_present(state: &ChessState, color: PieceColor, corner: Square) -> bool {
    state
        .piece_at(corner)
        .is_some_and(|p| p.color == color && p.piece_type == PieceType::Rook)
}
